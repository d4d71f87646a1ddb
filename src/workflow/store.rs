//! Instance Persistence
//!
//! Stores workflow instances with optimistic concurrency: every instance
//! carries a `version`, and a save only succeeds when the stored version
//! still matches the one the caller loaded. Two writers racing on the same
//! instance therefore cannot silently overwrite each other's step updates.
//!
//! The file store keeps one JSON document per instance under
//! `{root}/instances/{id}.json`.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use log::{debug, info};
use uuid::Uuid;

use super::instance::WorkflowInstance;
use crate::error::WorkflowError;

/// Storage for workflow instances.
pub trait InstanceStore: Send + Sync {
    /// Stores a new instance, setting its version to 1.
    fn insert(&self, instance: &mut WorkflowInstance) -> Result<(), WorkflowError>;

    /// Loads an instance by ID.
    fn load(&self, id: &str) -> Result<WorkflowInstance, WorkflowError>;

    /// Writes back a loaded instance and bumps its version.
    ///
    /// Fails with [`WorkflowError::VersionConflict`] if the stored copy
    /// changed since `instance` was loaded.
    fn save(&self, instance: &mut WorkflowInstance) -> Result<(), WorkflowError>;

    /// Returns every stored instance.
    fn list(&self) -> Result<Vec<WorkflowInstance>, WorkflowError>;
}

fn check_version(instance: &WorkflowInstance, stored: &WorkflowInstance) -> Result<(), WorkflowError> {
    if stored.version != instance.version {
        return Err(WorkflowError::VersionConflict {
            instance_id: instance.id.clone(),
            expected: instance.version,
            found: stored.version,
        });
    }
    Ok(())
}

/// In-process store, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryInstanceStore {
    instances: Mutex<HashMap<String, WorkflowInstance>>,
}

impl MemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, WorkflowInstance>> {
        self.instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl InstanceStore for MemoryInstanceStore {
    fn insert(&self, instance: &mut WorkflowInstance) -> Result<(), WorkflowError> {
        let mut instances = self.lock();
        if instances.contains_key(&instance.id) {
            return Err(WorkflowError::DuplicateInstance(instance.id.clone()));
        }
        instance.version = 1;
        instances.insert(instance.id.clone(), instance.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> Result<WorkflowInstance, WorkflowError> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| WorkflowError::InstanceNotFound(id.to_string()))
    }

    fn save(&self, instance: &mut WorkflowInstance) -> Result<(), WorkflowError> {
        let mut instances = self.lock();
        let stored = instances
            .get(&instance.id)
            .ok_or_else(|| WorkflowError::InstanceNotFound(instance.id.clone()))?;
        check_version(instance, stored)?;

        instance.version += 1;
        instances.insert(instance.id.clone(), instance.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<WorkflowInstance>, WorkflowError> {
        Ok(self.lock().values().cloned().collect())
    }
}

/// Store keeping each instance as a JSON file.
///
/// Inserts and saves hold an exclusive advisory lock on
/// `instances/{id}.lock` across the read, version check and write, so
/// separate handles and separate processes sharing a directory serialize
/// on the same instance. Each write goes to a uniquely named temporary
/// file that is renamed into place.
#[derive(Debug)]
pub struct FileInstanceStore {
    root: PathBuf,
}

/// Exclusive lock on one instance, released when dropped.
struct InstanceLock {
    _file: File,
}

impl FileInstanceStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, WorkflowError> {
        let root = root.into();
        fs::create_dir_all(root.join("instances"))?;
        info!("Using instance store at {}", root.display());

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file path for an instance ID.
    fn instance_path(&self, id: &str) -> PathBuf {
        self.root.join("instances").join(format!("{}.json", id))
    }

    /// Blocks until this process holds the instance's lock file.
    fn lock(&self, id: &str) -> Result<InstanceLock, WorkflowError> {
        let path = self.root.join("instances").join(format!("{}.lock", id));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        FileExt::lock_exclusive(&file)?;

        Ok(InstanceLock { _file: file })
    }

    fn read(&self, id: &str) -> Result<Option<WorkflowInstance>, WorkflowError> {
        let path = self.instance_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn write(&self, instance: &WorkflowInstance) -> Result<(), WorkflowError> {
        let path = self.instance_path(&instance.id);
        let tmp = self
            .root
            .join("instances")
            .join(format!("{}.{}.tmp", instance.id, Uuid::new_v4()));

        let json = serde_json::to_string_pretty(instance)?;
        if let Err(e) = fs::write(&tmp, json).and_then(|_| fs::rename(&tmp, &path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(
            "Saved workflow '{}' (version {}) to {}",
            instance.id,
            instance.version,
            path.display()
        );
        Ok(())
    }
}

impl InstanceStore for FileInstanceStore {
    fn insert(&self, instance: &mut WorkflowInstance) -> Result<(), WorkflowError> {
        let _lock = self.lock(&instance.id)?;
        if self.instance_path(&instance.id).exists() {
            return Err(WorkflowError::DuplicateInstance(instance.id.clone()));
        }
        instance.version = 1;
        self.write(instance)
    }

    fn load(&self, id: &str) -> Result<WorkflowInstance, WorkflowError> {
        self.read(id)?
            .ok_or_else(|| WorkflowError::InstanceNotFound(id.to_string()))
    }

    fn save(&self, instance: &mut WorkflowInstance) -> Result<(), WorkflowError> {
        let _lock = self.lock(&instance.id)?;
        let stored = self
            .read(&instance.id)?
            .ok_or_else(|| WorkflowError::InstanceNotFound(instance.id.clone()))?;
        check_version(instance, &stored)?;

        instance.version += 1;
        if let Err(e) = self.write(instance) {
            instance.version -= 1;
            return Err(e);
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<WorkflowInstance>, WorkflowError> {
        let mut instances = Vec::new();

        for entry in fs::read_dir(self.root.join("instances"))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            instances.push(serde_json::from_str(&content)?);
        }

        Ok(instances)
    }
}
