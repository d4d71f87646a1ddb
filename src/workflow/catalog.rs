//! Template Catalog
//!
//! Looks up workflow templates by ID. Templates are usually loaded from a
//! directory of YAML files, one template per file.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{info, warn};

use super::model::WorkflowTemplate;
use super::parser::load_template;
use crate::error::WorkflowError;

/// In-memory index of templates keyed by ID.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: HashMap<String, WorkflowTemplate>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `.yaml`/`.yml` file in `dir`.
    ///
    /// Files that fail to parse or validate are logged and skipped so one
    /// broken template does not hide the rest.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let dir = dir.as_ref();
        let mut catalog = Self::new();

        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        paths.sort();

        for path in paths {
            match load_template(&path) {
                Ok(template) => {
                    if let Some(previous) = catalog.insert(template) {
                        warn!(
                            "Template '{}' defined more than once; using {}",
                            previous.id,
                            path.display()
                        );
                    }
                }
                Err(e) => warn!("Skipping template {}: {}", path.display(), e),
            }
        }

        for id in catalog.inactive_ids() {
            if let Ok(template) = catalog.get(id) {
                warn!(
                    "Template '{}' is {} and cannot start workflows until its status is active",
                    id, template.status
                );
            }
        }

        info!(
            "Loaded {} template(s) from {}",
            catalog.len(),
            dir.display()
        );
        Ok(catalog)
    }

    /// Adds a template, returning any template it replaced.
    pub fn insert(&mut self, template: WorkflowTemplate) -> Option<WorkflowTemplate> {
        self.templates.insert(template.id.clone(), template)
    }

    /// Looks up a template by ID.
    pub fn get(&self, id: &str) -> Result<&WorkflowTemplate, WorkflowError> {
        self.templates
            .get(id)
            .ok_or_else(|| WorkflowError::TemplateNotFound(id.to_string()))
    }

    /// Template IDs in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// IDs of templates that are not active, in sorted order.
    pub fn inactive_ids(&self) -> Vec<&str> {
        self.ids()
            .into_iter()
            .filter(|id| self.templates.get(*id).is_some_and(|t| !t.is_active()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
