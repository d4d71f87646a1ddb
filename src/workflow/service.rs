//! Workflow Service
//!
//! Ties the engine to template lookup and instance storage. Each mutating
//! call loads the instance, applies one engine operation and saves it with
//! a version check, so concurrent callers on the same instance get a
//! [`WorkflowError::VersionConflict`] instead of a lost update.

use log::{debug, warn};

use super::catalog::TemplateCatalog;
use super::engine::{AdvanceReport, BlockedStep, WorkflowEngine};
use super::instance::{TriggerContext, WorkflowInstance};
use super::model::WorkflowTemplate;
use super::store::InstanceStore;
use crate::error::WorkflowError;

/// Step override applied through the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepCommand {
    Complete,
    Skip,
    Fail,
}

/// Engine operations backed by a template catalog and an instance store.
pub struct WorkflowService<S: InstanceStore> {
    engine: WorkflowEngine,
    catalog: TemplateCatalog,
    store: S,
}

impl<S: InstanceStore> WorkflowService<S> {
    pub fn new(engine: WorkflowEngine, catalog: TemplateCatalog, store: S) -> Self {
        Self {
            engine,
            catalog,
            store,
        }
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Starts and stores a new instance of the template `template_id`.
    pub fn start(
        &self,
        template_id: &str,
        context: TriggerContext,
    ) -> Result<(WorkflowInstance, AdvanceReport), WorkflowError> {
        let template = self.catalog.get(template_id)?;
        let (mut instance, report) = self.engine.start_instance(template, context)?;
        self.store.insert(&mut instance)?;
        Ok((instance, report))
    }

    /// Loads an instance.
    pub fn get(&self, instance_id: &str) -> Result<WorkflowInstance, WorkflowError> {
        self.store.load(instance_id)
    }

    /// Template an instance was started from.
    pub fn template_for(&self, instance: &WorkflowInstance) -> Result<&WorkflowTemplate, WorkflowError> {
        self.catalog.get(&instance.template_id)
    }

    pub fn complete_step(
        &self,
        instance_id: &str,
        step_id: &str,
        notes: Option<&str>,
    ) -> Result<(WorkflowInstance, AdvanceReport), WorkflowError> {
        self.apply(instance_id, step_id, notes, StepCommand::Complete)
    }

    pub fn skip_step(
        &self,
        instance_id: &str,
        step_id: &str,
        notes: Option<&str>,
    ) -> Result<(WorkflowInstance, AdvanceReport), WorkflowError> {
        self.apply(instance_id, step_id, notes, StepCommand::Skip)
    }

    pub fn fail_step(
        &self,
        instance_id: &str,
        step_id: &str,
        notes: Option<&str>,
    ) -> Result<(WorkflowInstance, AdvanceReport), WorkflowError> {
        self.apply(instance_id, step_id, notes, StepCommand::Fail)
    }

    fn apply(
        &self,
        instance_id: &str,
        step_id: &str,
        notes: Option<&str>,
        command: StepCommand,
    ) -> Result<(WorkflowInstance, AdvanceReport), WorkflowError> {
        let mut instance = self.store.load(instance_id)?;
        let template = self.template_for(&instance)?;

        let report = match command {
            StepCommand::Complete => {
                self.engine
                    .complete_step(template, &mut instance, step_id, notes)?
            }
            StepCommand::Skip => self.engine.skip_step(template, &mut instance, step_id, notes)?,
            StepCommand::Fail => self.engine.fail_step(template, &mut instance, step_id, notes)?,
        };

        self.save(&mut instance)?;
        Ok((instance, report))
    }

    /// Cancels and stores an instance.
    pub fn cancel(&self, instance_id: &str, reason: Option<&str>) -> Result<WorkflowInstance, WorkflowError> {
        let mut instance = self.store.load(instance_id)?;
        self.engine.cancel_instance(&mut instance, reason);
        self.save(&mut instance)?;
        Ok(instance)
    }

    /// Pending steps of an instance that can never start.
    pub fn blocked_steps(&self, instance_id: &str) -> Result<Vec<BlockedStep>, WorkflowError> {
        let instance = self.store.load(instance_id)?;
        let template = self.template_for(&instance)?;
        if !instance.matches_template(template) {
            return Err(WorkflowError::TemplateChanged {
                instance_id: instance.id,
                template_id: template.id.clone(),
            });
        }
        Ok(self.engine.blocked_steps(template, &instance))
    }

    fn save(&self, instance: &mut WorkflowInstance) -> Result<(), WorkflowError> {
        match self.store.save(instance) {
            Ok(()) => {
                debug!("Workflow '{}' now at version {}", instance.id, instance.version);
                Ok(())
            }
            Err(e) => {
                warn!("Could not save workflow '{}': {}", instance.id, e);
                Err(e)
            }
        }
    }
}
