//! Workflow Engine
//!
//! Drives workflow instances through their template's step graph:
//! - Starting an instance and its zero-dependency steps
//! - Completing, skipping or failing individual steps
//! - The advance pass that starts every step whose dependencies are met
//! - Detecting completion and cancelling instances
//!
//! The engine only manages status. Side effects (creating tasks, sending
//! email, booking meetings) belong to the caller, which receives the IDs
//! of newly started steps in an [`AdvanceReport`].

use std::collections::HashSet;

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::instance::{
    InstanceStatus, StepStatus, TriggerContext, WorkflowInstance, CANCELLATION_REASON_KEY,
};
use super::model::WorkflowTemplate;
use super::timeline::EventType;
use super::validator::validate_template;
use crate::error::WorkflowError;

/// Which dependency statuses allow a downstream step to start.
///
/// Fixed per instance when it starts; see [`WorkflowInstance::policy`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DependencyPolicy {
    /// Only `completed` satisfies a dependency; skipped or failed
    /// dependencies leave their dependents pending.
    #[default]
    CompletedOnly,
    /// `completed` and `skipped` both satisfy a dependency.
    CompletedOrSkipped,
}

impl DependencyPolicy {
    pub fn is_satisfied_by(self, status: StepStatus) -> bool {
        match self {
            Self::CompletedOnly => status == StepStatus::Completed,
            Self::CompletedOrSkipped => status.is_finished(),
        }
    }
}

impl std::str::FromStr for DependencyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "completed" | "completed-only" | "completed_only" => Ok(Self::CompletedOnly),
            "skipped" | "completed-or-skipped" | "completed_or_skipped" => {
                Ok(Self::CompletedOrSkipped)
            }
            other => Err(format!("Unknown dependency policy: {}", other)),
        }
    }
}

/// Outcome of an engine operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    /// Steps moved from pending to in-progress, in template order
    pub started: Vec<String>,
    /// True if this operation moved the instance to completed
    pub instance_completed: bool,
}

impl AdvanceReport {
    /// True if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && !self.instance_completed
    }
}

/// A pending step that can never start under the instance's policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedStep {
    pub step_id: String,
    /// Dependencies that are failed, unsatisfiably skipped, or blocked themselves
    pub blocked_by: Vec<String>,
}

/// Advances workflow instances through their templates.
///
/// # Example
///
/// ```
/// use wealthflow::workflow::{
///     EntityRef, EntityType, StepAction, StepStatus, TriggerContext, WorkflowEngine,
///     WorkflowStep, WorkflowTemplate,
/// };
///
/// let template = WorkflowTemplate::new(
///     "onboarding",
///     vec![
///         WorkflowStep::new("a", StepAction::Wait { hours: 1 }),
///         WorkflowStep::new("b", StepAction::Wait { hours: 1 }).depends_on("a"),
///     ],
/// );
///
/// let engine = WorkflowEngine::new();
/// let context = TriggerContext::new(EntityRef::new(EntityType::Household, "hh-1"));
/// let (mut instance, report) = engine.start_instance(&template, context).unwrap();
/// assert_eq!(report.started, vec!["a".to_string()]);
///
/// engine.complete_step(&template, &mut instance, "a", None).unwrap();
/// assert_eq!(instance.step_status("b"), Some(StepStatus::InProgress));
/// ```
#[derive(Debug, Clone, Default)]
pub struct WorkflowEngine {
    policy: DependencyPolicy,
}

impl WorkflowEngine {
    /// Creates an engine whose new instances only treat completed steps as
    /// satisfying.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine that starts instances under `policy`. Existing
    /// instances keep the policy they were started with.
    pub fn with_policy(policy: DependencyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DependencyPolicy {
        self.policy
    }

    /// Starts a new instance of `template` and runs the first advance pass.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::InactiveTemplate`] unless the template is active
    /// - [`WorkflowError::InvalidTemplate`] if its step graph is malformed
    pub fn start_instance(
        &self,
        template: &WorkflowTemplate,
        context: TriggerContext,
    ) -> Result<(WorkflowInstance, AdvanceReport), WorkflowError> {
        if !template.is_active() {
            return Err(WorkflowError::InactiveTemplate {
                template_id: template.id.clone(),
                status: template.status,
            });
        }

        validate_template(template).map_err(|errors| WorkflowError::InvalidTemplate {
            template_id: template.id.clone(),
            errors,
        })?;

        let mut instance = WorkflowInstance::new(template, context);
        instance.policy = self.policy;
        info!(
            "Started workflow '{}' from template '{}' for {:?} {} ({:?})",
            instance.id,
            template.id,
            instance.entity.entity_type,
            instance.entity.entity_id,
            instance.policy
        );

        let report = self.advance(template, &mut instance);
        Ok((instance, report))
    }

    /// Marks a step completed and advances the instance.
    ///
    /// Completion is accepted from any prior step status.
    pub fn complete_step(
        &self,
        template: &WorkflowTemplate,
        instance: &mut WorkflowInstance,
        step_id: &str,
        notes: Option<&str>,
    ) -> Result<AdvanceReport, WorkflowError> {
        ensure_running(instance)?;
        ensure_matches(template, instance)?;
        let now = Utc::now();

        let state = instance
            .step_statuses
            .get_mut(step_id)
            .ok_or_else(|| unknown_step(&instance.id, step_id))?;

        if state.status != StepStatus::InProgress {
            warn!(
                "Completing step '{}' in workflow '{}' from status {}",
                step_id, instance.id, state.status
            );
        }

        state.status = StepStatus::Completed;
        state.completed_at = Some(now);
        if let Some(notes) = notes {
            state.notes = Some(notes.to_string());
        }

        instance.history.record_step(step_id, EventType::Completed, now);
        info!("Step '{}' completed in workflow '{}'", step_id, instance.id);

        Ok(self.advance(template, instance))
    }

    /// Skips a pending or in-progress step and advances the instance.
    pub fn skip_step(
        &self,
        template: &WorkflowTemplate,
        instance: &mut WorkflowInstance,
        step_id: &str,
        notes: Option<&str>,
    ) -> Result<AdvanceReport, WorkflowError> {
        self.override_step(template, instance, step_id, StepStatus::Skipped, notes)?;
        Ok(self.advance(template, instance))
    }

    /// Fails a pending or in-progress step and advances the instance.
    ///
    /// A failed step never satisfies its dependents, so they stay pending
    /// and the instance cannot complete; see [`WorkflowEngine::blocked_steps`].
    pub fn fail_step(
        &self,
        template: &WorkflowTemplate,
        instance: &mut WorkflowInstance,
        step_id: &str,
        notes: Option<&str>,
    ) -> Result<AdvanceReport, WorkflowError> {
        self.override_step(template, instance, step_id, StepStatus::Failed, notes)?;
        Ok(self.advance(template, instance))
    }

    fn override_step(
        &self,
        template: &WorkflowTemplate,
        instance: &mut WorkflowInstance,
        step_id: &str,
        target: StepStatus,
        notes: Option<&str>,
    ) -> Result<(), WorkflowError> {
        ensure_running(instance)?;
        ensure_matches(template, instance)?;
        let now = Utc::now();

        let state = instance
            .step_statuses
            .get_mut(step_id)
            .ok_or_else(|| unknown_step(&instance.id, step_id))?;

        if state.status.is_terminal() {
            return Err(WorkflowError::InvalidTransition {
                step_id: step_id.to_string(),
                from: state.status,
                to: target,
            });
        }

        state.status = target;
        state.completed_at = Some(now);
        if let Some(notes) = notes {
            state.notes = Some(notes.to_string());
        }

        let event = if target == StepStatus::Skipped {
            EventType::Skipped
        } else {
            EventType::Failed
        };
        instance.history.record_step(step_id, event, now);
        info!("Step '{}' marked {} in workflow '{}'", step_id, target, instance.id);

        Ok(())
    }

    /// Starts every pending step whose dependencies are satisfied, then
    /// checks whether the instance has finished.
    ///
    /// Idempotent: a second pass with no intervening change does nothing.
    /// Instances that are not running are left untouched.
    pub fn advance(&self, template: &WorkflowTemplate, instance: &mut WorkflowInstance) -> AdvanceReport {
        let mut report = AdvanceReport::default();
        if !instance.is_running() {
            debug!(
                "Workflow '{}' is {}; skipping advance",
                instance.id, instance.status
            );
            return report;
        }

        let now = Utc::now();
        let policy = instance.policy;

        for step in &template.steps {
            match instance.step_status(&step.id) {
                Some(StepStatus::Pending) => {}
                Some(_) => continue,
                None => {
                    warn!(
                        "Workflow '{}' has no status for step '{}'",
                        instance.id, step.id
                    );
                    continue;
                }
            }

            let ready = step.depends_on.iter().all(|dependency| {
                instance
                    .step_status(dependency)
                    .is_some_and(|status| policy.is_satisfied_by(status))
            });
            if !ready {
                continue;
            }

            if let Some(state) = instance.step_statuses.get_mut(&step.id) {
                state.status = StepStatus::InProgress;
                state.started_at = Some(now);
            }
            instance.history.record_step(&step.id, EventType::Started, now);
            debug!(
                "Starting {} step '{}' in workflow '{}'",
                step.action.kind(),
                step.id,
                instance.id
            );
            report.started.push(step.id.clone());
        }

        instance.current_step = template
            .steps
            .iter()
            .position(|s| !instance.step_status(&s.id).is_some_and(StepStatus::is_finished))
            .unwrap_or(template.steps.len());

        if instance.all_steps_finished() {
            instance.status = InstanceStatus::Completed;
            instance.completed_at = Some(now);
            instance.history.record_workflow(EventType::WorkflowCompleted, now);
            report.instance_completed = true;
            info!("Workflow '{}' completed", instance.id);
        }

        report
    }

    /// Cancels an instance regardless of its current status.
    ///
    /// Step statuses are left as they are.
    pub fn cancel_instance(&self, instance: &mut WorkflowInstance, reason: Option<&str>) {
        let now = Utc::now();

        instance.status = InstanceStatus::Cancelled;
        if let Some(reason) = reason {
            instance
                .metadata
                .insert(CANCELLATION_REASON_KEY.to_string(), Value::from(reason));
        }
        instance.history.record_workflow(EventType::WorkflowCancelled, now);

        info!(
            "Workflow '{}' cancelled{}",
            instance.id,
            reason.map(|r| format!(": {}", r)).unwrap_or_default()
        );
    }

    /// Lists pending steps that can never start because a dependency failed,
    /// was skipped under [`DependencyPolicy::CompletedOnly`], or is itself
    /// blocked.
    pub fn blocked_steps(
        &self,
        template: &WorkflowTemplate,
        instance: &WorkflowInstance,
    ) -> Vec<BlockedStep> {
        let policy = instance.policy;
        let dead_end = |status: StepStatus| {
            status == StepStatus::Failed
                || (status == StepStatus::Skipped && !policy.is_satisfied_by(status))
        };

        let mut blocked: HashSet<&str> = HashSet::new();
        loop {
            let before = blocked.len();
            for step in &template.steps {
                if blocked.contains(step.id.as_str())
                    || instance.step_status(&step.id) != Some(StepStatus::Pending)
                {
                    continue;
                }
                let stuck = step.depends_on.iter().any(|d| {
                    blocked.contains(d.as_str()) || instance.step_status(d).is_some_and(dead_end)
                });
                if stuck {
                    blocked.insert(step.id.as_str());
                }
            }
            if blocked.len() == before {
                break;
            }
        }

        template
            .steps
            .iter()
            .filter(|s| blocked.contains(s.id.as_str()))
            .map(|s| BlockedStep {
                step_id: s.id.clone(),
                blocked_by: s
                    .depends_on
                    .iter()
                    .filter(|d| {
                        blocked.contains(d.as_str()) || instance.step_status(d).is_some_and(dead_end)
                    })
                    .cloned()
                    .collect(),
            })
            .collect()
    }
}

fn ensure_running(instance: &WorkflowInstance) -> Result<(), WorkflowError> {
    if instance.is_running() {
        Ok(())
    } else {
        Err(WorkflowError::NotRunning {
            instance_id: instance.id.clone(),
            status: instance.status,
        })
    }
}

/// Rejects a template whose steps were added, removed or renamed after the
/// instance started.
fn ensure_matches(
    template: &WorkflowTemplate,
    instance: &WorkflowInstance,
) -> Result<(), WorkflowError> {
    if instance.matches_template(template) {
        Ok(())
    } else {
        warn!(
            "Template '{}' changed since workflow '{}' started",
            template.id, instance.id
        );
        Err(WorkflowError::TemplateChanged {
            instance_id: instance.id.clone(),
            template_id: template.id.clone(),
        })
    }
}

fn unknown_step(instance_id: &str, step_id: &str) -> WorkflowError {
    WorkflowError::UnknownStep {
        instance_id: instance_id.to_string(),
        step_id: step_id.to_string(),
    }
}
