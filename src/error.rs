//! Error Types
//!
//! Error taxonomy shared by the fee and workflow modules. Validation
//! failures are caller-correctable and never retried; store and parse
//! failures wrap the underlying I/O or format error.

use thiserror::Error;

use crate::workflow::instance::{InstanceStatus, StepStatus};
use crate::workflow::model::TemplateStatus;
use crate::workflow::validator::ValidationError;

/// Errors raised by fee calculation and fee schedule loading.
#[derive(Debug, Error)]
pub enum FeeError {
    #[error("billable amount must be a finite, non-negative number (got {0})")]
    InvalidAmount(f64),

    #[error("billing period ends ({end}) before it starts ({start})")]
    InvalidPeriod {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("failed to read fee schedule: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse fee schedule: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Errors raised by the workflow engine, its stores and its loaders.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("template '{template_id}' is {status} and cannot be started")]
    InactiveTemplate {
        template_id: String,
        status: TemplateStatus,
    },

    #[error("template '{template_id}' is invalid:\n{}", format_validation(.errors))]
    InvalidTemplate {
        template_id: String,
        errors: Vec<ValidationError>,
    },

    #[error("workflow '{instance_id}' is not running (status: {status})")]
    NotRunning {
        instance_id: String,
        status: InstanceStatus,
    },

    #[error("unknown step '{step_id}' in workflow '{instance_id}'")]
    UnknownStep {
        instance_id: String,
        step_id: String,
    },

    #[error("step '{step_id}' cannot move from {from} to {to}")]
    InvalidTransition {
        step_id: String,
        from: StepStatus,
        to: StepStatus,
    },

    #[error("template '{template_id}' no longer matches the steps of workflow '{instance_id}'")]
    TemplateChanged {
        instance_id: String,
        template_id: String,
    },

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("workflow instance not found: {0}")]
    InstanceNotFound(String),

    #[error("workflow instance '{0}' already exists")]
    DuplicateInstance(String),

    #[error("workflow '{instance_id}' was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        instance_id: String,
        expected: u64,
        found: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode workflow instance: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse workflow template: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_amount_message() {
        let err = FeeError::InvalidAmount(-5.0);
        assert!(err.to_string().contains("-5"));
    }

    #[test]
    fn test_not_running_message() {
        let err = WorkflowError::NotRunning {
            instance_id: "wf-1".to_string(),
            status: InstanceStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "workflow 'wf-1' is not running (status: cancelled)"
        );
    }

    #[test]
    fn test_invalid_template_lists_each_error() {
        let err = WorkflowError::InvalidTemplate {
            template_id: "onboarding".to_string(),
            errors: vec![
                ValidationError::EmptyTemplate,
                ValidationError::CyclicDependency(vec!["a".to_string(), "b".to_string()]),
            ],
        };
        let message = err.to_string();
        assert!(message.contains("onboarding"));
        assert!(message.contains("  - Template has no steps"));
        assert!(message.contains("cyclic"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: WorkflowError = io.into();
        assert!(matches!(err, WorkflowError::Io(_)));
    }
}
