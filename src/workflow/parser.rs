//! Template Parser
//!
//! Loads workflow templates from YAML and validates their step graph
//! before handing them out, so a cyclic or dangling template is rejected
//! when it is saved rather than deadlocking at run time.

use std::fs;
use std::path::Path;

use log::{debug, info};

use super::model::WorkflowTemplate;
use super::validator::validate_template;
use crate::error::WorkflowError;

/// Loads and validates a template from a YAML file.
///
/// When the file does not set an `id`, the file stem is used.
pub fn load_template(path: impl AsRef<Path>) -> Result<WorkflowTemplate, WorkflowError> {
    let path = path.as_ref();
    info!("Loading workflow template from {}", path.display());

    let content = fs::read_to_string(path)?;
    let mut template: WorkflowTemplate = serde_yaml::from_str(&content)?;

    if template.id.trim().is_empty() {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            debug!("Template has no id; using file stem '{}'", stem);
            template.id = stem.to_string();
        }
    }

    check(template)
}

/// Parses and validates a template from a YAML string.
pub fn parse_template(content: &str) -> Result<WorkflowTemplate, WorkflowError> {
    let template: WorkflowTemplate = serde_yaml::from_str(content)?;
    check(template)
}

fn check(template: WorkflowTemplate) -> Result<WorkflowTemplate, WorkflowError> {
    validate_template(&template).map_err(|errors| WorkflowError::InvalidTemplate {
        template_id: template.id.clone(),
        errors,
    })?;

    info!(
        "Parsed template '{}': {} steps, {} root step(s), status {}",
        template.id,
        template.steps.len(),
        template.root_steps().len(),
        template.status
    );
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::{StepAction, TemplateStatus, TriggerEvent};
    use crate::workflow::validator::ValidationError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ONBOARDING: &str = r#"
id: client-onboarding
name: Client Onboarding
trigger: household_created
status: active
steps:
  - id: welcome_email
    name: Send welcome email
    order: 1
    action:
      type: email
      subject: Welcome aboard
      to: [client]

  - id: collect_documents
    order: 2
    depends_on: [welcome_email]
    action:
      type: task
      title: Collect ID and proof of address
      assignee: operations
      due_in_days: 7

  - id: kickoff
    order: 3
    depends_on: [welcome_email]
    action:
      type: meeting
      title: Kickoff meeting
      duration_minutes: 90
      attendees: [advisor, client]

  - id: check_risk
    order: 4
    depends_on: [collect_documents, kickoff]
    action:
      type: condition
      field: risk_profile
      operator: equals
      value: aggressive
"#;

    #[test]
    fn test_parse_template() {
        let template = parse_template(ONBOARDING).unwrap();

        assert_eq!(template.id, "client-onboarding");
        assert_eq!(template.status, TemplateStatus::Active);
        assert_eq!(template.trigger, TriggerEvent::HouseholdCreated);
        assert_eq!(template.steps.len(), 4);
        assert_eq!(template.steps[3].depends_on.len(), 2);
        assert!(matches!(
            template.steps[1].action,
            StepAction::Task {
                due_in_days: Some(7),
                ..
            }
        ));
        assert_eq!(template.steps[3].action.kind(), "condition");
    }

    #[test]
    fn test_parse_rejects_dangling_dependency() {
        let yaml = r#"
id: broken
steps:
  - id: a
    depends_on: [missing]
    action: { type: wait, hours: 1 }
"#;
        let err = parse_template(yaml).unwrap_err();
        match err {
            WorkflowError::InvalidTemplate { template_id, errors } => {
                assert_eq!(template_id, "broken");
                assert!(matches!(errors[0], ValidationError::InvalidReference { .. }));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_step_type() {
        let yaml = "id: t\nsteps:\n  - id: a\n    action: { type: teleport }\n";
        assert!(matches!(parse_template(yaml), Err(WorkflowError::Yaml(_))));
    }

    #[test]
    fn test_load_uses_file_stem() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "steps:\n  - id: a\n    action:\n      type: notification\n      message: hi"
        )
        .unwrap();

        let template = load_template(file.path()).unwrap();
        let stem = file.path().file_stem().unwrap().to_str().unwrap();
        assert_eq!(template.id, stem);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_template("/nonexistent/template.yaml");
        assert!(matches!(result, Err(WorkflowError::Io(_))));
    }
}
