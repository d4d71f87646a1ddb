//! Template Validation
//!
//! Checks a template before it is saved or started:
//! - Template has steps and every step has an ID
//! - No duplicate step IDs
//! - Every dependency points at an existing step
//! - No step depends on itself
//! - Dependency edges form a DAG (a cycle would leave its steps pending forever)

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, info};
use thiserror::Error;

use super::model::WorkflowTemplate;

/// A structural problem that prevents a template from running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Template has no steps")]
    EmptyTemplate,

    #[error("Step has empty or whitespace-only ID")]
    EmptyStepId,

    #[error("Duplicate step ID: '{0}'")]
    DuplicateStepId(String),

    #[error("Step '{step}' depends on unknown step '{reference}'")]
    InvalidReference { step: String, reference: String },

    #[error("Step '{0}' depends on itself")]
    SelfDependency(String),

    #[error("Template contains cyclic dependencies between steps: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),
}

/// Validates the structure of a template.
///
/// Collects every problem rather than stopping at the first. Cycle
/// detection only runs once references are known to be sound.
pub fn validate_template(template: &WorkflowTemplate) -> Result<(), Vec<ValidationError>> {
    info!(
        "Validating template '{}' with {} steps",
        template.id,
        template.steps.len()
    );

    if template.steps.is_empty() {
        return Err(vec![ValidationError::EmptyTemplate]);
    }

    let mut errors = Vec::new();
    let mut seen_ids: HashSet<&str> = HashSet::new();

    for step in &template.steps {
        if step.id.trim().is_empty() {
            errors.push(ValidationError::EmptyStepId);
        } else if !seen_ids.insert(step.id.as_str()) {
            errors.push(ValidationError::DuplicateStepId(step.id.clone()));
        }
    }

    for step in &template.steps {
        for dependency in &step.depends_on {
            if *dependency == step.id {
                errors.push(ValidationError::SelfDependency(step.id.clone()));
            } else if !seen_ids.contains(dependency.as_str()) {
                errors.push(ValidationError::InvalidReference {
                    step: step.id.clone(),
                    reference: dependency.clone(),
                });
            }
        }

        if step.is_root() {
            debug!("Step '{}' is a root step (no dependencies)", step.id);
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    topological_order(template).map_err(|e| vec![e])?;

    info!("Template '{}' validated", template.id);
    Ok(())
}

/// Orders step IDs so every step follows its dependencies (Kahn's algorithm).
///
/// Steps with equal standing keep their template order. Returns
/// [`ValidationError::CyclicDependency`] listing the steps that could not
/// be ordered.
pub fn topological_order(template: &WorkflowTemplate) -> Result<Vec<String>, ValidationError> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for step in &template.steps {
        let unique: HashSet<&str> = step.depends_on.iter().map(String::as_str).collect();
        in_degree.insert(step.id.as_str(), unique.len());
        for dependency in unique {
            dependents.entry(dependency).or_default().push(step.id.as_str());
        }
    }

    let mut queue: VecDeque<&str> = template
        .steps
        .iter()
        .filter(|s| in_degree.get(s.id.as_str()) == Some(&0))
        .map(|s| s.id.as_str())
        .collect();

    let mut sorted_order: Vec<String> = Vec::new();

    while let Some(current) = queue.pop_front() {
        sorted_order.push(current.to_string());

        for &dependent in dependents.get(current).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if sorted_order.len() != template.steps.len() {
        let ordered: HashSet<&str> = sorted_order.iter().map(String::as_str).collect();
        let stuck = template
            .steps
            .iter()
            .filter(|s| !ordered.contains(s.id.as_str()))
            .map(|s| s.id.clone())
            .collect();
        return Err(ValidationError::CyclicDependency(stuck));
    }

    Ok(sorted_order)
}
