//! Workflow Instances
//!
//! One execution of a template against a household, person, prospect or
//! account. The instance owns a status entry for every template step and
//! is the unit the engine mutates and the store persists.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::engine::DependencyPolicy;
use super::model::WorkflowTemplate;
use super::timeline::Timeline;

/// Metadata key holding the reason given when an instance is cancelled.
pub const CANCELLATION_REASON_KEY: &str = "cancellationReason";

/// Lifecycle of a single step within an instance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Skipped,
    Failed,
}

impl StepStatus {
    /// Completed, skipped and failed steps never change again on their own.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped | Self::Failed)
    }

    /// Statuses that count towards workflow completion.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Lifecycle of the instance as a whole.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Running,
    Completed,
    Cancelled,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Current state of one step.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StepState {
    pub status: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Kind of record a workflow runs against.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Household,
    Person,
    Prospect,
    Account,
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "household" => Ok(Self::Household),
            "person" => Ok(Self::Person),
            "prospect" => Ok(Self::Prospect),
            "account" => Ok(Self::Account),
            other => Err(format!("Unknown entity type: {}", other)),
        }
    }
}

/// The record a workflow instance runs against.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }
}

impl std::str::FromStr for EntityRef {
    type Err = String;

    /// Parses `type:id`, e.g. `household:hh-42`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("Expected TYPE:ID, got '{}'", s))?;
        if id.trim().is_empty() {
            return Err(format!("Missing entity id in '{}'", s));
        }
        Ok(Self::new(kind.parse()?, id.trim()))
    }
}

/// What started an instance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TriggerContext {
    pub entity: EntityRef,

    /// User or system that started the workflow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,

    /// Event payload, copied into the instance metadata
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl TriggerContext {
    pub fn new(entity: EntityRef) -> Self {
        Self {
            entity,
            triggered_by: None,
            data: Map::new(),
        }
    }

    pub fn triggered_by(mut self, user: impl Into<String>) -> Self {
        self.triggered_by = Some(user.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// One execution of a workflow template.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowInstance {
    pub id: String,
    pub template_id: String,
    pub entity: EntityRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,

    pub status: InstanceStatus,

    /// Index of the first unfinished step in template order
    pub current_step: usize,

    pub step_statuses: BTreeMap<String, StepState>,
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub metadata: Map<String, Value>,

    #[serde(default)]
    pub history: Timeline,

    /// Dependency policy chosen at start; every later advance uses it
    #[serde(default)]
    pub policy: DependencyPolicy,

    /// Optimistic concurrency token, bumped on every successful save
    #[serde(default)]
    pub version: u64,
}

impl WorkflowInstance {
    /// Creates a running instance with every template step pending.
    pub fn new(template: &WorkflowTemplate, context: TriggerContext) -> Self {
        let step_statuses = template
            .steps
            .iter()
            .map(|step| (step.id.clone(), StepState::default()))
            .collect();

        Self {
            id: Uuid::new_v4().to_string(),
            template_id: template.id.clone(),
            entity: context.entity,
            triggered_by: context.triggered_by,
            status: InstanceStatus::Running,
            current_step: 0,
            step_statuses,
            started_at: Utc::now(),
            completed_at: None,
            metadata: context.data,
            history: Timeline::new(),
            policy: DependencyPolicy::default(),
            version: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == InstanceStatus::Running
    }

    /// Status of a step, if the instance knows it.
    pub fn step_status(&self, step_id: &str) -> Option<StepStatus> {
        self.step_statuses.get(step_id).map(|s| s.status)
    }

    /// IDs of steps currently in `status`, in sorted order.
    pub fn steps_with_status(&self, status: StepStatus) -> Vec<&str> {
        self.step_statuses
            .iter()
            .filter(|(_, state)| state.status == status)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// True when every step is completed or skipped.
    pub fn all_steps_finished(&self) -> bool {
        self.step_statuses.values().all(|s| s.status.is_finished())
    }

    /// True when the instance tracks exactly the steps of `template`.
    pub fn matches_template(&self, template: &WorkflowTemplate) -> bool {
        template.steps.len() == self.step_statuses.len()
            && template
                .steps
                .iter()
                .all(|step| self.step_statuses.contains_key(&step.id))
    }

    /// Reason recorded when the instance was cancelled.
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.metadata
            .get(CANCELLATION_REASON_KEY)
            .and_then(Value::as_str)
    }
}
