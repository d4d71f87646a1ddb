//! Workflow Template Model
//!
//! A template is a reusable graph of steps triggered by a business event.
//! Dependency edges (`depends_on`) decide execution; `order` is only a
//! display hint.
//!
//! # Example YAML Format
//!
//! ```yaml
//! id: client-onboarding
//! name: Client Onboarding
//! trigger: household_created
//! status: active
//! steps:
//!   - id: welcome_email
//!     name: Send welcome email
//!     order: 1
//!     action:
//!       type: email
//!       subject: Welcome aboard
//!       to: [client]
//!
//!   - id: collect_documents
//!     name: Collect KYC documents
//!     order: 2
//!     depends_on: [welcome_email]
//!     action:
//!       type: task
//!       title: Collect ID and proof of address
//!       assignee: operations
//!       due_in_days: 7
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a step does when it starts. The engine never inspects this; the
/// caller dispatches the side effect for each step it reports as started.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAction {
    /// Create a task for an advisor or operations team member.
    Task {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assignee: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        due_in_days: Option<u32>,
    },
    /// Send an email through the connected mail provider.
    Email {
        subject: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        #[serde(default)]
        to: Vec<String>,
    },
    /// Post an in-app notification.
    Notification {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recipient: Option<String>,
    },
    /// Pause before dependents may proceed.
    Wait { hours: u32 },
    /// Branch on a field of the triggering entity.
    Condition {
        field: String,
        operator: String,
        value: serde_json::Value,
    },
    /// Schedule a meeting on the advisor's calendar.
    Meeting {
        title: String,
        #[serde(default = "default_meeting_minutes")]
        duration_minutes: u32,
        #[serde(default)]
        attendees: Vec<String>,
    },
}

fn default_meeting_minutes() -> u32 {
    60
}

impl StepAction {
    /// Short name of the step type, as used in the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Task { .. } => "task",
            Self::Email { .. } => "email",
            Self::Notification { .. } => "notification",
            Self::Wait { .. } => "wait",
            Self::Condition { .. } => "condition",
            Self::Meeting { .. } => "meeting",
        }
    }
}

/// A single node in a template's step graph.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowStep {
    /// Unique identifier within the template
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Display/sequence hint; not used for execution
    #[serde(default)]
    pub order: u32,

    /// IDs of steps that must be completed before this one starts
    #[serde(default)]
    pub depends_on: Vec<String>,

    pub action: StepAction,
}

impl WorkflowStep {
    /// Creates a new step.
    ///
    /// # Example
    ///
    /// ```
    /// use wealthflow::workflow::{StepAction, WorkflowStep};
    ///
    /// let step = WorkflowStep::new("review", StepAction::Wait { hours: 24 })
    ///     .with_name("Cooling-off period")
    ///     .depends_on("sign_agreement");
    /// assert_eq!(step.depends_on, vec!["sign_agreement".to_string()]);
    /// ```
    pub fn new(id: impl Into<String>, action: StepAction) -> Self {
        Self {
            id: id.into().trim().to_string(),
            name: String::new(),
            order: 0,
            depends_on: Vec::new(),
            action,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Adds a dependency on another step.
    pub fn depends_on(mut self, step_id: impl Into<String>) -> Self {
        self.depends_on.push(step_id.into());
        self
    }

    /// Returns true if the step has no prerequisites.
    pub fn is_root(&self) -> bool {
        self.depends_on.is_empty()
    }
}

/// Publication state of a template. Only active templates can be started.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    #[default]
    Draft,
    Active,
    Inactive,
    Archived,
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Archived => "archived",
        };
        f.write_str(name)
    }
}

/// Business event that starts a template.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    #[default]
    Manual,
    HouseholdCreated,
    ProspectConverted,
    AccountOpened,
    KycRenewal,
    AnnualReview,
}

/// A reusable workflow definition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowTemplate {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub trigger: TriggerEvent,

    #[serde(default)]
    pub status: TemplateStatus,

    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowTemplate {
    /// Creates an active template from a list of steps.
    pub fn new(id: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: None,
            trigger: TriggerEvent::default(),
            status: TemplateStatus::Active,
            steps,
        }
    }

    pub fn with_status(mut self, status: TemplateStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == TemplateStatus::Active
    }

    /// Gets a step by ID.
    pub fn get_step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Returns steps with no dependencies (entry points).
    pub fn root_steps(&self) -> Vec<&WorkflowStep> {
        self.steps.iter().filter(|s| s.is_root()).collect()
    }

    /// Returns the number of steps in the template.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the template has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
