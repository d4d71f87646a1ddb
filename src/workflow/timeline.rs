//! Instance Timeline
//!
//! Records step and workflow transitions for a workflow instance so the
//! history of an execution survives alongside its current state.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Type of timeline event.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Step moved to in-progress
    Started,
    /// Step completed
    Completed,
    /// Step skipped by an operator
    Skipped,
    /// Step marked failed
    Failed,
    /// Every step finished; the workflow completed
    WorkflowCompleted,
    /// The workflow was cancelled
    WorkflowCancelled,
}

/// A single event in the timeline.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    /// Step the event concerns; `None` for workflow-level events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of an instance's transitions.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event for a step.
    pub fn record_step(&mut self, step_id: &str, event_type: EventType, at: DateTime<Utc>) {
        self.events.push(TimelineEvent {
            step_id: Some(step_id.to_string()),
            event_type,
            timestamp: at,
        });
    }

    /// Records a workflow-level event.
    pub fn record_workflow(&mut self, event_type: EventType, at: DateTime<Utc>) {
        self.events.push(TimelineEvent {
            step_id: None,
            event_type,
            timestamp: at,
        });
    }

    /// Returns all recorded events.
    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Returns events concerning a single step.
    pub fn events_for(&self, step_id: &str) -> Vec<&TimelineEvent> {
        self.events
            .iter()
            .filter(|e| e.step_id.as_deref() == Some(step_id))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Time from each step's start to its completion, skip or failure.
    pub fn durations(&self) -> HashMap<String, Duration> {
        let mut starts: HashMap<&str, DateTime<Utc>> = HashMap::new();
        let mut durations = HashMap::new();

        for event in &self.events {
            let Some(step_id) = event.step_id.as_deref() else {
                continue;
            };

            match event.event_type {
                EventType::Started => {
                    starts.insert(step_id, event.timestamp);
                }
                EventType::Completed | EventType::Skipped | EventType::Failed => {
                    if let Some(start) = starts.get(step_id) {
                        durations.insert(step_id.to_string(), event.timestamp - *start);
                    }
                }
                EventType::WorkflowCompleted | EventType::WorkflowCancelled => {}
            }
        }

        durations
    }

    /// Renders the history as one line per event.
    pub fn render(&self) -> String {
        let mut output = String::new();

        for event in &self.events {
            let subject = event.step_id.as_deref().unwrap_or("workflow");
            let label = match event.event_type {
                EventType::Started => "started",
                EventType::Completed | EventType::WorkflowCompleted => "completed",
                EventType::Skipped => "skipped",
                EventType::Failed => "failed",
                EventType::WorkflowCancelled => "cancelled",
            };
            output.push_str(&format!(
                "{} {:24} {}\n",
                event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                truncate(subject, 24),
                label
            ));
        }

        output
    }
}

/// Truncates a string to a maximum length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
