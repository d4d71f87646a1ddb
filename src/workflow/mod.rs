//! Workflow Module
//!
//! Templates, instances and the engine that advances instances through
//! their template's dependency graph.
//!
//! # Structure
//!
//! - [`model`]: Templates, steps and step actions
//! - [`instance`]: Instances and per-step status
//! - [`engine`]: Start, complete, skip, fail, advance and cancel
//! - [`validator`]: Dependency graph validation (references, cycles)
//! - [`timeline`]: Per-instance transition history
//! - [`store`]: Versioned instance persistence
//! - [`catalog`]: Template lookup by ID
//! - [`service`]: Load, apply and save with conflict detection
//! - [`parser`]: YAML loading

pub mod catalog;
pub mod engine;
pub mod instance;
pub mod model;
pub mod parser;
pub mod service;
pub mod store;
pub mod timeline;
pub mod validator;

pub use catalog::TemplateCatalog;
pub use engine::{AdvanceReport, BlockedStep, DependencyPolicy, WorkflowEngine};
pub use instance::{
    EntityRef, EntityType, InstanceStatus, StepState, StepStatus, TriggerContext,
    WorkflowInstance,
};
pub use model::{StepAction, TemplateStatus, TriggerEvent, WorkflowStep, WorkflowTemplate};
pub use parser::{load_template, parse_template};
pub use service::WorkflowService;
pub use store::{FileInstanceStore, InstanceStore, MemoryInstanceStore};
pub use timeline::{EventType, Timeline, TimelineEvent};
pub use validator::{topological_order, validate_template, ValidationError};
