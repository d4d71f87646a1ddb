//! Wealthflow - Fee Calculation and Client Workflow Engine
//!
//! The computational core of a wealth-management CRM: tiered advisory fee
//! calculation and the engine that walks client workflows (onboarding,
//! KYC renewal, annual reviews) through their step dependency graph.
//!
//! # Architecture
//!
//! The library is organized into three modules:
//!
//! - [`fees`]: Fee schedules, the tiered calculator and fee history records
//! - [`workflow`]: Templates, instances, the advancement engine and storage
//! - [`error`]: Error types shared by both
//!
//! # Example
//!
//! ```rust,no_run
//! use wealthflow::fees::{calculate_fee, load_fee_schedule};
//! use wealthflow::workflow::{
//!     EntityRef, EntityType, FileInstanceStore, TemplateCatalog, TriggerContext,
//!     WorkflowEngine, WorkflowService,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Bill a household
//!     let schedule = load_fee_schedule("schedules/standard.yaml")?;
//!     let fee = calculate_fee(&schedule, 2_000_000.0)?;
//!     println!("Annual fee: {:.2}", fee.fee_amount);
//!
//!     // Onboard it
//!     let service = WorkflowService::new(
//!         WorkflowEngine::new(),
//!         TemplateCatalog::load_dir("templates")?,
//!         FileInstanceStore::open(".wealthflow")?,
//!     );
//!     let context = TriggerContext::new(EntityRef::new(EntityType::Household, "hh-42"));
//!     let (instance, report) = service.start("client-onboarding", context)?;
//!     println!("Started {} with steps {:?}", instance.id, report.started);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod fees;
pub mod workflow;

// Re-export commonly used types
pub use error::{FeeError, WorkflowError};
pub use fees::{calculate_fee, FeeCalculation, FeeSchedule, FeeTier};
pub use workflow::{WorkflowEngine, WorkflowInstance, WorkflowTemplate};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Wealthflow";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "Wealthflow");
    }

    #[test]
    fn test_module_exports_fee_types() {
        let schedule = FeeSchedule::new("flat", vec![FeeTier::new(0.0, None, 1.0)]);
        let result = calculate_fee(&schedule, 1_000.0).unwrap();
        assert_eq!(result.fee_amount, 10.0);
    }

    #[test]
    fn test_module_exports_workflow_types() {
        let template = WorkflowTemplate::new("empty", Vec::new());
        assert!(template.is_empty());
        assert_eq!(WorkflowEngine::new().policy(), workflow::DependencyPolicy::CompletedOnly);
    }
}
