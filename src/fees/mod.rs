//! Fee Calculation Module
//!
//! Tiered fee schedules and the calculator that applies them to a
//! billable amount.
//!
//! # Structure
//!
//! - [`model`]: Fee tiers, schedules and billing frequency
//! - [`calculator`]: Progressive tier evaluation with min/max clamps
//! - [`validator`]: Advisory gap/overlap checks for schedule authors
//! - [`history`]: Fee history records for billed periods
//! - [`parser`]: YAML loading

pub mod calculator;
pub mod history;
pub mod model;
pub mod parser;
pub mod validator;

pub use calculator::{calculate_fee, round_to, FeeCalculation, TierBreakdown};
pub use history::{BillingPeriod, FeeHistoryRecord};
pub use model::{BillingFrequency, FeeSchedule, FeeTier};
pub use parser::{load_fee_schedule, parse_fee_schedule};
pub use validator::{validate_schedule, ScheduleIssue};
