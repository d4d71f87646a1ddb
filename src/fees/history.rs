//! Fee History Records
//!
//! A snapshot of one fee calculation for one billing period, in the shape
//! the calling service persists after billing a household.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::calculator::{FeeCalculation, TierBreakdown};
use super::model::{BillingFrequency, FeeSchedule};
use crate::error::FeeError;

/// Inclusive date range a fee was billed for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BillingPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FeeError> {
        if end < start {
            return Err(FeeError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Persisted record of a calculated fee.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FeeHistoryRecord {
    pub schedule_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub household_id: Option<String>,

    pub period: BillingPeriod,
    pub frequency: BillingFrequency,
    pub billable_amount: f64,

    /// Annual fee from the schedule
    pub fee_amount: f64,

    /// Share of the annual fee billed for this period
    pub period_fee: f64,

    pub effective_rate: f64,
    pub breakdown: Vec<TierBreakdown>,
    pub calculated_at: DateTime<Utc>,
}

impl FeeHistoryRecord {
    /// Builds a history record for a calculation made against `schedule`.
    pub fn new(
        schedule: &FeeSchedule,
        calculation: &FeeCalculation,
        billable_amount: f64,
        period: BillingPeriod,
    ) -> Self {
        Self {
            schedule_id: schedule.id.clone(),
            household_id: None,
            period,
            frequency: schedule.frequency,
            billable_amount,
            fee_amount: calculation.fee_amount,
            period_fee: calculation.period_fee(schedule.frequency),
            effective_rate: calculation.effective_rate,
            breakdown: calculation.breakdown.clone(),
            calculated_at: Utc::now(),
        }
    }

    pub fn for_household(mut self, household_id: impl Into<String>) -> Self {
        self.household_id = Some(household_id.into());
        self
    }
}
