//! Fee Schedule Validation
//!
//! Advisory checks for schedules whose tiers would not produce a correct
//! progressive calculation. The calculator itself never runs these; they
//! are surfaced when a schedule is loaded or saved so the author can fix it.

use log::{debug, info};
use thiserror::Error;

use super::model::FeeSchedule;

/// A structural problem found in a fee schedule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleIssue {
    #[error("Schedule has no tiers")]
    NoTiers,

    #[error("Lowest tier starts at {0} instead of 0")]
    FirstTierNotAtZero(f64),

    #[error("Tier '{tier}' has a negative minimum amount")]
    NegativeMinimum { tier: String },

    #[error("Tier '{tier}' has a maximum amount that does not exceed its minimum")]
    EmptyRange { tier: String },

    #[error("Tier '{tier}' has rate {rate}, expected 0-100")]
    RateOutOfRange { tier: String, rate: f64 },

    #[error("Tier '{tier}' has a negative flat amount")]
    NegativeFlatAmount { tier: String },

    #[error("Gap between {lower_max} and {upper_min} is not covered by any tier")]
    Gap { lower_max: f64, upper_min: f64 },

    #[error("Tiers '{lower}' and '{upper}' overlap")]
    Overlap { lower: String, upper: String },

    #[error("Unbounded tier '{tier}' is followed by higher tiers")]
    UnboundedNotLast { tier: String },

    #[error("Minimum fee {minimum} exceeds maximum fee {maximum}")]
    MinimumExceedsMaximum { minimum: f64, maximum: f64 },
}

/// Checks a schedule for gaps, overlaps and out-of-range values.
///
/// Returns every issue found; an empty list means the schedule is
/// well-formed for progressive calculation.
pub fn validate_schedule(schedule: &FeeSchedule) -> Vec<ScheduleIssue> {
    let mut issues = Vec::new();

    if let (Some(minimum), Some(maximum)) = (schedule.minimum_fee, schedule.maximum_fee) {
        if minimum > maximum {
            issues.push(ScheduleIssue::MinimumExceedsMaximum { minimum, maximum });
        }
    }

    let tiers = schedule.sorted_tiers();
    let Some(first) = tiers.first() else {
        issues.push(ScheduleIssue::NoTiers);
        return issues;
    };

    if first.min_amount > 0.0 {
        issues.push(ScheduleIssue::FirstTierNotAtZero(first.min_amount));
    }

    for tier in &tiers {
        let label = tier.label();

        if tier.min_amount < 0.0 {
            issues.push(ScheduleIssue::NegativeMinimum { tier: label.clone() });
        }
        if matches!(tier.max_amount, Some(max) if max <= tier.min_amount) {
            issues.push(ScheduleIssue::EmptyRange { tier: label.clone() });
        }
        if !(0.0..=100.0).contains(&tier.rate) {
            issues.push(ScheduleIssue::RateOutOfRange {
                tier: label.clone(),
                rate: tier.rate,
            });
        }
        if matches!(tier.flat_amount, Some(flat) if flat < 0.0) {
            issues.push(ScheduleIssue::NegativeFlatAmount { tier: label });
        }
    }

    for pair in tiers.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        match lower.max_amount {
            None => issues.push(ScheduleIssue::UnboundedNotLast { tier: lower.label() }),
            Some(max) if max < upper.min_amount => issues.push(ScheduleIssue::Gap {
                lower_max: max,
                upper_min: upper.min_amount,
            }),
            Some(max) if max > upper.min_amount => issues.push(ScheduleIssue::Overlap {
                lower: lower.label(),
                upper: upper.label(),
            }),
            Some(_) => {}
        }
    }

    if issues.is_empty() {
        debug!("Schedule '{}' passed validation", schedule.id);
    } else {
        info!(
            "Schedule '{}' has {} validation issue(s)",
            schedule.id,
            issues.len()
        );
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::model::FeeTier;

    #[test]
    fn test_contiguous_schedule_is_clean() {
        let schedule = FeeSchedule::new(
            "ok",
            vec![
                FeeTier::new(0.0, Some(1_000_000.0), 1.0),
                FeeTier::new(1_000_000.0, None, 0.5),
            ],
        );
        assert!(validate_schedule(&schedule).is_empty());
    }

    #[test]
    fn test_empty_schedule() {
        let schedule = FeeSchedule::new("empty", Vec::new());
        assert_eq!(validate_schedule(&schedule), vec![ScheduleIssue::NoTiers]);
    }

    #[test]
    fn test_gap_detected() {
        let schedule = FeeSchedule::new(
            "gap",
            vec![
                FeeTier::new(0.0, Some(100.0), 1.0),
                FeeTier::new(200.0, None, 1.0),
            ],
        );
        assert_eq!(
            validate_schedule(&schedule),
            vec![ScheduleIssue::Gap {
                lower_max: 100.0,
                upper_min: 200.0
            }]
        );
    }

    #[test]
    fn test_overlap_and_unbounded_detected() {
        let schedule = FeeSchedule::new(
            "bad",
            vec![
                FeeTier::new(0.0, Some(500.0), 1.0),
                FeeTier::new(400.0, None, 1.0),
                FeeTier::new(1_000.0, Some(2_000.0), 1.0),
            ],
        );
        let issues = validate_schedule(&schedule);
        assert!(issues
            .iter()
            .any(|i| matches!(i, ScheduleIssue::Overlap { .. })));
        assert!(issues
            .iter()
            .any(|i| matches!(i, ScheduleIssue::UnboundedNotLast { .. })));
    }

    #[test]
    fn test_value_ranges() {
        let mut tier = FeeTier::new(-10.0, Some(-20.0), 150.0);
        tier.flat_amount = Some(-1.0);
        let schedule = FeeSchedule::new("ranges", vec![tier])
            .with_minimum_fee(100.0)
            .with_maximum_fee(50.0);

        let issues = validate_schedule(&schedule);
        assert!(issues.contains(&ScheduleIssue::MinimumExceedsMaximum {
            minimum: 100.0,
            maximum: 50.0
        }));
        assert!(issues
            .iter()
            .any(|i| matches!(i, ScheduleIssue::NegativeMinimum { .. })));
        assert!(issues
            .iter()
            .any(|i| matches!(i, ScheduleIssue::EmptyRange { .. })));
        assert!(issues
            .iter()
            .any(|i| matches!(i, ScheduleIssue::RateOutOfRange { rate, .. } if *rate == 150.0)));
        assert!(issues
            .iter()
            .any(|i| matches!(i, ScheduleIssue::NegativeFlatAmount { .. })));
    }

    #[test]
    fn test_first_tier_offset() {
        let schedule = FeeSchedule::new("offset", vec![FeeTier::new(250_000.0, None, 1.0)]);
        assert_eq!(
            validate_schedule(&schedule),
            vec![ScheduleIssue::FirstTierNotAtZero(250_000.0)]
        );
    }

    #[test]
    fn test_issue_display() {
        let issue = ScheduleIssue::MinimumExceedsMaximum {
            minimum: 10.0,
            maximum: 5.0,
        };
        assert_eq!(issue.to_string(), "Minimum fee 10 exceeds maximum fee 5");
    }
}
