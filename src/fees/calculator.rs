//! Tiered Fee Calculation
//!
//! Applies a [`FeeSchedule`] to a billable amount progressively: each tier
//! charges only for the slice of the amount between its floor and ceiling
//! that lower tiers have not already consumed. Flat-fee tiers contribute
//! their fixed amount instead. The schedule's minimum and maximum fee are
//! applied to the summed total, minimum first.

use log::debug;
use serde::{Deserialize, Serialize};

use super::model::{BillingFrequency, FeeSchedule};
use crate::error::FeeError;

/// Decimal places kept on the fee amount.
const FEE_PRECISION: u32 = 2;

/// Decimal places kept on the effective rate.
const RATE_PRECISION: u32 = 4;

/// Contribution of a single tier to a calculated fee.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TierBreakdown {
    pub tier_name: String,
    /// Portion of the billable amount that fell inside the tier
    pub amount: f64,
    pub rate: f64,
    pub fee: f64,
}

/// Result of applying a fee schedule to a billable amount.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FeeCalculation {
    /// Total fee after clamping, rounded to cents
    pub fee_amount: f64,
    /// Fee as a percentage of the billable amount, rounded to 4 places
    pub effective_rate: f64,
    pub breakdown: Vec<TierBreakdown>,
}

impl FeeCalculation {
    /// Splits the annual fee evenly across billing periods.
    pub fn period_fee(&self, frequency: BillingFrequency) -> f64 {
        round_to(
            self.fee_amount / f64::from(frequency.periods_per_year()),
            FEE_PRECISION,
        )
    }
}

/// Rounds `value` to `places` decimal places.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Calculates the fee owed on `billable_amount` under `schedule`.
///
/// Tiers are evaluated in ascending `min_amount` order regardless of how
/// they are stored. A tier the amount never reaches, or one left with
/// nothing to bill, is omitted from the breakdown.
///
/// # Example
///
/// ```
/// use wealthflow::fees::{calculate_fee, FeeSchedule, FeeTier};
///
/// let schedule = FeeSchedule::new(
///     "standard",
///     vec![
///         FeeTier::new(0.0, Some(1_000_000.0), 1.0),
///         FeeTier::new(1_000_000.0, Some(5_000_000.0), 0.75),
///         FeeTier::new(5_000_000.0, None, 0.5),
///     ],
/// );
///
/// let result = calculate_fee(&schedule, 2_000_000.0).unwrap();
/// assert_eq!(result.fee_amount, 17_500.0);
/// assert_eq!(result.breakdown.len(), 2);
/// ```
///
/// # Errors
///
/// Returns [`FeeError::InvalidAmount`] when `billable_amount` is negative,
/// NaN or infinite.
pub fn calculate_fee(schedule: &FeeSchedule, billable_amount: f64) -> Result<FeeCalculation, FeeError> {
    if !billable_amount.is_finite() || billable_amount < 0.0 {
        return Err(FeeError::InvalidAmount(billable_amount));
    }

    let mut total_fee = 0.0;
    let mut remaining = billable_amount;
    let mut breakdown = Vec::new();

    for tier in schedule.sorted_tiers() {
        if remaining <= 0.0 {
            break;
        }

        if billable_amount < tier.min_amount {
            continue;
        }

        let allocated = billable_amount - remaining;
        let amount_in_tier = remaining.min(tier.upper_bound() - tier.min_amount.max(allocated));
        if amount_in_tier <= 0.0 {
            continue;
        }

        let tier_fee = match tier.flat_amount {
            Some(flat) => flat,
            None => amount_in_tier * (tier.rate / 100.0),
        };

        debug!(
            "{}: {} at {}% -> {}",
            tier.label(),
            amount_in_tier,
            tier.rate,
            tier_fee
        );

        breakdown.push(TierBreakdown {
            tier_name: tier.label(),
            amount: amount_in_tier,
            rate: tier.rate,
            fee: tier_fee,
        });

        total_fee += tier_fee;
        remaining -= amount_in_tier;
    }

    if let Some(minimum) = schedule.minimum_fee {
        if total_fee < minimum {
            debug!("Raising fee {} to schedule minimum {}", total_fee, minimum);
            total_fee = minimum;
        }
    }

    if let Some(maximum) = schedule.maximum_fee {
        if total_fee > maximum {
            debug!("Capping fee {} at schedule maximum {}", total_fee, maximum);
            total_fee = maximum;
        }
    }

    let effective_rate = if billable_amount > 0.0 {
        total_fee / billable_amount * 100.0
    } else {
        0.0
    };

    Ok(FeeCalculation {
        fee_amount: round_to(total_fee, FEE_PRECISION),
        effective_rate: round_to(effective_rate, RATE_PRECISION),
        breakdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::model::FeeTier;

    fn standard_schedule() -> FeeSchedule {
        FeeSchedule::new(
            "standard",
            vec![
                FeeTier::new(0.0, Some(1_000_000.0), 1.0),
                FeeTier::new(1_000_000.0, Some(5_000_000.0), 0.75),
                FeeTier::new(5_000_000.0, None, 0.5),
            ],
        )
    }

    #[test]
    fn test_single_unbounded_tier_is_proportional() {
        let schedule = FeeSchedule::new("flat-rate", vec![FeeTier::new(0.0, None, 0.85)]);

        for amount in [0.0, 1.0, 999.99, 250_000.0, 12_345_678.9] {
            let result = calculate_fee(&schedule, amount).unwrap();
            assert_eq!(result.fee_amount, round_to(amount * (0.85 / 100.0), 2));
        }
    }

    #[test]
    fn test_two_tiers_reached() {
        let result = calculate_fee(&standard_schedule(), 2_000_000.0).unwrap();

        assert_eq!(result.fee_amount, 17_500.0);
        assert_eq!(result.breakdown.len(), 2);
        assert!((result.breakdown[0].fee - 10_000.0).abs() < 1e-6);
        assert_eq!(result.breakdown[1].amount, 1_000_000.0);
        assert!((result.breakdown[1].fee - 7_500.0).abs() < 1e-6);
        assert_eq!(result.effective_rate, 0.875);
    }

    #[test]
    fn test_all_tiers_reached() {
        let result = calculate_fee(&standard_schedule(), 10_000_000.0).unwrap();

        assert_eq!(result.breakdown.len(), 3);
        assert_eq!(result.fee_amount, 65_000.0);
        assert_eq!(result.breakdown[2].amount, 5_000_000.0);
    }

    #[test]
    fn test_minimum_fee_clamp() {
        let schedule = standard_schedule().with_minimum_fee(5_000.0);
        let result = calculate_fee(&schedule, 100_000.0).unwrap();

        assert_eq!(result.fee_amount, 5_000.0);
        assert!((result.breakdown[0].fee - 1_000.0).abs() < 1e-6);
        assert_eq!(result.effective_rate, 5.0);
    }

    #[test]
    fn test_maximum_fee_clamp() {
        let schedule = standard_schedule().with_maximum_fee(50_000.0);
        let result = calculate_fee(&schedule, 10_000_000.0).unwrap();

        assert_eq!(result.fee_amount, 50_000.0);
        assert_eq!(result.effective_rate, 0.5);
    }

    #[test]
    fn test_maximum_wins_over_minimum() {
        let schedule = standard_schedule()
            .with_minimum_fee(10_000.0)
            .with_maximum_fee(2_000.0);
        let result = calculate_fee(&schedule, 100_000.0).unwrap();

        assert_eq!(result.fee_amount, 2_000.0);
    }

    #[test]
    fn test_zero_amount_has_zero_rate() {
        let schedule = standard_schedule().with_minimum_fee(250.0);
        let result = calculate_fee(&schedule, 0.0).unwrap();

        assert_eq!(result.fee_amount, 250.0);
        assert_eq!(result.effective_rate, 0.0);
        assert!(result.breakdown.is_empty());
    }

    #[test]
    fn test_empty_schedule_still_clamped() {
        let schedule = FeeSchedule::new("empty", Vec::new()).with_minimum_fee(100.0);
        let result = calculate_fee(&schedule, 50_000.0).unwrap();

        assert_eq!(result.fee_amount, 100.0);
        assert!(result.breakdown.is_empty());
        assert_eq!(result.effective_rate, 0.2);

        let unclamped = calculate_fee(&FeeSchedule::new("empty", Vec::new()), 50_000.0).unwrap();
        assert_eq!(unclamped.fee_amount, 0.0);
        assert_eq!(unclamped.effective_rate, 0.0);
    }

    #[test]
    fn test_tiers_sorted_by_min_amount() {
        let mut schedule = standard_schedule();
        schedule.tiers.reverse();

        let result = calculate_fee(&schedule, 2_000_000.0).unwrap();
        assert_eq!(result.fee_amount, 17_500.0);
        assert_eq!(result.breakdown[0].tier_name, "Tier 0-1000000");
    }

    #[test]
    fn test_flat_tier_overrides_rate() {
        let schedule = FeeSchedule::new(
            "flat-base",
            vec![
                FeeTier::flat(0.0, Some(500_000.0), 2_500.0),
                FeeTier::new(500_000.0, None, 0.5),
            ],
        );

        let result = calculate_fee(&schedule, 100_000.0).unwrap();
        assert_eq!(result.fee_amount, 2_500.0);
        assert_eq!(result.breakdown[0].amount, 100_000.0);

        let result = calculate_fee(&schedule, 700_000.0).unwrap();
        assert_eq!(result.fee_amount, 3_500.0);
    }

    #[test]
    fn test_unreached_tier_skipped() {
        let schedule = FeeSchedule::new(
            "gap",
            vec![
                FeeTier::new(0.0, Some(100.0), 1.0),
                FeeTier::new(1_000.0, None, 1.0),
            ],
        );
        let result = calculate_fee(&schedule, 500.0).unwrap();

        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.fee_amount, 1.0);
    }

    #[test]
    fn test_tier_above_amount_contributes_nothing() {
        let schedule = FeeSchedule::new(
            "high-floor",
            vec![FeeTier::flat(1_000_000.0, None, 9_999.0)],
        );
        let result = calculate_fee(&schedule, 999_999.0).unwrap();

        assert_eq!(result.fee_amount, 0.0);
        assert!(result.breakdown.is_empty());
    }

    #[test]
    fn test_rounding() {
        let schedule = FeeSchedule::new("odd", vec![FeeTier::new(0.0, None, 0.333)]);
        let result = calculate_fee(&schedule, 1_234.56).unwrap();

        assert_eq!(result.fee_amount, 4.11);
        assert_eq!(result.effective_rate, 0.333);
    }

    #[test]
    fn test_negative_amount_rejected() {
        let err = calculate_fee(&standard_schedule(), -1.0).unwrap_err();
        assert!(matches!(err, FeeError::InvalidAmount(_)));

        assert!(calculate_fee(&standard_schedule(), f64::NAN).is_err());
        assert!(calculate_fee(&standard_schedule(), f64::INFINITY).is_err());
    }

    #[test]
    fn test_period_fee() {
        let result = calculate_fee(&standard_schedule(), 2_000_000.0).unwrap();
        assert_eq!(result.period_fee(BillingFrequency::Quarterly), 4_375.0);
        assert_eq!(result.period_fee(BillingFrequency::Monthly), 1_458.33);
        assert_eq!(result.period_fee(BillingFrequency::Annual), 17_500.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(0.123456, 4), 0.1235);
    }
}
