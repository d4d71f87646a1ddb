//! Fee Schedule Data Model
//!
//! A fee schedule is a set of amount tiers, each charging either a
//! percentage of the billable amount falling inside it or a flat fee,
//! with optional floor and ceiling on the resulting total.
//!
//! # Example YAML Format
//!
//! ```yaml
//! id: standard-aum
//! name: Standard AUM
//! frequency: quarterly
//! minimum_fee: 5000
//! tiers:
//!   - name: First million
//!     min_amount: 0
//!     max_amount: 1000000
//!     rate: 1.0
//!
//!   - min_amount: 1000000
//!     max_amount: 5000000
//!     rate: 0.75
//!
//!   - min_amount: 5000000
//!     rate: 0.5
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// One amount range within a fee schedule.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FeeTier {
    /// Display name; a name is derived from the bounds when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Inclusive lower bound of the tier
    pub min_amount: f64,

    /// Upper bound of the tier, unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<f64>,

    /// Percentage (0-100) applied to the portion of the amount in this tier
    #[serde(default)]
    pub rate: f64,

    /// Fixed fee replacing the rate-based charge for this tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat_amount: Option<f64>,

    /// Presentation ordering only; evaluation always sorts by `min_amount`
    #[serde(default)]
    pub display_order: u32,
}

impl FeeTier {
    /// Creates a rate-based tier.
    ///
    /// # Example
    ///
    /// ```
    /// use wealthflow::fees::FeeTier;
    ///
    /// let tier = FeeTier::new(0.0, Some(1_000_000.0), 1.0).with_name("First million");
    /// assert_eq!(tier.label(), "First million");
    /// ```
    pub fn new(min_amount: f64, max_amount: Option<f64>, rate: f64) -> Self {
        Self {
            name: None,
            min_amount,
            max_amount,
            rate,
            flat_amount: None,
            display_order: 0,
        }
    }

    /// Creates a tier that charges a fixed amount once reached.
    pub fn flat(min_amount: f64, max_amount: Option<f64>, flat_amount: f64) -> Self {
        Self {
            flat_amount: Some(flat_amount),
            ..Self::new(min_amount, max_amount, 0.0)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_display_order(mut self, order: u32) -> Self {
        self.display_order = order;
        self
    }

    /// Upper bound used during evaluation.
    pub fn upper_bound(&self) -> f64 {
        self.max_amount.unwrap_or(f64::INFINITY)
    }

    /// Returns the configured name, or one derived from the tier bounds.
    pub fn label(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match self.max_amount {
            Some(max) => format!("Tier {}-{}", self.min_amount, max),
            None => format!("Tier {}+", self.min_amount),
        }
    }
}

/// How often a schedule's annual fee is billed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BillingFrequency {
    Monthly,
    #[default]
    Quarterly,
    SemiAnnual,
    Annual,
}

impl BillingFrequency {
    pub fn periods_per_year(self) -> u32 {
        match self {
            Self::Monthly => 12,
            Self::Quarterly => 4,
            Self::SemiAnnual => 2,
            Self::Annual => 1,
        }
    }
}

impl fmt::Display for BillingFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::SemiAnnual => "semi_annual",
            Self::Annual => "annual",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for BillingFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "semi_annual" | "semi-annual" | "semiannual" => Ok(Self::SemiAnnual),
            "annual" | "yearly" => Ok(Self::Annual),
            other => Err(format!("Unknown billing frequency: {}", other)),
        }
    }
}

/// A tiered fee schedule. Read-only input to the calculator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FeeSchedule {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub tiers: Vec<FeeTier>,

    /// Floor applied after tier summation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_fee: Option<f64>,

    /// Ceiling applied after the floor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_fee: Option<f64>,

    #[serde(default)]
    pub frequency: BillingFrequency,
}

impl FeeSchedule {
    /// Creates a schedule from a list of tiers with no clamps.
    pub fn new(id: impl Into<String>, tiers: Vec<FeeTier>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            tiers,
            minimum_fee: None,
            maximum_fee: None,
            frequency: BillingFrequency::default(),
        }
    }

    pub fn with_minimum_fee(mut self, fee: f64) -> Self {
        self.minimum_fee = Some(fee);
        self
    }

    pub fn with_maximum_fee(mut self, fee: f64) -> Self {
        self.maximum_fee = Some(fee);
        self
    }

    pub fn with_frequency(mut self, frequency: BillingFrequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// Tiers in evaluation order: ascending `min_amount`, stable.
    pub fn sorted_tiers(&self) -> Vec<&FeeTier> {
        let mut tiers: Vec<&FeeTier> = self.tiers.iter().collect();
        tiers.sort_by(|a, b| a.min_amount.total_cmp(&b.min_amount));
        tiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_label_defaults_from_bounds() {
        let bounded = FeeTier::new(0.0, Some(1_000_000.0), 1.0);
        assert_eq!(bounded.label(), "Tier 0-1000000");

        let unbounded = FeeTier::new(5_000_000.0, None, 0.5);
        assert_eq!(unbounded.label(), "Tier 5000000+");
    }

    #[test]
    fn test_tier_label_prefers_name() {
        let tier = FeeTier::new(0.0, None, 1.0).with_name("All assets");
        assert_eq!(tier.label(), "All assets");
    }

    #[test]
    fn test_upper_bound_unbounded() {
        let tier = FeeTier::new(10.0, None, 1.0);
        assert!(tier.upper_bound().is_infinite());
    }

    #[test]
    fn test_sorted_tiers_ignores_display_order() {
        let schedule = FeeSchedule::new(
            "s",
            vec![
                FeeTier::new(1_000.0, None, 0.5).with_display_order(0),
                FeeTier::new(0.0, Some(1_000.0), 1.0).with_display_order(1),
            ],
        );
        let sorted = schedule.sorted_tiers();
        assert_eq!(sorted[0].min_amount, 0.0);
        assert_eq!(sorted[1].min_amount, 1_000.0);
        // Original order untouched
        assert_eq!(schedule.tiers[0].min_amount, 1_000.0);
    }

    #[test]
    fn test_frequency_parsing() {
        assert_eq!("Monthly".parse::<BillingFrequency>(), Ok(BillingFrequency::Monthly));
        assert_eq!("semi-annual".parse::<BillingFrequency>(), Ok(BillingFrequency::SemiAnnual));
        assert!("weekly".parse::<BillingFrequency>().is_err());
        assert_eq!(BillingFrequency::default().periods_per_year(), 4);
    }

    #[test]
    fn test_schedule_yaml_defaults() {
        let yaml = "tiers:\n  - min_amount: 0\n    rate: 1.0\n";
        let schedule: FeeSchedule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(schedule.tiers.len(), 1);
        assert!(schedule.tiers[0].max_amount.is_none());
        assert!(schedule.minimum_fee.is_none());
        assert_eq!(schedule.frequency, BillingFrequency::Quarterly);
    }
}
