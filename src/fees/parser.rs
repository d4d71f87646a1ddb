//! Fee Schedule Parser
//!
//! Loads fee schedules from YAML. Structural issues are logged but never
//! block loading; the calculator evaluates whatever tiers it is given.

use std::fs;
use std::path::Path;

use log::{info, warn};

use super::model::FeeSchedule;
use super::validator::validate_schedule;
use crate::error::FeeError;

/// Loads a fee schedule from a YAML file.
///
/// When the file does not set an `id`, the file stem is used.
pub fn load_fee_schedule(path: impl AsRef<Path>) -> Result<FeeSchedule, FeeError> {
    let path = path.as_ref();
    info!("Loading fee schedule from {}", path.display());

    let content = fs::read_to_string(path)?;
    let mut schedule = parse_fee_schedule(&content)?;

    if schedule.id.is_empty() {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            schedule.id = stem.to_string();
        }
    }

    Ok(schedule)
}

/// Parses a fee schedule from a YAML string.
pub fn parse_fee_schedule(content: &str) -> Result<FeeSchedule, FeeError> {
    let schedule: FeeSchedule = serde_yaml::from_str(content)?;

    info!(
        "Parsed schedule '{}' with {} tier(s)",
        schedule.id,
        schedule.tiers.len()
    );

    for issue in validate_schedule(&schedule) {
        warn!("Schedule '{}': {}", schedule.id, issue);
    }

    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::model::BillingFrequency;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const STANDARD: &str = r#"
id: standard-aum
name: Standard AUM
frequency: monthly
minimum_fee: 5000
maximum_fee: 50000
tiers:
  - name: First million
    min_amount: 0
    max_amount: 1000000
    rate: 1.0
    display_order: 1
  - min_amount: 1000000
    max_amount: 5000000
    rate: 0.75
  - min_amount: 5000000
    rate: 0.5
"#;

    #[test]
    fn test_parse_schedule() {
        let schedule = parse_fee_schedule(STANDARD).unwrap();

        assert_eq!(schedule.id, "standard-aum");
        assert_eq!(schedule.tiers.len(), 3);
        assert_eq!(schedule.minimum_fee, Some(5000.0));
        assert_eq!(schedule.maximum_fee, Some(50000.0));
        assert_eq!(schedule.frequency, BillingFrequency::Monthly);
        assert_eq!(schedule.tiers[0].name.as_deref(), Some("First million"));
        assert!(schedule.tiers[2].max_amount.is_none());
    }

    #[test]
    fn test_parse_flat_tier() {
        let yaml = "tiers:\n  - min_amount: 0\n    flat_amount: 1500\n";
        let schedule = parse_fee_schedule(yaml).unwrap();
        assert_eq!(schedule.tiers[0].flat_amount, Some(1500.0));
        assert_eq!(schedule.tiers[0].rate, 0.0);
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = parse_fee_schedule("tiers: [unclosed");
        assert!(matches!(result, Err(FeeError::Parse(_))));
    }

    #[test]
    fn test_load_uses_file_stem_as_id() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "tiers:\n  - min_amount: 0\n    rate: 1.0").unwrap();

        let schedule = load_fee_schedule(file.path()).unwrap();
        let stem = file.path().file_stem().unwrap().to_str().unwrap();
        assert_eq!(schedule.id, stem);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_fee_schedule("/nonexistent/schedule.yaml");
        assert!(matches!(result, Err(FeeError::Io(_))));
    }

    #[test]
    fn test_bundled_standard_schedule() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("schedules/standard.yaml");
        let schedule = load_fee_schedule(path).unwrap();

        assert!(validate_schedule(&schedule).is_empty());
        let result = crate::fees::calculate_fee(&schedule, 2_000_000.0).unwrap();
        assert!((result.fee_amount - 17_500.0).abs() < 1e-9);
    }
}
