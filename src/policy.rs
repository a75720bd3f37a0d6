//! Post-inference override rule.
//!
//! When the field already holds standing water, crops outside the
//! water-tolerant set need no irrigation whatever the model says.

use crate::normalizer::{round_to, to_title_case};
use crate::types::request::CanonicalRecord;
use std::collections::BTreeSet;
use tracing::info;

/// Final value after the override rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverrideOutcome {
    /// Water requirement, rounded to 2 decimals
    pub water_required: f64,
    pub overridden: bool,
}

#[derive(Debug, Clone)]
pub struct OverridePolicy {
    water_tolerant: BTreeSet<String>,
}

impl OverridePolicy {
    /// Build from crop names. Names are title-cased to match canonical records.
    pub fn from_crops<I, S>(crops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            water_tolerant: crops
                .into_iter()
                .map(|c| to_title_case(c.as_ref().trim()))
                .collect(),
        }
    }

    pub fn is_water_tolerant(&self, crop: &str) -> bool {
        self.water_tolerant.contains(crop)
    }

    pub fn water_tolerant_crops(&self) -> impl Iterator<Item = &str> {
        self.water_tolerant.iter().map(String::as_str)
    }

    /// Apply the rule to a raw model prediction using canonical field values
    pub fn apply(&self, record: &CanonicalRecord, raw_prediction: f64) -> OverrideOutcome {
        if record.water_level > 0.0 && !self.is_water_tolerant(&record.crop_name) {
            info!(
                crop = %record.crop_name,
                water_level = record.water_level,
                raw_prediction,
                "Applied water level override"
            );
            return OverrideOutcome {
                water_required: 0.0,
                overridden: true,
            };
        }

        OverrideOutcome {
            water_required: round_to(raw_prediction, 2),
            overridden: false,
        }
    }
}

impl Default for OverridePolicy {
    fn default() -> Self {
        Self::from_crops(["Rice"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(crop: &str, water_level: f64) -> CanonicalRecord {
        CanonicalRecord {
            crop_name: crop.to_string(),
            soil_type: "Clay".to_string(),
            soil_moisture: 40.0,
            temperature: 28.0,
            humidity: 60.0,
            water_level,
            crop_age: 30,
            rainfall: None,
        }
    }

    #[test]
    fn test_standing_water_zeroes_non_tolerant_crop() {
        let policy = OverridePolicy::default();
        for raw in [0.0, 12.5, 987.654] {
            let outcome = policy.apply(&record("Wheat", 0.1), raw);
            assert_eq!(outcome.water_required, 0.0);
            assert!(outcome.overridden);
        }
    }

    #[test]
    fn test_rice_keeps_model_output() {
        let policy = OverridePolicy::default();
        for level in [0.0, 10.0, 100.0] {
            let outcome = policy.apply(&record("Rice", level), 123.456);
            assert_eq!(outcome.water_required, 123.46);
            assert!(!outcome.overridden);
        }
    }

    #[test]
    fn test_dry_field_keeps_model_output() {
        let outcome = OverridePolicy::default().apply(&record("Wheat", 0.0), 55.556);
        assert_eq!(outcome.water_required, 55.56);
        assert!(!outcome.overridden);
    }

    #[test]
    fn test_configured_exception_set() {
        let policy = OverridePolicy::from_crops(["rice", " TARO "]);
        assert!(policy.is_water_tolerant("Rice"));
        assert!(policy.is_water_tolerant("Taro"));
        assert!(!policy.apply(&record("Taro", 5.0), 10.0).overridden);
        assert!(policy.apply(&record("Corn", 5.0), 10.0).overridden);
    }
}
