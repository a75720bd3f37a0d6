//! Categorical encoding strategies.
//!
//! Two schemes exist and a deployment uses exactly one, chosen from the
//! artifacts present at startup. Both pass the numeric fields of the record
//! through unchanged under their training column names.

use crate::error::PipelineError;
use crate::schema::SchemaRegistry;
use crate::types::request::{columns, CanonicalRecord};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Encoder output: named numeric columns in production order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedVector {
    columns: Vec<(String, f64)>,
}

impl EncodedVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing any previous value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for EncodedVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut encoded = EncodedVector::new();
        for (name, value) in iter {
            encoded.insert(name, value);
        }
        encoded
    }
}

/// Converts the categorical fields of a record into model columns
pub trait CategoricalEncoder: Send + Sync {
    /// Scheme name for logs and health output
    fn name(&self) -> &'static str;

    fn encode(&self, record: &CanonicalRecord) -> Result<EncodedVector, PipelineError>;
}

fn pass_through_numeric(record: &CanonicalRecord, encoded: &mut EncodedVector) {
    for (name, value) in record.numeric_columns() {
        encoded.insert(name, value);
    }
}

/// Learned score table for one categorical column
#[derive(Debug, Clone, Deserialize)]
pub struct TargetColumn {
    pub mapping: HashMap<String, f64>,
    /// Score for values unseen at training time (the global target mean)
    pub default: f64,
}

#[derive(Debug, Deserialize)]
struct TargetEncoderArtifact {
    columns: HashMap<String, TargetColumn>,
}

/// Pre-fitted target encoding: each category value becomes its learned score.
/// The placeholder column the model was fitted with is always emitted as 0.0.
#[derive(Debug, Clone)]
pub struct TargetEncoder {
    columns: HashMap<String, TargetColumn>,
}

impl TargetEncoder {
    pub fn new(columns: HashMap<String, TargetColumn>) -> Result<Self> {
        for (name, column) in &columns {
            if !column.default.is_finite() || column.default.abs() > f32::MAX as f64 {
                bail!("Target encoding for '{}' has an out-of-range default", name);
            }
            if let Some((value, _)) = column
                .mapping
                .iter()
                .find(|(_, s)| !s.is_finite() || s.abs() > f32::MAX as f64)
            {
                bail!(
                    "Target encoding for '{}' has an out-of-range score for '{}'",
                    name,
                    value
                );
            }
        }
        Ok(Self { columns })
    }

    /// Load the fitted transform. It must cover every categorical column of the record.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read target encoder from {}", path.display()))?;
        let artifact: TargetEncoderArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse target encoder {}", path.display()))?;

        for column in columns::CATEGORICAL {
            if !artifact.columns.contains_key(column) {
                bail!(
                    "Target encoder {} has no mapping for column '{}'",
                    path.display(),
                    column
                );
            }
        }

        let encoder = Self::new(artifact.columns)?;
        info!(
            path = %path.display(),
            columns = encoder.columns.len(),
            "Target encoder loaded"
        );
        Ok(encoder)
    }
}

impl CategoricalEncoder for TargetEncoder {
    fn name(&self) -> &'static str {
        "target"
    }

    fn encode(&self, record: &CanonicalRecord) -> Result<EncodedVector, PipelineError> {
        let mut encoded = EncodedVector::new();

        for (column, value) in record.categorical_columns() {
            let table = self.columns.get(column).ok_or_else(|| {
                PipelineError::Encoding(format!("no target encoding for column '{}'", column))
            })?;

            let score = match table.mapping.get(value) {
                Some(score) => *score,
                None => {
                    debug!(column, value, "Unseen category, using encoder default");
                    table.default
                }
            };
            encoded.insert(column, score);
        }

        pass_through_numeric(record, &mut encoded);
        encoded.insert(columns::DUMMY_FEATURE, 0.0);
        Ok(encoded)
    }
}

/// One indicator column per known category value, named `{column}_{value}`
#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    vocabulary: BTreeMap<String, Vec<String>>,
}

impl OneHotEncoder {
    pub fn new(vocabulary: BTreeMap<String, Vec<String>>) -> Result<Self> {
        if vocabulary.is_empty() {
            bail!("One-hot vocabulary is empty");
        }

        for column in vocabulary.keys() {
            if !columns::CATEGORICAL.contains(&column.as_str()) {
                bail!("One-hot vocabulary names unknown column '{}'", column);
            }
        }

        Ok(Self { vocabulary })
    }

    pub fn indicator_name(column: &str, value: &str) -> String {
        format!("{}_{}", column, value)
    }
}

impl CategoricalEncoder for OneHotEncoder {
    fn name(&self) -> &'static str {
        "one_hot"
    }

    fn encode(&self, record: &CanonicalRecord) -> Result<EncodedVector, PipelineError> {
        let mut encoded = EncodedVector::new();
        pass_through_numeric(record, &mut encoded);

        for (column, known) in &self.vocabulary {
            let value = record.category(column).ok_or_else(|| {
                PipelineError::Encoding(format!("record has no categorical column '{}'", column))
            })?;

            if !known.iter().any(|k| k == value) {
                debug!(column = %column, value, "Category outside vocabulary, all indicators zero");
            }
            for candidate in known {
                let hot = if candidate == value { 1.0 } else { 0.0 };
                encoded.insert(Self::indicator_name(column, candidate), hot);
            }
        }

        Ok(encoded)
    }
}

/// Pick the encoding scheme from the artifacts that were deployed
pub fn select_encoder(
    registry: &SchemaRegistry,
    encoder_path: Option<&Path>,
) -> Result<Box<dyn CategoricalEncoder>> {
    match encoder_path {
        Some(path) => Ok(Box::new(TargetEncoder::load(path)?)),
        None if !registry.categories().is_empty() => {
            let encoder = OneHotEncoder::new(registry.categories().clone())
                .context("Invalid one-hot vocabulary in model metadata")?;
            info!(
                columns = registry.categories().len(),
                "One-hot encoder built from metadata vocabulary"
            );
            Ok(Box::new(encoder))
        }
        None => bail!(
            "No encoder artifact configured and model metadata has no category vocabulary"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(crop: &str, soil: &str) -> CanonicalRecord {
        CanonicalRecord {
            crop_name: crop.to_string(),
            soil_type: soil.to_string(),
            soil_moisture: 40.0,
            temperature: 28.0,
            humidity: 60.0,
            water_level: 10.0,
            crop_age: 30,
            rainfall: None,
        }
    }

    fn target_encoder() -> TargetEncoder {
        let mut columns = HashMap::new();
        columns.insert(
            "Crop Name".to_string(),
            TargetColumn {
                mapping: HashMap::from([("Rice".to_string(), 820.5), ("Wheat".to_string(), 410.0)]),
                default: 600.0,
            },
        );
        columns.insert(
            "Soil Type".to_string(),
            TargetColumn {
                mapping: HashMap::from([("Clay".to_string(), 550.0)]),
                default: 575.0,
            },
        );
        TargetEncoder::new(columns).unwrap()
    }

    fn vocabulary() -> BTreeMap<String, Vec<String>> {
        BTreeMap::from([
            (
                "Crop Name".to_string(),
                vec!["Rice".to_string(), "Wheat".to_string(), "Corn".to_string()],
            ),
            (
                "Soil Type".to_string(),
                vec!["Clay".to_string(), "Red Soil".to_string()],
            ),
        ])
    }

    #[test]
    fn test_target_encoding_known_values() {
        let encoded = target_encoder().encode(&record("Rice", "Clay")).unwrap();
        assert_eq!(encoded.get(columns::CROP_NAME), Some(820.5));
        assert_eq!(encoded.get(columns::SOIL_TYPE), Some(550.0));
        assert_eq!(encoded.get(columns::HUMIDITY), Some(60.0));
        assert_eq!(encoded.get(columns::CROP_AGE), Some(30.0));
        assert_eq!(encoded.get(columns::DUMMY_FEATURE), Some(0.0));
        assert_eq!(encoded.len(), 8);
    }

    #[test]
    fn test_target_encoding_unseen_value_uses_default() {
        let encoded = target_encoder().encode(&record("Quinoa", "Sand")).unwrap();
        assert_eq!(encoded.get(columns::CROP_NAME), Some(600.0));
        assert_eq!(encoded.get(columns::SOIL_TYPE), Some(575.0));
    }

    #[test]
    fn test_target_encoder_rejects_out_of_range_scores() {
        let columns = HashMap::from([(
            "Crop Name".to_string(),
            TargetColumn {
                mapping: HashMap::new(),
                default: f64::NAN,
            },
        )]);
        assert!(TargetEncoder::new(columns).is_err());

        let columns = HashMap::from([(
            "Crop Name".to_string(),
            TargetColumn {
                mapping: HashMap::from([("Rice".to_string(), 1e39)]),
                default: 0.0,
            },
        )]);
        assert!(TargetEncoder::new(columns).is_err());
    }

    #[test]
    fn test_empty_category_uses_fallbacks() {
        let encoded = target_encoder().encode(&record("", "Clay")).unwrap();
        assert_eq!(encoded.get(columns::CROP_NAME), Some(600.0));

        let encoded = OneHotEncoder::new(vocabulary())
            .unwrap()
            .encode(&record("", "Clay"))
            .unwrap();
        assert_eq!(encoded.get("Crop Name_Rice"), Some(0.0));
        assert_eq!(encoded.get("Crop Name_Wheat"), Some(0.0));
        assert_eq!(encoded.get("Crop Name_Corn"), Some(0.0));
    }

    #[test]
    fn test_target_encoder_load_requires_all_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"columns": {{"Crop Name": {{"mapping": {{"Rice": 1.0}}, "default": 0.5}}}}}}"#
        )
        .unwrap();
        let err = TargetEncoder::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Soil Type"));
    }

    #[test]
    fn test_one_hot_sets_single_indicator() {
        let encoder = OneHotEncoder::new(vocabulary()).unwrap();
        let encoded = encoder.encode(&record("Wheat", "Clay")).unwrap();

        assert_eq!(encoded.get("Crop Name_Wheat"), Some(1.0));
        assert_eq!(encoded.get("Crop Name_Rice"), Some(0.0));
        assert_eq!(encoded.get("Crop Name_Corn"), Some(0.0));
        assert_eq!(encoded.get("Soil Type_Clay"), Some(1.0));
        assert_eq!(encoded.get("Soil Type_Red Soil"), Some(0.0));
        assert_eq!(encoded.get(columns::WATER_LEVEL), Some(10.0));
    }

    #[test]
    fn test_one_hot_unknown_value_is_all_zero() {
        let encoder = OneHotEncoder::new(vocabulary()).unwrap();
        let encoded = encoder.encode(&record("Quinoa", "Clay")).unwrap();

        let crop_sum: f64 = encoded
            .iter()
            .filter(|(name, _)| name.starts_with("Crop Name_"))
            .map(|(_, v)| v)
            .sum();
        assert_eq!(crop_sum, 0.0);
        assert_eq!(encoded.get("Soil Type_Clay"), Some(1.0));
    }

    #[test]
    fn test_one_hot_rejects_unknown_column() {
        let vocab = BTreeMap::from([("Region".to_string(), vec!["North".to_string()])]);
        assert!(OneHotEncoder::new(vocab).is_err());
    }

    #[test]
    fn test_select_encoder_without_artifacts_fails() {
        let registry = SchemaRegistry::new(vec!["a".to_string()], BTreeMap::new()).unwrap();
        assert!(select_encoder(&registry, None).is_err());

        let registry = SchemaRegistry::new(vec!["a".to_string()], vocabulary()).unwrap();
        let encoder = select_encoder(&registry, None).unwrap();
        assert_eq!(encoder.name(), "one_hot");
    }
}
