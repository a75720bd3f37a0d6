//! Schema registry: the ordered feature set the frozen model was trained on.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

/// On-disk metadata descriptor written at training time
#[derive(Debug, Deserialize)]
struct ModelMetadata {
    feature_names: Vec<String>,
    /// Training vocabulary per categorical column, used by the one-hot scheme
    #[serde(default)]
    categories: BTreeMap<String, Vec<String>>,
}

/// Immutable description of the model's expected input columns.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    features: Vec<String>,
    index: HashMap<String, usize>,
    categories: BTreeMap<String, Vec<String>>,
}

impl SchemaRegistry {
    /// Build a registry from an ordered feature list
    pub fn new(features: Vec<String>, categories: BTreeMap<String, Vec<String>>) -> Result<Self> {
        if features.is_empty() {
            bail!("Feature list is empty");
        }

        let mut index = HashMap::with_capacity(features.len());
        for (position, name) in features.iter().enumerate() {
            if index.insert(name.clone(), position).is_some() {
                bail!("Duplicate feature name '{}'", name);
            }
        }

        Ok(Self {
            features,
            index,
            categories,
        })
    }

    /// Load the metadata descriptor from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model metadata from {}", path.display()))?;
        let metadata: ModelMetadata = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse model metadata {}", path.display()))?;

        let registry = Self::new(metadata.feature_names, metadata.categories)
            .with_context(|| format!("Invalid model metadata {}", path.display()))?;

        info!(
            path = %path.display(),
            features = registry.len(),
            categorical_columns = registry.categories.len(),
            "Schema registry loaded"
        );

        Ok(registry)
    }

    /// Feature names in model order
    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn categories(&self) -> &BTreeMap<String, Vec<String>> {
        &self.categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_metadata() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"feature_names": ["Crop Name", "Soil Type", "Humidity (%)"], "target": "Water (ml)"}}"#
        )
        .unwrap();

        let registry = SchemaRegistry::load(file.path()).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.position("Humidity (%)"), Some(2));
        assert!(!registry.contains("Dummy Feature"));
        assert!(registry.categories().is_empty());
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(SchemaRegistry::new(vec![], BTreeMap::new()).is_err());
        assert!(
            SchemaRegistry::new(vec!["a".into(), "b".into(), "a".into()], BTreeMap::new()).is_err()
        );
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = SchemaRegistry::load("/nonexistent/metadata.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read model metadata"));
    }
}
