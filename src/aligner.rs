//! Schema alignment.
//!
//! Reconciles encoder output against the registry so the model always sees
//! exactly its training columns, in training order. Columns the encoder did
//! not produce are zero-filled and recorded as synthesized; columns the model
//! does not know are dropped and recorded as such.

use crate::encoder::EncodedVector;
use crate::schema::SchemaRegistry;
use tracing::{debug, warn};

/// Feature vector whose columns equal the registry's ordered feature list
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedVector {
    columns: Vec<(String, f64)>,
    synthesized: Vec<String>,
    dropped: Vec<String>,
}

impl AlignedVector {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[(String, f64)] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.columns.iter().map(|(_, v)| *v).collect()
    }

    /// Values as the model tensor expects them
    pub fn values_f32(&self) -> Vec<f32> {
        self.columns.iter().map(|(_, v)| *v as f32).collect()
    }

    /// Registry columns the encoder did not produce, filled with zero
    pub fn synthesized(&self) -> &[String] {
        &self.synthesized
    }

    /// Encoder columns the registry does not list
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    pub fn to_encoded(&self) -> EncodedVector {
        self.columns.iter().cloned().collect()
    }
}

/// Aligns encoder output to the schema registry
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaAligner;

impl SchemaAligner {
    pub fn new() -> Self {
        Self
    }

    pub fn align(&self, encoded: &EncodedVector, registry: &SchemaRegistry) -> AlignedVector {
        let mut columns = Vec::with_capacity(registry.len());
        let mut synthesized = Vec::new();

        for feature in registry.features() {
            let value = match encoded.get(feature) {
                Some(value) => value,
                None => {
                    synthesized.push(feature.clone());
                    0.0
                }
            };
            columns.push((feature.clone(), value));
        }

        let dropped: Vec<String> = encoded
            .names()
            .filter(|name| !registry.contains(name))
            .map(str::to_string)
            .collect();

        if !synthesized.is_empty() {
            warn!(columns = ?synthesized, "Adding missing features");
        }
        if !dropped.is_empty() {
            debug!(columns = ?dropped, "Dropping features unknown to the model");
        }
        debug!(features = ?registry.features(), "Final features");

        AlignedVector {
            columns,
            synthesized,
            dropped,
        }
    }
}
