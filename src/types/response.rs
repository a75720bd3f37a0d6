//! Outbound payloads

use crate::error::{InvalidField, PipelineError};
use crate::types::request::CanonicalRecord;
use serde::{Deserialize, Serialize};

/// Successful prediction payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Water requirement, rounded to 2 decimals
    pub water_required: f64,
    pub status: String,
    pub message: String,
    /// The canonical record the model actually consumed
    pub features_used: CanonicalRecord,
}

impl PredictionResponse {
    pub fn new(water_required: f64, features_used: CanonicalRecord) -> Self {
        Self {
            water_required,
            status: "success".to_string(),
            message: "Prediction successful".to_string(),
            features_used,
        }
    }
}

/// Failure payload
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalid_fields: Vec<InvalidField>,
}

impl From<&PipelineError> for ErrorResponse {
    fn from(err: &PipelineError) -> Self {
        let (missing_fields, invalid_fields) = match err {
            PipelineError::Validation { missing, invalid } => (missing.clone(), invalid.clone()),
            _ => (Vec::new(), Vec::new()),
        };

        Self {
            status: "error".to_string(),
            error: err.to_string(),
            message: "Prediction failed".to_string(),
            missing_fields,
            invalid_fields,
        }
    }
}
