//! Error taxonomy for the inference pipeline

use serde::Serialize;
use thiserror::Error;

/// A request field that was present but could not be coerced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidField {
    pub field: String,
    pub reason: String,
}

impl InvalidField {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced to the caller of the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{}", describe_validation(.missing, .invalid))]
    Validation {
        missing: Vec<String>,
        invalid: Vec<InvalidField>,
    },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Inference error: {0}")]
    Inference(String),
}

impl PipelineError {
    pub fn missing(fields: Vec<String>) -> Self {
        PipelineError::Validation {
            missing: fields,
            invalid: Vec::new(),
        }
    }

    pub fn invalid(fields: Vec<InvalidField>) -> Self {
        PipelineError::Validation {
            missing: Vec::new(),
            invalid: fields,
        }
    }

    /// HTTP-style status code for this failure class
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::Validation { .. } => 400,
            PipelineError::Encoding(_) | PipelineError::Inference(_) => 500,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, PipelineError::Validation { .. })
    }
}

fn describe_validation(missing: &[String], invalid: &[InvalidField]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("Missing required fields: {}", missing.join(", ")));
    }
    if !invalid.is_empty() {
        let details: Vec<String> = invalid
            .iter()
            .map(|f| format!("{} ({})", f.field, f.reason))
            .collect();
        parts.push(format!("Invalid fields: {}", details.join(", ")));
    }
    if parts.is_empty() {
        "Validation failed".to_string()
    } else {
        parts.join("; ")
    }
}
