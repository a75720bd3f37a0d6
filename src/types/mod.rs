//! Type definitions for the irrigation inference pipeline

pub mod request;
pub mod response;

pub use request::{CanonicalRecord, RawRequest};
pub use response::{ErrorResponse, PredictionResponse};
