//! Irrigation Inference Library
//!
//! Predicts the irrigation water requirement for a field from soil, weather
//! and crop readings using a frozen regression model. The core of the crate
//! is the feature alignment pipeline that turns loosely typed client input
//! into the exact column layout the model was trained on.

pub mod aligner;
pub mod config;
pub mod encoder;
pub mod error;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod policy;
pub mod schema;
pub mod server;
pub mod types;
pub mod weather;

pub use aligner::{AlignedVector, SchemaAligner};
pub use config::AppConfig;
pub use encoder::{CategoricalEncoder, EncodedVector, OneHotEncoder, TargetEncoder};
pub use error::PipelineError;
pub use models::inference::{InferenceInvoker, Regressor};
pub use normalizer::{InputNormalizer, ValidationMode};
pub use pipeline::{PipelineContext, PredictionOutcome};
pub use policy::OverridePolicy;
pub use schema::SchemaRegistry;
pub use types::{request::CanonicalRecord, request::RawRequest};
pub use weather::WeatherSource;
