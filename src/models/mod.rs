//! Frozen model loading and invocation

pub mod inference;
pub mod loader;

pub use inference::{InferenceInvoker, OnnxRegressor, Regressor};
pub use loader::ModelLoader;
