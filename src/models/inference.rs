//! Inference invoker for the frozen water requirement regressor

use crate::aligner::AlignedVector;
use crate::error::PipelineError;
use crate::models::loader::{LoadedModel, ModelLoader};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, error};

/// A frozen model: a deterministic function of the aligned feature values
pub trait Regressor: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, features: &[f32]) -> Result<f64>;
}

/// Regressor backed by an ONNX Runtime session
pub struct OnnxRegressor {
    name: String,
    // Session::run takes &mut self
    model: Mutex<LoadedModel>,
}

impl OnnxRegressor {
    pub fn load<P: AsRef<Path>>(path: P, onnx_threads: usize) -> Result<Self> {
        let model = ModelLoader::with_threads(onnx_threads).load_model(path)?;
        Ok(Self {
            name: model.name.clone(),
            model: Mutex::new(model),
        })
    }

    /// Extract the predicted value from the model output
    fn extract_value(outputs: &ort::session::SessionOutputs, output_name: &str) -> Result<f64> {
        if let Some(output) = outputs.get(output_name) {
            if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
                if let Some(&value) = data.first() {
                    return Ok(value as f64);
                }
            }
            if let Ok((_, data)) = output.try_extract_tensor::<f64>() {
                if let Some(&value) = data.first() {
                    return Ok(value);
                }
            }
        }

        // Fallback: first numeric tensor among all outputs
        for (name, output) in outputs.iter() {
            if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
                if let Some(&value) = data.first() {
                    debug!(output = %name, value, "Extracted from tensor (fallback)");
                    return Ok(value as f64);
                }
            }
        }

        anyhow::bail!("Model produced no numeric output")
    }
}

impl Regressor for OnnxRegressor {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &[f32]) -> Result<f64> {
        use ort::value::Tensor;

        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .context("Failed to create input tensor")?;

        let mut model = self
            .model
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let input_name = model.input_name.clone();
        let output_name = model.output_name.clone();

        let outputs = model
            .session
            .run(ort::inputs![input_name.as_str() => input_tensor])?;

        Self::extract_value(&outputs, &output_name)
    }
}

/// Single-attempt model invocation with error wrapping
pub struct InferenceInvoker {
    model: Box<dyn Regressor>,
}

impl InferenceInvoker {
    pub fn new(model: Box<dyn Regressor>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Raw, unrounded prediction for an aligned vector
    pub fn predict(&self, aligned: &AlignedVector) -> Result<f64, PipelineError> {
        let features = aligned.values_f32();

        let value = self.model.predict(&features).map_err(|e| {
            error!(model = %self.model.name(), error = %e, "Model inference failed");
            PipelineError::Inference(format!("{:#}", e))
        })?;

        if !value.is_finite() {
            return Err(PipelineError::Inference(format!(
                "model returned non-finite value {}",
                value
            )));
        }

        debug!(model = %self.model.name(), features = features.len(), prediction = value, "Inference complete");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::SchemaAligner;
    use crate::encoder::EncodedVector;
    use crate::schema::SchemaRegistry;
    use std::collections::BTreeMap;

    struct Fixed(f64);

    impl Regressor for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&self, _features: &[f32]) -> Result<f64> {
            Ok(self.0)
        }
    }

    struct Broken;

    impl Regressor for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn predict(&self, _features: &[f32]) -> Result<f64> {
            anyhow::bail!("input shape mismatch")
        }
    }

    fn aligned() -> AlignedVector {
        let registry = SchemaRegistry::new(vec!["a".to_string()], BTreeMap::new()).unwrap();
        SchemaAligner::new().align(&EncodedVector::new(), &registry)
    }

    #[test]
    fn test_prediction_passes_through() {
        let invoker = InferenceInvoker::new(Box::new(Fixed(123.456)));
        assert_eq!(invoker.predict(&aligned()).unwrap(), 123.456);
        assert_eq!(invoker.model_name(), "fixed");
    }

    #[test]
    fn test_model_failure_becomes_inference_error() {
        let invoker = InferenceInvoker::new(Box::new(Broken));
        match invoker.predict(&aligned()) {
            Err(PipelineError::Inference(cause)) => assert!(cause.contains("input shape mismatch")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_output_rejected() {
        let invoker = InferenceInvoker::new(Box::new(Fixed(f64::NAN)));
        assert!(matches!(
            invoker.predict(&aligned()),
            Err(PipelineError::Inference(_))
        ));
    }
}
