//! Inference pipeline and its process-wide context.
//!
//! raw JSON -> normalize -> (rainfall) -> encode -> align -> predict -> override

use crate::aligner::SchemaAligner;
use crate::config::AppConfig;
use crate::encoder::{select_encoder, CategoricalEncoder};
use crate::error::PipelineError;
use crate::metrics::PipelineMetrics;
use crate::models::inference::{InferenceInvoker, OnnxRegressor, Regressor};
use crate::normalizer::{InputNormalizer, ValidationMode};
use crate::policy::OverridePolicy;
use crate::schema::SchemaRegistry;
use crate::types::request::{CanonicalRecord, RawRequest};
use crate::weather::{OpenWeatherClient, WeatherSource};
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    /// The record the model consumed
    pub record: CanonicalRecord,
    /// Unrounded model output
    pub raw_prediction: f64,
    /// Final value, rounded to 2 decimals
    pub water_required: f64,
    pub overridden: bool,
    /// Registry columns zero-filled by the aligner
    pub synthesized: Vec<String>,
}

/// Read-only state loaded at startup and shared by every request
pub struct PipelineContext {
    registry: SchemaRegistry,
    normalizer: InputNormalizer,
    encoder: Box<dyn CategoricalEncoder>,
    aligner: SchemaAligner,
    invoker: InferenceInvoker,
    policy: OverridePolicy,
    weather: Option<Arc<dyn WeatherSource>>,
    metrics: Arc<PipelineMetrics>,
}

impl PipelineContext {
    /// Assemble a context with lenient validation, the default policy and no weather lookup
    pub fn new(
        registry: SchemaRegistry,
        encoder: Box<dyn CategoricalEncoder>,
        model: Box<dyn Regressor>,
    ) -> Self {
        Self {
            registry,
            normalizer: InputNormalizer::default(),
            encoder,
            aligner: SchemaAligner::new(),
            invoker: InferenceInvoker::new(model),
            policy: OverridePolicy::default(),
            weather: None,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    pub fn with_validation_mode(mut self, mode: ValidationMode) -> Self {
        self.normalizer = InputNormalizer::new(mode);
        self
    }

    pub fn with_policy(mut self, policy: OverridePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_weather(mut self, weather: Arc<dyn WeatherSource>) -> Self {
        self.weather = Some(weather);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Load every artifact named by the configuration. Any failure aborts startup.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let artifacts = &config.artifacts;

        let registry = SchemaRegistry::load(&artifacts.metadata_path)?;
        let encoder = select_encoder(&registry, artifacts.encoder_path.as_deref())?;
        let model = OnnxRegressor::load(&artifacts.model_path, artifacts.onnx_threads)?;

        let mut context = Self::new(registry, encoder, Box::new(model))
            .with_validation_mode(config.validation.mode)
            .with_policy(OverridePolicy::from_crops(
                &config.policy.water_tolerant_crops,
            ));

        if config.weather.enabled {
            let client =
                OpenWeatherClient::new(&config.weather)?.with_metrics(context.metrics.clone());
            context = context.with_weather(Arc::new(client));
        }

        info!(
            features = context.registry.len(),
            encoder = context.encoder.name(),
            model = %context.invoker.model_name(),
            validation = ?context.normalizer.mode(),
            weather = context.weather.is_some(),
            water_tolerant = ?context.policy.water_tolerant_crops().collect::<Vec<_>>(),
            "Pipeline context ready"
        );

        Ok(context)
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn encoder_name(&self) -> &'static str {
        self.encoder.name()
    }

    pub fn model_name(&self) -> &str {
        self.invoker.model_name()
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Run one request through the pipeline, recording metrics
    pub async fn run(&self, raw: RawRequest) -> Result<PredictionOutcome, PipelineError> {
        let start_time = Instant::now();
        let result = self.execute(raw).await;

        match &result {
            Ok(outcome) => self
                .metrics
                .record_prediction(start_time.elapsed(), outcome.overridden),
            Err(e) => self.metrics.record_failure(start_time.elapsed(), e),
        }

        result
    }

    async fn execute(&self, raw: RawRequest) -> Result<PredictionOutcome, PipelineError> {
        debug!(input = ?raw.as_map(), "Raw input data");

        let mut record = self.normalizer.normalize(&raw)?;

        if let (Some(weather), Some(city)) = (&self.weather, raw.city()) {
            self.metrics.record_weather_lookup();
            record.rainfall = Some(weather.fetch_rainfall(city).await);
        }
        debug!(record = ?record, "Formatted input");

        let encoded = self.encoder.encode(&record)?;
        debug!(
            encoder = self.encoder.name(),
            columns = encoded.len(),
            "Encoded features"
        );

        let aligned = self.aligner.align(&encoded, &self.registry);
        self.metrics.record_synthesized(aligned.synthesized());

        let raw_prediction = self.invoker.predict(&aligned)?;
        let outcome = self.policy.apply(&record, raw_prediction);

        Ok(PredictionOutcome {
            record,
            raw_prediction,
            water_required: outcome.water_required,
            overridden: outcome.overridden,
            synthesized: aligned.synthesized().to_vec(),
        })
    }
}
