//! Shared fixtures: artifact files on disk and stub collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use irrigation_inference::encoder::{select_encoder, CategoricalEncoder};
use irrigation_inference::weather::WeatherSource;
use irrigation_inference::{PipelineContext, Regressor, SchemaRegistry};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

pub const TARGET_FEATURES: [&str; 8] = [
    "Crop Name",
    "Soil Type",
    "Soil Moisture (%)",
    "Temp (°C)",
    "Humidity (%)",
    "Water Level (%)",
    "Crop Age (days)",
    "Dummy Feature",
];

/// Regressor returning a fixed value and remembering the last input
pub struct RecordingRegressor {
    value: f64,
    pub last_input: Arc<Mutex<Vec<f32>>>,
}

impl RecordingRegressor {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            last_input: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Regressor for RecordingRegressor {
    fn name(&self) -> &str {
        "recording"
    }

    fn predict(&self, features: &[f32]) -> anyhow::Result<f64> {
        *self.last_input.lock().unwrap() = features.to_vec();
        Ok(self.value)
    }
}

pub struct FailingRegressor;

impl Regressor for FailingRegressor {
    fn name(&self) -> &str {
        "failing"
    }

    fn predict(&self, _features: &[f32]) -> anyhow::Result<f64> {
        anyhow::bail!("Got invalid dimensions for input: expected 8, got 7")
    }
}

/// Weather source with a canned answer that counts calls
pub struct FixedWeather {
    pub rainfall: f64,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FixedWeather {
    pub fn new(rainfall: f64) -> Self {
        Self {
            rainfall,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl WeatherSource for FixedWeather {
    async fn fetch_rainfall(&self, location: &str) -> f64 {
        self.calls.lock().unwrap().push(location.to_string());
        self.rainfall
    }
}

pub fn write_json(value: &Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", value).unwrap();
    file
}

pub fn target_metadata() -> NamedTempFile {
    write_json(&json!({ "feature_names": TARGET_FEATURES }))
}

pub fn target_encoder_artifact() -> NamedTempFile {
    write_json(&json!({
        "columns": {
            "Crop Name": {
                "mapping": { "Rice": 850.0, "Wheat": 420.0, "Corn": 510.0 },
                "default": 600.0
            },
            "Soil Type": {
                "mapping": { "Clay": 640.0, "Red Soil": 580.0 },
                "default": 610.0
            }
        }
    }))
}

pub fn one_hot_metadata() -> NamedTempFile {
    write_json(&json!({
        "feature_names": [
            "Soil Moisture (%)",
            "Temp (°C)",
            "Humidity (%)",
            "Water Level (%)",
            "Crop Age (days)",
            "Rainfall (mm)",
            "Crop Name_Corn",
            "Crop Name_Rice",
            "Crop Name_Wheat",
            "Soil Type_Clay",
            "Soil Type_Red Soil"
        ],
        "categories": {
            "Crop Name": ["Corn", "Rice", "Wheat"],
            "Soil Type": ["Clay", "Red Soil"]
        }
    }))
}

/// Context using the target-encoding artifacts
pub fn target_context(model: Box<dyn Regressor>) -> PipelineContext {
    let metadata = target_metadata();
    let encoder = target_encoder_artifact();
    let registry = SchemaRegistry::load(metadata.path()).unwrap();
    let encoder: Box<dyn CategoricalEncoder> =
        select_encoder(&registry, Some(encoder.path())).unwrap();
    PipelineContext::new(registry, encoder, model)
}

/// Context using the one-hot vocabulary from metadata
pub fn one_hot_context(model: Box<dyn Regressor>) -> PipelineContext {
    let metadata = one_hot_metadata();
    let registry = SchemaRegistry::load(metadata.path()).unwrap();
    let encoder = select_encoder(&registry, None).unwrap();
    PipelineContext::new(registry, encoder, model)
}

pub fn scenario_input(crop: &str) -> Value {
    json!({
        "crop_planted": crop,
        "soil_type": "Clay",
        "soil_moisture": 40,
        "temperature": 28,
        "humidity": 60,
        "water_level": 10,
        "age_of_crop": 30
    })
}
