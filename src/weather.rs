//! Rainfall lookup.
//!
//! Best-effort enrichment: every failure (network, timeout, bad status,
//! malformed body) degrades to 0.0 mm and is counted as a fallback. A body
//! without precipitation data is a dry reading, not a failure.

use crate::config::WeatherConfig;
use crate::metrics::PipelineMetrics;
use crate::normalizer::round_to;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Source of a rainfall figure for a location. Never fails.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Rainfall in mm, rounded to 1 decimal; 0.0 when unavailable
    async fn fetch_rainfall(&self, location: &str) -> f64;
}

/// Failures absorbed by [`OpenWeatherClient::fetch_rainfall`]
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("weather service returned status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Weather lookup disabled: always 0.0
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWeather;

#[async_trait]
impl WeatherSource for NoWeather {
    async fn fetch_rainfall(&self, _location: &str) -> f64 {
        0.0
    }
}

/// Current-weather client keyed by city name
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl OpenWeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            metrics: None,
        })
    }

    /// Count absorbed failures in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Single attempt, surfacing the failure reason
    pub async fn try_fetch(&self, location: &str) -> Result<f64, WeatherError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WeatherError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let json: Value =
            serde_json::from_str(&body).map_err(|e| WeatherError::Malformed(e.to_string()))?;

        extract_rainfall(&json)
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn fetch_rainfall(&self, location: &str) -> f64 {
        match self.try_fetch(location).await {
            Ok(rainfall) => {
                debug!(location, rainfall, "Rainfall fetched");
                rainfall
            }
            Err(e) => {
                warn!(location, error = %e, "Rainfall lookup failed, using 0.0");
                if let Some(metrics) = &self.metrics {
                    metrics.record_weather_fallback();
                }
                0.0
            }
        }
    }
}

/// Read `rain.1h` (falling back to `rain.3h`) from a current-weather body.
/// The service omits `rain` when it is dry.
pub fn extract_rainfall(body: &Value) -> Result<f64, WeatherError> {
    if !body.is_object() {
        return Err(WeatherError::Malformed("expected a JSON object".to_string()));
    }

    let Some(rain) = body
        .get("rain")
        .and_then(|r| r.get("1h").or_else(|| r.get("3h")))
    else {
        debug!("No precipitation reported");
        return Ok(0.0);
    };

    let mm = rain.as_f64().ok_or_else(|| {
        WeatherError::Malformed(format!("precipitation is not a number: {}", rain))
    })?;

    if !mm.is_finite() || mm < 0.0 {
        return Err(WeatherError::Malformed(format!(
            "precipitation out of range: {}",
            mm
        )));
    }

    Ok(round_to(mm, 1))
}
