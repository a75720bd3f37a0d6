//! Configuration management for the irrigation inference service

use crate::normalizer::ValidationMode;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub validation: ValidationConfig,
    pub weather: WeatherConfig,
    pub policy: PolicyConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Frozen model artifacts loaded once at startup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// ONNX regressor
    pub model_path: PathBuf,
    /// Metadata descriptor with the ordered feature names
    pub metadata_path: PathBuf,
    /// Target-encoding artifact. When absent the one-hot scheme is used.
    pub encoder_path: Option<PathBuf>,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("artifacts/water_requirement_model.onnx"),
            metadata_path: PathBuf::from("artifacts/metadata.json"),
            encoder_path: None,
            onnx_threads: 1,
        }
    }
}

/// Input validation configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ValidationConfig {
    pub mode: ValidationMode,
}

/// Rainfall lookup configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub enabled: bool,
    /// Current-weather endpoint keyed by city name
    pub api_url: String,
    pub api_key: String,
    /// Upper bound on a single lookup, in milliseconds
    pub timeout_ms: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            api_key: String::new(),
            timeout_ms: 3000,
        }
    }
}

/// Post-inference business rule configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Crops exempt from the standing-water override
    pub water_tolerant_crops: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            water_tolerant_crops: vec!["Rice".to_string()],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, with `IRRIGATION__*` environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("IRRIGATION")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("policy.water_tolerant_crops")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.validation.mode, ValidationMode::Lenient);
        assert_eq!(config.policy.water_tolerant_crops, vec!["Rice".to_string()]);
        assert!(!config.weather.enabled);
        assert_eq!(config.weather.timeout_ms, 3000);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[validation]\nmode = \"strict\"\n\n[artifacts]\nmodel_path = \"m.onnx\"\nmetadata_path = \"meta.json\"\nonnx_threads = 2"
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.validation.mode, ValidationMode::Strict);
        assert_eq!(config.artifacts.model_path, PathBuf::from("m.onnx"));
        assert_eq!(config.artifacts.onnx_threads, 2);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.level, "info");
    }
}
