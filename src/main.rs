//! Irrigation Inference Service - Main Entry Point
//!
//! Loads the frozen model artifacts once, then serves water requirement
//! predictions over HTTP.

use anyhow::Result;
use irrigation_inference::{
    config::{AppConfig, LoggingConfig},
    metrics::MetricsReporter,
    pipeline::PipelineContext,
    server,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    // RUST_LOG wins over the configured level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info")
            .add_directive(format!("irrigation_inference={}", logging.level).parse()?),
    };

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Irrigation Inference Service");
    info!(
        validation = ?config.validation.mode,
        weather_enabled = config.weather.enabled,
        "Configuration loaded successfully"
    );

    // Load model artifacts; any failure here aborts startup
    let context = Arc::new(PipelineContext::from_config(&config)?);
    info!(
        "Model expects {} features: {:?}",
        context.registry().len(),
        context.registry().features()
    );

    // Start metrics reporter (prints summary every 60 seconds)
    let metrics = context.metrics().clone();
    tokio::spawn(async move {
        MetricsReporter::new(metrics, 60).start().await;
    });

    server::serve(context.clone(), &config.server.host, config.server.port).await?;

    info!("Service shutting down...");
    context.metrics().print_summary();

    Ok(())
}
