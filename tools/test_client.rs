//! Test Request Client
//!
//! Generates sensor readings and posts them to the prediction endpoint for
//! manual and load testing.

use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Request body matching the service's inbound format
#[derive(Debug, Clone, Serialize)]
struct SensorReading {
    crop_planted: String,
    soil_type: String,
    soil_moisture: f64,
    temperature: f64,
    humidity: f64,
    water_level: f64,
    age_of_crop: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<String>,
}

/// Reading generator for testing
struct ReadingGenerator {
    rng: rand::rngs::ThreadRng,
}

impl ReadingGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// A dry field: the model's prediction is returned
    fn generate_dry(&mut self) -> SensorReading {
        SensorReading {
            crop_planted: self
                .random_choice(&["Rice", "Wheat", "Corn", "Sugarcane", "cotton"])
                .to_string(),
            soil_type: self
                .random_choice(&["Clay", "Red Soil", "black soil", "Loamy", "Sandy"])
                .to_string(),
            soil_moisture: self.rng.gen_range(5.0..60.0),
            temperature: self.rng.gen_range(15.0..42.0),
            humidity: self.rng.gen_range(20.0..95.0),
            water_level: 0.0,
            age_of_crop: self.rng.gen_range(1..150),
            city: None,
        }
    }

    /// Standing water: non-paddy crops should come back as 0.0
    fn generate_flooded(&mut self) -> SensorReading {
        let mut reading = self.generate_dry();
        reading.water_level = self.rng.gen_range(1.0..40.0);
        reading
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_client=info".parse()?),
        )
        .init();

    info!("Starting Test Request Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let url = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("http://localhost:5000/predict");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);
    let flooded_rate: f64 = args
        .get(3)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.3)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);
    let city = args.get(5).cloned();

    info!(
        url = %url,
        count,
        flooded_rate,
        delay_ms,
        city = ?city,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let mut generator = ReadingGenerator::new();
    let mut rng = rand::thread_rng();
    let mut succeeded = 0u64;
    let mut failed = 0u64;

    for i in 0..count {
        let mut reading = if rng.gen_bool(flooded_rate) {
            generator.generate_flooded()
        } else {
            generator.generate_dry()
        };
        reading.city = city.clone();

        match client.post(url).json(&reading).send().await {
            Ok(response) => {
                let status = response.status();
                let body: serde_json::Value = response.json().await.unwrap_or_default();
                if status.is_success() {
                    succeeded += 1;
                    info!(
                        crop = %reading.crop_planted,
                        water_level = reading.water_level,
                        water_required = %body["water_required"],
                        "Prediction {}/{}",
                        i + 1,
                        count
                    );
                } else {
                    failed += 1;
                    warn!(status = %status, body = %body, "Request rejected");
                }
            }
            Err(e) => {
                warn!(error = %e, "Service unreachable. Printing sample request instead.");
                info!("Sample request:\n{}", serde_json::to_string_pretty(&reading)?);
                return Ok(());
            }
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} requests ({} succeeded, {} failed)",
        count, succeeded, failed
    );

    Ok(())
}
