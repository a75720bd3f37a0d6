//! Request metrics and statistics tracking for the inference service.

use crate::error::PipelineError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for pipeline performance
pub struct PipelineMetrics {
    /// Total requests seen
    pub requests: AtomicU64,
    /// Successful predictions
    pub predictions: AtomicU64,
    /// Predictions replaced by the override rule
    pub overrides: AtomicU64,
    /// Requests rejected by validation
    pub validation_failures: AtomicU64,
    /// Encoding or inference failures
    pub internal_failures: AtomicU64,
    /// Rainfall lookups performed
    pub weather_lookups: AtomicU64,
    /// Rainfall lookups that failed and fell back to 0.0
    pub weather_fallbacks: AtomicU64,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// How often each registry column had to be zero-filled
    synthesized_columns: RwLock<HashMap<String, u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            predictions: AtomicU64::new(0),
            overrides: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            internal_failures: AtomicU64::new(0),
            weather_lookups: AtomicU64::new(0),
            weather_fallbacks: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            synthesized_columns: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record a completed prediction
    pub fn record_prediction(&self, processing_time: Duration, overridden: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.predictions.fetch_add(1, Ordering::Relaxed);
        if overridden {
            self.overrides.fetch_add(1, Ordering::Relaxed);
        }
        self.record_time(processing_time);
    }

    /// Record a failed request
    pub fn record_failure(&self, processing_time: Duration, error: &PipelineError) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if error.is_validation() {
            self.validation_failures.fetch_add(1, Ordering::Relaxed);
        } else {
            self.internal_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.record_time(processing_time);
    }

    pub fn record_weather_lookup(&self) {
        self.weather_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_weather_fallback(&self) {
        self.weather_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record columns the aligner had to zero-fill
    pub fn record_synthesized(&self, columns: &[String]) {
        if columns.is_empty() {
            return;
        }
        if let Ok(mut counts) = self.synthesized_columns.write() {
            for column in columns {
                *counts.entry(column.clone()).or_insert(0) += 1;
            }
        }
    }

    fn record_time(&self, processing_time: Duration) {
        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted: Vec<u64> = match self.processing_times.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return ProcessingStats::default(),
        };
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Zero-fill counts per column; non-empty means the encoder and schema disagree
    pub fn get_synthesized_counts(&self) -> HashMap<String, u64> {
        self.synthesized_columns
            .read()
            .map(|counts| counts.clone())
            .unwrap_or_default()
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let requests = self.requests.load(Ordering::Relaxed);
        let predictions = self.predictions.load(Ordering::Relaxed);
        let overrides = self.overrides.load(Ordering::Relaxed);
        let override_rate = if predictions > 0 {
            (overrides as f64 / predictions as f64) * 100.0
        } else {
            0.0
        };
        let processing = self.get_processing_stats();

        info!(
            requests,
            predictions,
            overrides,
            override_rate = format!("{:.1}%", override_rate),
            validation_failures = self.validation_failures.load(Ordering::Relaxed),
            internal_failures = self.internal_failures.load(Ordering::Relaxed),
            weather_lookups = self.weather_lookups.load(Ordering::Relaxed),
            weather_fallbacks = self.weather_fallbacks.load(Ordering::Relaxed),
            throughput = format!("{:.2} req/s", self.get_throughput()),
            "Inference metrics summary"
        );
        info!(
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Processing time"
        );

        for (column, count) in self.get_synthesized_counts() {
            info!(column = %column, count, "Zero-filled feature column");
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
