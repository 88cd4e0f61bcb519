//! Scoring metrics and periodic summaries

use crate::types::prediction::RiskLevel;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the scoring pipeline
pub struct PipelineMetrics {
    /// Requests scored successfully
    pub predictions: AtomicU64,
    /// Requests rejected with an error
    pub rejections: AtomicU64,
    /// Rejections by error kind
    rejections_by_kind: RwLock<HashMap<&'static str, u64>>,
    /// Predictions by risk tier
    predictions_by_level: RwLock<HashMap<RiskLevel, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Churn probability histogram
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
            rejections_by_kind: RwLock::new(HashMap::new()),
            predictions_by_level: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, processing_time: Duration, probability: f64, level: RiskLevel) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        self.record_time(processing_time);

        let bucket = ((probability * 10.0) as usize).min(9);
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }

        if let Ok(mut by_level) = self.predictions_by_level.write() {
            *by_level.entry(level).or_insert(0) += 1;
        }
    }

    /// Record a rejected request
    pub fn record_rejection(&self, processing_time: Duration, kind: &'static str) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
        self.record_time(processing_time);

        if let Ok(mut by_kind) = self.rejections_by_kind.write() {
            *by_kind.entry(kind).or_insert(0) += 1;
        }
    }

    fn record_time(&self, processing_time: Duration) {
        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted = match self.processing_times.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return ProcessingStats::default(),
        };
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let handled =
            self.predictions.load(Ordering::Relaxed) + self.rejections.load(Ordering::Relaxed);
        if elapsed > 0.0 {
            handled as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|b| *b)
            .unwrap_or_default()
    }

    pub fn get_predictions_by_level(&self) -> HashMap<RiskLevel, u64> {
        self.predictions_by_level
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn get_rejections_by_kind(&self) -> HashMap<&'static str, u64> {
        self.rejections_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let scored = self.predictions.load(Ordering::Relaxed);
        let rejected = self.rejections.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();
        let by_level = self.get_predictions_by_level();

        info!(
            scored,
            rejected,
            throughput = format!("{:.1} req/s", self.get_throughput()),
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            "Scoring summary"
        );

        for level in [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low] {
            let count = by_level.get(&level).copied().unwrap_or(0);
            let pct = if scored > 0 {
                (count as f64 / scored as f64) * 100.0
            } else {
                0.0
            };
            info!(risk_level = level.as_str(), count, pct = format!("{:.1}%", pct), "Risk tier share");
        }

        for (kind, count) in self.get_rejections_by_kind() {
            info!(kind, count, "Rejections");
        }

        let distribution = self.get_probability_distribution();
        info!(buckets = ?distribution, "Churn probability distribution");
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

/// Periodically logs a metrics summary
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
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), 0.82, RiskLevel::High);
        metrics.record_prediction(Duration::from_micros(200), 0.1, RiskLevel::Low);
        metrics.record_rejection(Duration::from_micros(50), "invalid_field_value");

        assert_eq!(metrics.predictions.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.rejections.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_predictions_by_level()[&RiskLevel::High], 1);
        assert_eq!(metrics.get_rejections_by_kind()["invalid_field_value"], 1);

        let distribution = metrics.get_probability_distribution();
        assert_eq!(distribution[8], 1);
        assert_eq!(distribution[1], 1);
    }

    #[test]
    fn test_probability_one_lands_in_last_bucket() {
        let metrics = PipelineMetrics::new();
        metrics.record_prediction(Duration::from_micros(10), 1.0, RiskLevel::High);
        assert_eq!(metrics.get_probability_distribution()[9], 1);
    }

    #[test]
    fn test_processing_stats() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.get_processing_stats().count, 0);

        for us in [100, 200, 300, 400] {
            metrics.record_rejection(Duration::from_micros(us), "empty_input");
        }
        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.max_us, 400);
        assert_eq!(stats.p99_us, 400);
    }
}
