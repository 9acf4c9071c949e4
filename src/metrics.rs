//! Throughput and outcome statistics for the scoring service.

use crate::types::assessment::RiskBand;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

const MAX_SAMPLES: usize = 10_000;

/// Metrics collector for the scoring pipeline
pub struct ScoringMetrics {
    /// Applications received, scored or not
    pub applications_processed: AtomicU64,
    /// Assessments successfully produced
    pub assessments_produced: AtomicU64,
    /// Failures keyed by error code
    failures_by_code: RwLock<BTreeMap<String, u64>>,
    assessments_by_band: RwLock<BTreeMap<&'static str, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Probability of default, ten equal-width buckets
    probability_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl ScoringMetrics {
    pub fn new() -> Self {
        Self {
            applications_processed: AtomicU64::new(0),
            assessments_produced: AtomicU64::new(0),
            failures_by_code: RwLock::new(BTreeMap::new()),
            assessments_by_band: RwLock::new(BTreeMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successfully scored application
    pub fn record_assessment(&self, processing_time: Duration, probability: f64, band: RiskBand) {
        self.applications_processed.fetch_add(1, Ordering::Relaxed);
        self.assessments_produced.fetch_add(1, Ordering::Relaxed);
        self.record_time(processing_time);

        let bucket = ((probability * 10.0) as usize).min(9);
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }

        if let Ok(mut by_band) = self.assessments_by_band.write() {
            *by_band.entry(band.as_str()).or_insert(0) += 1;
        }
    }

    /// Record an application that could not be scored
    pub fn record_failure(&self, processing_time: Duration, code: &str) {
        self.applications_processed.fetch_add(1, Ordering::Relaxed);
        self.record_time(processing_time);

        if let Ok(mut by_code) = self.failures_by_code.write() {
            *by_code.entry(code.to_string()).or_insert(0) += 1;
        }
    }

    fn record_time(&self, processing_time: Duration) {
        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > MAX_SAMPLES {
                times.drain(0..MAX_SAMPLES / 2);
            }
        }
    }

    /// Get processing time statistics
    pub fn processing_stats(&self) -> ProcessingStats {
        let mut sorted = match self.processing_times.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return ProcessingStats::default(),
        };
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.50),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Applications per second since start
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.applications_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets.read().map(|b| *b).unwrap_or_default()
    }

    pub fn failures_by_code(&self) -> BTreeMap<String, u64> {
        self.failures_by_code.read().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn assessments_by_band(&self) -> BTreeMap<&'static str, u64> {
        self.assessments_by_band.read().map(|m| m.clone()).unwrap_or_default()
    }

    /// Log a summary of everything recorded so far
    pub fn print_summary(&self) {
        let processed = self.applications_processed.load(Ordering::Relaxed);
        let produced = self.assessments_produced.load(Ordering::Relaxed);
        let failed = processed.saturating_sub(produced);
        let processing = self.processing_stats();

        info!(
            processed = processed,
            assessed = produced,
            failed = failed,
            throughput = format!("{:.1} apps/s", self.throughput()),
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Scoring metrics summary"
        );

        for (band, count) in self.assessments_by_band() {
            let pct = if produced > 0 {
                (count as f64 / produced as f64) * 100.0
            } else {
                0.0
            };
            info!(
                risk_band = band,
                count = count,
                pct = format!("{:.1}%", pct),
                "Assessments by risk band"
            );
        }

        for (code, count) in self.failures_by_code() {
            info!(code = %code, count = count, "Failures by code");
        }

        let distribution = self.probability_distribution();
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            info!(
                "  p(default) {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                "█".repeat(((pct / 2.0) as usize).min(20))
            );
        }
    }
}

impl Default for ScoringMetrics {
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

/// Prints a metrics summary on a fixed interval
pub struct MetricsReporter {
    metrics: Arc<ScoringMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ScoringMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // the first tick completes immediately
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
        let metrics = ScoringMetrics::new();

        metrics.record_assessment(Duration::from_micros(100), 0.12, RiskBand::Low);
        metrics.record_assessment(Duration::from_micros(300), 0.75, RiskBand::High);
        metrics.record_failure(Duration::from_micros(50), "SCHEMA_VALIDATION_ERROR");

        assert_eq!(metrics.applications_processed.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.assessments_produced.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.failures_by_code()["SCHEMA_VALIDATION_ERROR"], 1);
        assert_eq!(metrics.assessments_by_band()["high"], 1);
    }

    #[test]
    fn test_probability_buckets() {
        let metrics = ScoringMetrics::new();
        metrics.record_assessment(Duration::from_micros(1), 0.0, RiskBand::Low);
        metrics.record_assessment(Duration::from_micros(1), 1.0, RiskBand::High);
        metrics.record_assessment(Duration::from_micros(1), 0.35, RiskBand::Medium);

        let distribution = metrics.probability_distribution();
        assert_eq!(distribution[0], 1);
        assert_eq!(distribution[3], 1);
        assert_eq!(distribution[9], 1);
    }

    #[test]
    fn test_processing_stats() {
        let metrics = ScoringMetrics::new();
        assert_eq!(metrics.processing_stats().count, 0);

        for us in [100, 200, 300, 400] {
            metrics.record_failure(Duration::from_micros(us), "PREDICTION_FAILED");
        }
        let stats = metrics.processing_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.max_us, 400);
    }
}
