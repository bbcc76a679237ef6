//! Performance metrics and statistics tracking for the claim worker.

use crate::types::verdict::Verdict;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept for percentile reporting
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Metrics collector for pipeline performance
pub struct PipelineMetrics {
    /// Claims that reached the graph store
    pub claims_processed: AtomicU64,
    /// Claims classified as fraud
    pub fraud_verdicts: AtomicU64,
    /// Claims that failed at any stage
    pub claims_failed: AtomicU64,
    /// Scaling columns left unscaled across all claims
    pub scaling_skips: AtomicU64,
    /// Failures by error kind
    failures_by_kind: RwLock<HashMap<&'static str, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            claims_processed: AtomicU64::new(0),
            fraud_verdicts: AtomicU64::new(0),
            claims_failed: AtomicU64::new(0),
            scaling_skips: AtomicU64::new(0),
            failures_by_kind: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a persisted verdict
    pub fn record_verdict(&self, processing_time: Duration, verdict: Verdict) {
        self.claims_processed.fetch_add(1, Ordering::Relaxed);
        if verdict == Verdict::Fraud {
            self.fraud_verdicts.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > MAX_LATENCY_SAMPLES {
                times.drain(0..MAX_LATENCY_SAMPLES / 2);
            }
        }
    }

    /// Record a failed claim
    pub fn record_failure(&self, kind: &'static str) {
        self.claims_failed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind).or_insert(0) += 1;
        }
    }

    /// Record scaling columns skipped for one claim
    pub fn record_scaling_skips(&self, skipped: usize) {
        if skipped > 0 {
            self.scaling_skips
                .fetch_add(skipped as u64, Ordering::Relaxed);
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Get current throughput (claims per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.claims_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Share of persisted verdicts that were fraud
    pub fn get_fraud_rate(&self) -> f64 {
        let processed = self.claims_processed.load(Ordering::Relaxed);
        if processed == 0 {
            return 0.0;
        }
        self.fraud_verdicts.load(Ordering::Relaxed) as f64 / processed as f64
    }

    /// Get failures by error kind
    pub fn get_failures_by_kind(&self) -> HashMap<&'static str, u64> {
        self.failures_by_kind
            .read()
            .map(|by_kind| by_kind.clone())
            .unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let processed = self.claims_processed.load(Ordering::Relaxed);
        let failed = self.claims_failed.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();

        info!(
            processed = processed,
            failed = failed,
            fraud_rate = format!("{:.1}%", self.get_fraud_rate() * 100.0),
            throughput = format!("{:.1} claims/s", self.get_throughput()),
            scaling_skips = self.scaling_skips.load(Ordering::Relaxed),
            "Claim worker summary"
        );
        info!(
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Processing time"
        );
        for (kind, count) in self.get_failures_by_kind() {
            info!(kind = kind, count = count, "Failures by kind");
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

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs: interval_secs.max(1),
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately
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

        metrics.record_verdict(Duration::from_micros(100), Verdict::Fraud);
        metrics.record_verdict(Duration::from_micros(300), Verdict::Legit);
        metrics.record_failure("persistence");
        metrics.record_failure("persistence");
        metrics.record_failure("malformed_message");

        assert_eq!(metrics.claims_processed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.claims_failed.load(Ordering::Relaxed), 3);
        assert!((metrics.get_fraud_rate() - 0.5).abs() < 1e-9);

        let by_kind = metrics.get_failures_by_kind();
        assert_eq!(by_kind.get("persistence"), Some(&2));
        assert_eq!(by_kind.get("malformed_message"), Some(&1));
    }

    #[test]
    fn test_processing_stats() {
        let metrics = PipelineMetrics::new();
        for us in [100, 200, 300, 400] {
            metrics.record_verdict(Duration::from_micros(us), Verdict::Legit);
        }

        let stats = metrics.get_processing_stats();

        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.max_us, 400);
    }

    #[test]
    fn test_scaling_skips() {
        let metrics = PipelineMetrics::new();
        metrics.record_scaling_skips(0);
        metrics.record_scaling_skips(2);
        assert_eq!(metrics.scaling_skips.load(Ordering::Relaxed), 2);
    }
}
