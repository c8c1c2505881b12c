//! Metrics collection and reporting
//!
//! Tracks, without locks:
//! - Requests (total, successful, failed)
//! - Records per terminal outcome
//! - Batch rows processed
//! - Cumulative pipeline time
//!
//! Metrics are exposed in Prometheus text format.

use std::{
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use crate::pipeline::Outcome;

/// Central metrics collector
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    /// Total number of prediction requests
    total_requests: Arc<AtomicUsize>,
    /// Requests answered with 2xx
    successful_requests: Arc<AtomicUsize>,
    /// Requests answered with an error status
    failed_requests: Arc<AtomicUsize>,
    /// Records per outcome, indexed like [`Outcome::ALL`]
    outcomes: Arc<[AtomicUsize; 5]>,
    /// Rows submitted through batch uploads
    batch_rows: Arc<AtomicUsize>,
    /// Total pipeline time in microseconds
    total_inference_time_us: Arc<AtomicU64>,
    /// Start time for rate calculations
    start_time: Instant,
}

fn outcome_index(outcome: Outcome) -> usize {
    match outcome {
        Outcome::ValidationFailed => 0,
        Outcome::DerivationFailed => 1,
        Outcome::PredictFailed => 2,
        Outcome::DecodeFailed => 3,
        Outcome::Completed => 4,
    }
}

impl MetricsCollector {
    /// Create a new metrics collector
    #[must_use]
    pub fn new() -> Self {
        Self {
            total_requests: Arc::new(AtomicUsize::new(0)),
            successful_requests: Arc::new(AtomicUsize::new(0)),
            failed_requests: Arc::new(AtomicUsize::new(0)),
            outcomes: Arc::new(Default::default()),
            batch_rows: Arc::new(AtomicUsize::new(0)),
            total_inference_time_us: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Record a finished request and how long the pipeline took
    #[allow(clippy::cast_possible_truncation)]
    pub fn record_request(&self, success: bool, duration: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
        self.total_inference_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Record the terminal outcome of one record
    pub fn record_outcome(&self, outcome: Outcome) {
        self.outcomes[outcome_index(outcome)].fetch_add(1, Ordering::Relaxed);
    }

    /// Record rows submitted in a batch
    pub fn record_batch_rows(&self, rows: usize) {
        self.batch_rows.fetch_add(rows, Ordering::Relaxed);
    }

    /// Get current snapshot of metrics
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let successful = self.successful_requests.load(Ordering::Relaxed);
        let failed = self.failed_requests.load(Ordering::Relaxed);
        let total_time_us = self.total_inference_time_us.load(Ordering::Relaxed);
        let uptime = self.start_time.elapsed();

        MetricsSnapshot {
            total_requests,
            successful_requests: successful,
            failed_requests: failed,
            outcomes: Outcome::ALL.map(|o| (o, self.outcomes[outcome_index(o)].load(Ordering::Relaxed))),
            batch_rows: self.batch_rows.load(Ordering::Relaxed),
            total_inference_time_us: total_time_us,
            uptime_secs: uptime.as_secs(),
            requests_per_sec: if uptime.as_secs() > 0 {
                total_requests as f64 / uptime.as_secs_f64()
            } else {
                0.0
            },
            avg_latency_ms: if total_requests > 0 {
                (total_time_us as f64 / 1000.0) / total_requests as f64
            } else {
                0.0
            },
            error_rate: if total_requests > 0 {
                failed as f64 / total_requests as f64
            } else {
                0.0
            },
        }
    }

    /// Export metrics in Prometheus format
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let outcomes: String = snapshot
            .outcomes
            .iter()
            .map(|(outcome, count)| format!("prever_records_total{{outcome=\"{outcome}\"}} {count}\n"))
            .collect();
        format!(
            "# HELP prever_requests_total Total number of prediction requests\n\
             # TYPE prever_requests_total counter\n\
             prever_requests_total {}\n\
             # HELP prever_requests_successful Successful requests\n\
             # TYPE prever_requests_successful counter\n\
             prever_requests_successful {}\n\
             # HELP prever_requests_failed Failed requests\n\
             # TYPE prever_requests_failed counter\n\
             prever_requests_failed {}\n\
             # HELP prever_records_total Records by terminal outcome\n\
             # TYPE prever_records_total counter\n\
             {}\
             # HELP prever_batch_rows_total Rows submitted in batch uploads\n\
             # TYPE prever_batch_rows_total counter\n\
             prever_batch_rows_total {}\n\
             # HELP prever_inference_time_seconds Total pipeline time\n\
             # TYPE prever_inference_time_seconds counter\n\
             prever_inference_time_seconds {:.6}\n\
             # HELP prever_requests_per_second Request rate\n\
             # TYPE prever_requests_per_second gauge\n\
             prever_requests_per_second {:.2}\n\
             # HELP prever_avg_latency_ms Average latency in milliseconds\n\
             # TYPE prever_avg_latency_ms gauge\n\
             prever_avg_latency_ms {:.2}\n\
             # HELP prever_error_rate Error rate (0.0-1.0)\n\
             # TYPE prever_error_rate gauge\n\
             prever_error_rate {:.4}\n\
             # HELP prever_uptime_seconds Uptime in seconds\n\
             # TYPE prever_uptime_seconds counter\n\
             prever_uptime_seconds {}\n",
            snapshot.total_requests,
            snapshot.successful_requests,
            snapshot.failed_requests,
            outcomes,
            snapshot.batch_rows,
            snapshot.total_inference_time_us as f64 / 1_000_000.0,
            snapshot.requests_per_sec,
            snapshot.avg_latency_ms,
            snapshot.error_rate,
            snapshot.uptime_secs
        )
    }

    /// Reset all metrics (useful for testing)
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.successful_requests.store(0, Ordering::Relaxed);
        self.failed_requests.store(0, Ordering::Relaxed);
        self.outcomes.iter().for_each(|c| c.store(0, Ordering::Relaxed));
        self.batch_rows.store(0, Ordering::Relaxed);
        self.total_inference_time_us.store(0, Ordering::Relaxed);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Total number of requests processed
    pub total_requests: usize,
    /// Number of successful requests
    pub successful_requests: usize,
    /// Number of failed requests
    pub failed_requests: usize,
    /// Records per terminal outcome
    pub outcomes: [(Outcome, usize); 5],
    /// Rows submitted in batch uploads
    pub batch_rows: usize,
    /// Total pipeline time in microseconds
    pub total_inference_time_us: u64,
    /// System uptime in seconds
    pub uptime_secs: u64,
    /// Request rate (requests per second)
    pub requests_per_sec: f64,
    /// Average request latency in milliseconds
    pub avg_latency_ms: f64,
    /// Error rate as a fraction (0.0 to 1.0)
    pub error_rate: f64,
}

impl MetricsSnapshot {
    /// Records that ended in `outcome`
    #[must_use]
    pub fn outcome(&self, outcome: Outcome) -> usize {
        self.outcomes[outcome_index(outcome)].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_collector_creation() {
        let snapshot = MetricsCollector::new().snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.batch_rows, 0);
        assert_eq!(snapshot.outcome(Outcome::Completed), 0);
    }

    #[test]
    fn test_record_requests_and_outcomes() {
        let metrics = MetricsCollector::new();
        metrics.record_request(true, Duration::from_millis(100));
        metrics.record_outcome(Outcome::Completed);
        metrics.record_request(false, Duration::from_millis(200));
        metrics.record_outcome(Outcome::ValidationFailed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.outcome(Outcome::ValidationFailed), 1);
        assert_eq!(snapshot.error_rate, 0.5);
        // Average of 100ms and 200ms
        assert!((snapshot.avg_latency_ms - 150.0).abs() < 1.0);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = MetricsCollector::new();
        metrics.record_request(true, Duration::from_millis(10));
        metrics.record_outcome(Outcome::Completed);
        metrics.record_outcome(Outcome::DerivationFailed);
        metrics.record_batch_rows(2);

        let prom = metrics.to_prometheus();
        assert!(prom.contains("prever_requests_total 1"));
        assert!(prom.contains("prever_records_total{outcome=\"completed\"} 1"));
        assert!(prom.contains("prever_records_total{outcome=\"derivation_failed\"} 1"));
        assert!(prom.contains("prever_records_total{outcome=\"decode_failed\"} 0"));
        assert!(prom.contains("prever_batch_rows_total 2"));
        assert!(prom.contains("prever_error_rate 0.0000"));
    }

    #[test]
    fn test_reset_metrics() {
        let metrics = MetricsCollector::new();
        metrics.record_request(false, Duration::from_millis(1));
        metrics.record_outcome(Outcome::PredictFailed);
        metrics.reset();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.outcome(Outcome::PredictFailed), 0);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = MetricsCollector::new();
        let metrics_clone = metrics.clone();

        let handle = thread::spawn(move || {
            for _ in 0..100 {
                metrics_clone.record_request(true, Duration::from_micros(100));
            }
        });

        for _ in 0..100 {
            metrics.record_request(true, Duration::from_micros(100));
        }

        handle.join().expect("test");
        assert_eq!(metrics.snapshot().total_requests, 200);
    }

    #[test]
    fn test_zero_division_safety() {
        let snapshot = MetricsCollector::new().snapshot();
        assert_eq!(snapshot.requests_per_sec, 0.0);
        assert_eq!(snapshot.avg_latency_ms, 0.0);
        assert_eq!(snapshot.error_rate, 0.0);
    }
}
