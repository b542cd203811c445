//! Request and prediction statistics for the scoring service.

use crate::types::RiskLevel;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept for percentile estimates
const LATENCY_WINDOW: usize = 10_000;

/// Metrics collector shared by all request handlers
pub struct ServiceMetrics {
    /// Requests received on any endpoint
    pub requests_total: AtomicU64,
    /// Successful predictions
    pub predictions_total: AtomicU64,
    /// Predictions labelled "default"
    pub defaults_predicted: AtomicU64,
    /// Failed predictions
    pub errors_total: AtomicU64,
    by_risk_level: RwLock<BTreeMap<&'static str, u64>>,
    /// Prediction latencies in microseconds
    latencies: RwLock<Vec<u64>>,
    /// Probability histogram, ten buckets of width 0.1
    score_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            predictions_total: AtomicU64::new(0),
            defaults_predicted: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
            by_risk_level: RwLock::new(BTreeMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, latency: Duration, probability: f64, risk_level: RiskLevel, is_default: bool) {
        self.predictions_total.fetch_add(1, Ordering::Relaxed);
        if is_default {
            self.defaults_predicted.fetch_add(1, Ordering::Relaxed);
        }

        {
            let mut latencies = write(&self.latencies);
            latencies.push(latency.as_micros() as u64);
            if latencies.len() > LATENCY_WINDOW {
                latencies.drain(0..LATENCY_WINDOW / 2);
            }
        }

        let bucket = (probability.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        write(&self.score_buckets)[bucket] += 1;
        *write(&self.by_risk_level).entry(risk_level.as_str()).or_insert(0) += 1;
    }

    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn latency_stats(&self) -> LatencyStats {
        let mut sorted = read(&self.latencies).clone();
        if sorted.is_empty() {
            return LatencyStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let pick = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];
        LatencyStats {
            count: count as u64,
            mean_us: sorted.iter().sum::<u64>() / count as u64,
            p50_us: pick(0.5),
            p95_us: pick(0.95),
            p99_us: pick(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Predictions per second since startup
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions_total.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn score_distribution(&self) -> [u64; 10] {
        *read(&self.score_buckets)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            requests_total: self.requests_total.load(Ordering::Relaxed),
            predictions_total: self.predictions_total.load(Ordering::Relaxed),
            defaults_predicted: self.defaults_predicted.load(Ordering::Relaxed),
            errors_total: self.errors_total.load(Ordering::Relaxed),
            throughput: self.throughput(),
            latency: self.latency_stats(),
            predictions_by_risk_level: read(&self.by_risk_level)
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            probability_histogram: self.score_distribution(),
        }
    }

    /// Log a one-shot summary
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        let default_rate = if snapshot.predictions_total > 0 {
            snapshot.defaults_predicted as f64 / snapshot.predictions_total as f64 * 100.0
        } else {
            0.0
        };

        info!(
            requests = snapshot.requests_total,
            predictions = snapshot.predictions_total,
            errors = snapshot.errors_total,
            default_rate = format!("{:.1}%", default_rate),
            throughput = format!("{:.1} req/s", snapshot.throughput),
            p50_us = snapshot.latency.p50_us,
            p99_us = snapshot.latency.p99_us,
            "Service metrics"
        );
        info!(histogram = ?snapshot.probability_histogram, by_risk_level = ?snapshot.predictions_by_risk_level, "Probability distribution");
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency percentiles in microseconds
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Serializable view served on `GET /metrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub requests_total: u64,
    pub predictions_total: u64,
    pub defaults_predicted: u64,
    pub errors_total: u64,
    pub throughput: f64,
    pub latency: LatencyStats,
    pub predictions_by_risk_level: BTreeMap<String, u64>,
    pub probability_histogram: [u64; 10],
}

/// Periodic metrics summary logger
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Log a summary every interval; returns immediately when the interval is 0
    pub async fn start(self) {
        if self.interval_secs == 0 {
            return;
        }
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // the first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.log_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = ServiceMetrics::new();

        metrics.record_request();
        metrics.record_request();
        metrics.record_request();
        metrics.record_prediction(Duration::from_micros(100), 0.15, RiskLevel::Low, false);
        metrics.record_prediction(Duration::from_micros(300), 0.82, RiskLevel::High, true);
        metrics.record_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_total, 3);
        assert_eq!(snapshot.predictions_total, 2);
        assert_eq!(snapshot.defaults_predicted, 1);
        assert_eq!(snapshot.errors_total, 1);
        assert_eq!(snapshot.predictions_by_risk_level["high"], 1);
        assert_eq!(snapshot.latency.mean_us, 200);
        assert_eq!(snapshot.latency.max_us, 300);
    }

    #[test]
    fn test_score_buckets() {
        let metrics = ServiceMetrics::new();
        for p in [0.0, 0.05, 0.5, 0.99, 1.0] {
            metrics.record_prediction(Duration::from_micros(1), p, RiskLevel::Low, false);
        }
        let buckets = metrics.score_distribution();
        assert_eq!(buckets[0], 2);
        assert_eq!(buckets[5], 1);
        assert_eq!(buckets[9], 2);
    }

    #[test]
    fn test_empty_latency_stats() {
        assert_eq!(ServiceMetrics::new().latency_stats().count, 0);
    }
}
