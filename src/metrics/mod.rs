//! Request counters for the CRM client engine.
//!
//! Counts attempts, failed attempts, retries and records returned. All
//! counters are atomics shared between clones, so one `Metrics` value can be
//! handed to every component that talks to the API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    attempts: AtomicU64,
    failed_attempts: AtomicU64,
    retries: AtomicU64,
    rate_limited: AtomicU64,
    duration_ms: AtomicU64,
    objects_fetched: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one HTTP attempt and how long it took.
    pub fn record_attempt(&self, duration: Duration) {
        self.inner.attempts.fetch_add(1, Ordering::Relaxed);
        self.inner
            .duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_failed_attempt(&self) {
        self.inner.failed_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.inner.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.inner.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_objects_fetched(&self, count: usize) {
        self.inner
            .objects_fetched
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn attempts_total(&self) -> u64 {
        self.inner.attempts.load(Ordering::Relaxed)
    }

    pub fn failed_attempts_total(&self) -> u64 {
        self.inner.failed_attempts.load(Ordering::Relaxed)
    }

    pub fn retries_total(&self) -> u64 {
        self.inner.retries.load(Ordering::Relaxed)
    }

    pub fn rate_limited_total(&self) -> u64 {
        self.inner.rate_limited.load(Ordering::Relaxed)
    }

    pub fn duration_total_ms(&self) -> u64 {
        self.inner.duration_ms.load(Ordering::Relaxed)
    }

    pub fn objects_fetched_total(&self) -> u64 {
        self.inner.objects_fetched.load(Ordering::Relaxed)
    }

    /// Average attempt duration in milliseconds.
    pub fn duration_avg_ms(&self) -> f64 {
        let count = self.attempts_total();
        if count == 0 {
            0.0
        } else {
            self.duration_total_ms() as f64 / count as f64
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            attempts_total: self.attempts_total(),
            failed_attempts_total: self.failed_attempts_total(),
            retries_total: self.retries_total(),
            rate_limited_total: self.rate_limited_total(),
            duration_total_ms: self.duration_total_ms(),
            duration_avg_ms: self.duration_avg_ms(),
            objects_fetched_total: self.objects_fetched_total(),
        }
    }
}

/// A snapshot of metrics values.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MetricsSummary {
    pub attempts_total: u64,
    pub failed_attempts_total: u64,
    pub retries_total: u64,
    pub rate_limited_total: u64,
    pub duration_total_ms: u64,
    pub duration_avg_ms: f64,
    pub objects_fetched_total: u64,
}

/// Times one HTTP attempt.
pub struct HttpTimer {
    start: Instant,
    metrics: Metrics,
}

impl HttpTimer {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    pub fn complete(self) {
        self.metrics.record_attempt(self.start.elapsed());
    }

    pub fn complete_with_error(self) {
        self.metrics.record_attempt(self.start.elapsed());
        self.metrics.record_failed_attempt();
    }
}
