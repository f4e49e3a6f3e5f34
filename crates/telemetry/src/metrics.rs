//! In-process pipeline metrics.
//!
//! Counters are plain atomics read by the health endpoint and the consumer
//! reports; nothing is exported to an external system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Point-in-time value.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Latency histogram in milliseconds.
#[derive(Debug)]
pub struct Histogram {
    buckets: [AtomicU64; 9],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    /// Upper bounds; the last bucket also takes everything above it.
    const BOUNDS_MS: [u64; 9] = [1, 5, 10, 25, 50, 100, 250, 1000, 5000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BOUNDS_MS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BOUNDS_MS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.sum.load(Ordering::Relaxed) as f64 / n as f64,
        }
    }

    /// (upper bound, count) pairs.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BOUNDS_MS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, n)| (bound, n.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Pipeline metrics.
#[derive(Debug, Default)]
pub struct Metrics {
    // Producer side
    pub records_synthesized: Counter,
    pub records_published: Counter,
    pub publish_errors: Counter,
    pub publish_latency_ms: Histogram,
    pub tracked_sessions: Gauge,

    // Consumer side
    pub records_consumed: Counter,
    pub duplicates_discarded: Counter,
    pub records_persisted: Counter,
    pub malformed_payloads: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            records_synthesized: self.records_synthesized.get(),
            records_published: self.records_published.get(),
            publish_errors: self.publish_errors.get(),
            publish_latency_mean_ms: self.publish_latency_ms.mean(),
            tracked_sessions: self.tracked_sessions.get(),
            records_consumed: self.records_consumed.get(),
            duplicates_discarded: self.duplicates_discarded.get(),
            records_persisted: self.records_persisted.get(),
            malformed_payloads: self.malformed_payloads.get(),
        }
    }
}

/// Serializable view of [`Metrics`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub records_synthesized: u64,
    pub records_published: u64,
    pub publish_errors: u64,
    pub publish_latency_mean_ms: f64,
    pub tracked_sessions: u64,
    pub records_consumed: u64,
    pub duplicates_discarded: u64,
    pub records_persisted: u64,
    pub malformed_payloads: u64,
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

pub fn metrics() -> &'static Metrics {
    &METRICS
}
