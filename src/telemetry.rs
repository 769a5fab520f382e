//! Tagged metrics: counters, timers, and gauges.
//!
//! Every component records its outcomes through a shared [`MetricSink`]. The
//! same metric name with different tag sets is tracked as a distinct series.
//!
//! Semantics:
//! - Recording is side effect only and never fails the caller. A sink that
//!   cannot accept a record swallows it; telemetry must never break a business
//!   operation.
//! - Sinks are safe for concurrent use and are shared as `Arc<dyn MetricSink>`.
//!   No ambient global exists; the registry is injected everywhere, which lets
//!   tests observe exactly what a component recorded.
//!
//! Built-in sinks:
//! - [`MetricRegistry`]: in-memory, queryable. The default sink and the test
//!   fake in one.
//! - [`LogSink`]: forwards every record to `tracing`.
//! - [`NullSink`]: discards everything.
//! - [`FanoutSink`]: duplicates records into two sinks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

/// An ordered set of key-value dimensions attached to a metric.
///
/// Tags are kept sorted by key so that insertion order does not create
/// accidental extra series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tags(Vec<(String, String)>);

impl Tags {
    /// No dimensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-dimension tag set.
    pub fn with(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new().and(key, value)
    }

    /// Add a dimension, keeping keys sorted. A repeated key replaces the
    /// previous value.
    pub fn and(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.0.binary_search_by(|(k, _)| k.as_str().cmp(key.as_str())) {
            Ok(idx) => self.0[idx].1 = value,
            Err(idx) => self.0.insert(idx, (key, value)),
        }
        self
    }

    /// Look up a dimension value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| self.0[idx].1.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

/// A series identifier: metric name plus its tag dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub name: String,
    pub tags: Tags,
}

impl SeriesKey {
    fn new(name: &str, tags: &Tags) -> Self {
        Self { name: name.to_string(), tags: tags.clone() }
    }
}

/// Process-wide sink for counters, timers, and gauges.
///
/// Implementations must be concurrency-safe and must never propagate an error
/// to the caller.
pub trait MetricSink: Send + Sync {
    /// Add `n` to the counter series `(name, tags)`.
    fn increment_by(&self, name: &str, tags: &Tags, n: u64);

    /// Record one observed duration for the timer series `(name, tags)`.
    fn record_duration(&self, name: &str, tags: &Tags, duration: Duration);

    /// Set the gauge series `(name, tags)` to `value`.
    fn set_gauge(&self, name: &str, tags: &Tags, value: f64);

    /// Add one to the counter series `(name, tags)`.
    fn increment(&self, name: &str, tags: &Tags) {
        self.increment_by(name, tags, 1);
    }
}

#[derive(Debug, Default)]
struct TimerSeries {
    count: u64,
    total: Duration,
}

/// In-memory metric store, queryable per series.
///
/// Locks are per metric family; a poisoned lock is treated as losing that
/// family rather than failing the caller.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    counters: Mutex<HashMap<SeriesKey, u64>>,
    timers: Mutex<HashMap<SeriesKey, TimerSeries>>,
    gauges: Mutex<HashMap<SeriesKey, f64>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter series, zero if never written.
    pub fn counter_value(&self, name: &str, tags: &Tags) -> u64 {
        self.counters
            .lock()
            .map(|map| map.get(&SeriesKey::new(name, tags)).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of durations recorded against a timer series.
    pub fn timer_count(&self, name: &str, tags: &Tags) -> u64 {
        self.timers
            .lock()
            .map(|map| map.get(&SeriesKey::new(name, tags)).map(|t| t.count).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Sum of all durations recorded against a timer series.
    pub fn timer_total(&self, name: &str, tags: &Tags) -> Duration {
        self.timers
            .lock()
            .map(|map| map.get(&SeriesKey::new(name, tags)).map(|t| t.total).unwrap_or_default())
            .unwrap_or_default()
    }

    /// Last value written to a gauge series, if any.
    pub fn gauge_value(&self, name: &str, tags: &Tags) -> Option<f64> {
        self.gauges.lock().ok().and_then(|map| map.get(&SeriesKey::new(name, tags)).copied())
    }

    /// Snapshot of all counter series, sorted by name then tags.
    pub fn counter_snapshot(&self) -> Vec<(SeriesKey, u64)> {
        let mut entries: Vec<_> = self
            .counters
            .lock()
            .map(|map| map.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| {
            (a.0.name.as_str(), a.0.tags.to_string()).cmp(&(b.0.name.as_str(), b.0.tags.to_string()))
        });
        entries
    }

    /// Drop all recorded series.
    pub fn clear(&self) {
        if let Ok(mut map) = self.counters.lock() {
            map.clear();
        }
        if let Ok(mut map) = self.timers.lock() {
            map.clear();
        }
        if let Ok(mut map) = self.gauges.lock() {
            map.clear();
        }
    }
}

impl MetricSink for MetricRegistry {
    fn increment_by(&self, name: &str, tags: &Tags, n: u64) {
        if let Ok(mut map) = self.counters.lock() {
            let entry = map.entry(SeriesKey::new(name, tags)).or_insert(0);
            *entry = entry.saturating_add(n);
        }
    }

    fn record_duration(&self, name: &str, tags: &Tags, duration: Duration) {
        if let Ok(mut map) = self.timers.lock() {
            let entry = map.entry(SeriesKey::new(name, tags)).or_default();
            entry.count += 1;
            entry.total = entry.total.saturating_add(duration);
        }
    }

    fn set_gauge(&self, name: &str, tags: &Tags, value: f64) {
        if let Ok(mut map) = self.gauges.lock() {
            map.insert(SeriesKey::new(name, tags), value);
        }
    }
}

/// Forwards each record to `tracing` at DEBUG level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MetricSink for LogSink {
    fn increment_by(&self, name: &str, tags: &Tags, n: u64) {
        tracing::debug!(metric = name, tags = %tags, by = n, "counter");
    }

    fn record_duration(&self, name: &str, tags: &Tags, duration: Duration) {
        tracing::debug!(metric = name, tags = %tags, duration_ms = duration.as_millis() as u64, "timer");
    }

    fn set_gauge(&self, name: &str, tags: &Tags, value: f64) {
        tracing::debug!(metric = name, tags = %tags, value, "gauge");
    }
}

/// Discards all records. Useful when telemetry is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MetricSink for NullSink {
    fn increment_by(&self, _name: &str, _tags: &Tags, _n: u64) {}
    fn record_duration(&self, _name: &str, _tags: &Tags, _duration: Duration) {}
    fn set_gauge(&self, _name: &str, _tags: &Tags, _value: f64) {}
}

/// Duplicates every record into two sinks.
pub struct FanoutSink<A, B> {
    first: A,
    second: B,
}

impl<A: MetricSink, B: MetricSink> FanoutSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: MetricSink, B: MetricSink> MetricSink for FanoutSink<A, B> {
    fn increment_by(&self, name: &str, tags: &Tags, n: u64) {
        self.first.increment_by(name, tags, n);
        self.second.increment_by(name, tags, n);
    }

    fn record_duration(&self, name: &str, tags: &Tags, duration: Duration) {
        self.first.record_duration(name, tags, duration);
        self.second.record_duration(name, tags, duration);
    }

    fn set_gauge(&self, name: &str, tags: &Tags, value: f64) {
        self.first.set_gauge(name, tags, value);
        self.second.set_gauge(name, tags, value);
    }
}

impl<S: MetricSink + ?Sized> MetricSink for std::sync::Arc<S> {
    fn increment_by(&self, name: &str, tags: &Tags, n: u64) {
        (**self).increment_by(name, tags, n);
    }

    fn record_duration(&self, name: &str, tags: &Tags, duration: Duration) {
        (**self).record_duration(name, tags, duration);
    }

    fn set_gauge(&self, name: &str, tags: &Tags, value: f64) {
        (**self).set_gauge(name, tags, value);
    }
}
