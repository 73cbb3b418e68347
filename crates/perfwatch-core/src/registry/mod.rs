//! In-process metric registry
//!
//! Holds named counters, gauges and histograms keyed by [`MetricKey`]. The
//! registry is an explicitly constructed, cheaply cloneable handle; clones
//! share the same underlying maps.

mod key;
mod percentile;

pub use key::MetricKey;
pub use percentile::{percentile, percentile_sorted};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Default)]
struct RegistryInner {
    counters: HashMap<MetricKey, f64>,
    gauges: HashMap<MetricKey, f64>,
    histograms: HashMap<MetricKey, Vec<f64>>,
}

/// Shared registry of counters, gauges and histograms
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl MetricsRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to a counter, creating it at zero first
    pub fn increment(&self, name: &str, amount: f64, tags: &[(&str, &str)]) {
        let key = MetricKey::new(name, tags);
        *self.inner.lock().counters.entry(key).or_insert(0.0) += amount;
    }

    /// Overwrite a gauge
    pub fn gauge(&self, name: &str, value: f64, tags: &[(&str, &str)]) {
        let key = MetricKey::new(name, tags);
        self.inner.lock().gauges.insert(key, value);
    }

    /// Append a value to a histogram
    pub fn record(&self, name: &str, value: f64, tags: &[(&str, &str)]) {
        self.record_key(&MetricKey::new(name, tags), value);
    }

    fn record_key(&self, key: &MetricKey, value: f64) {
        let mut inner = self.inner.lock();
        if let Some(values) = inner.histograms.get_mut(key) {
            values.push(value);
        } else {
            inner.histograms.insert(key.clone(), vec![value]);
        }
    }

    /// Start a timer that records elapsed milliseconds into a histogram
    pub fn timer(&self, name: &str, tags: &[(&str, &str)]) -> Timer {
        Timer {
            registry: self.clone(),
            key: MetricKey::new(name, tags),
            started: Instant::now(),
        }
    }

    /// Current value of a counter
    pub fn counter_value(&self, name: &str, tags: &[(&str, &str)]) -> Option<f64> {
        self.inner
            .lock()
            .counters
            .get(&MetricKey::new(name, tags))
            .copied()
    }

    /// Current value of a gauge
    pub fn gauge_value(&self, name: &str, tags: &[(&str, &str)]) -> Option<f64> {
        self.inner
            .lock()
            .gauges
            .get(&MetricKey::new(name, tags))
            .copied()
    }

    /// Point-in-time view of every metric.
    ///
    /// Histogram samples are copied under the lock and sorted afterwards, so
    /// concurrent `record` calls never wait on a sort.
    ///
    /// Keys are rendered with [`MetricKey`]'s `Display`, which does not escape
    /// `{`, `:` or `,` in names. Distinct keys that render alike are merged:
    /// counters add up, histogram samples are pooled, and for gauges the
    /// greatest key by `Ord` wins.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let (counters, gauges, histograms) = {
            let inner = self.inner.lock();
            let mut counters: BTreeMap<String, f64> = BTreeMap::new();
            for (key, value) in &inner.counters {
                *counters.entry(key.to_string()).or_insert(0.0) += value;
            }
            let mut gauge_keys: Vec<(&MetricKey, f64)> =
                inner.gauges.iter().map(|(k, v)| (k, *v)).collect();
            gauge_keys.sort_by(|a, b| a.0.cmp(b.0));
            let gauges: BTreeMap<String, f64> = gauge_keys
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();
            let mut histograms: BTreeMap<String, Vec<f64>> = BTreeMap::new();
            for (key, values) in inner.histograms.iter().filter(|(_, v)| !v.is_empty()) {
                histograms
                    .entry(key.to_string())
                    .or_default()
                    .extend_from_slice(values);
            }
            (counters, gauges, histograms)
        };

        let histograms = histograms
            .into_iter()
            .map(|(key, mut values)| {
                values.sort_by(f64::total_cmp);
                (key, HistogramStats::from_sorted(&values))
            })
            .collect();

        RegistrySnapshot {
            counters,
            gauges,
            histograms,
        }
    }

    /// Drop every counter, gauge and histogram
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.counters.clear();
        inner.gauges.clear();
        inner.histograms.clear();
    }
}

/// Running stopwatch bound to a histogram key
pub struct Timer {
    registry: MetricsRegistry,
    key: MetricKey,
    started: Instant,
}

impl Timer {
    /// Record the elapsed milliseconds and return them.
    ///
    /// Every call records again.
    pub fn stop(&self) -> f64 {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        self.registry.record_key(&self.key, elapsed_ms);
        elapsed_ms
    }
}

/// Derived statistics for a non-empty histogram
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramStats {
    pub count: usize,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    pub p99: f64,
}

impl HistogramStats {
    fn from_sorted(sorted: &[f64]) -> Self {
        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();
        Self {
            count,
            avg: if count == 0 { 0.0 } else { sum / count as f64 },
            min: sorted.first().copied().unwrap_or(0.0),
            max: sorted.last().copied().unwrap_or(0.0),
            p95: percentile_sorted(sorted, 0.95),
            p99: percentile_sorted(sorted, 0.99),
        }
    }
}

/// Everything in the registry at one instant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub counters: BTreeMap<String, f64>,
    pub gauges: BTreeMap<String, f64>,
    pub histograms: BTreeMap<String, HistogramStats>,
}

impl RegistrySnapshot {
    /// Single flat map: counters and gauges under their key, histogram stats
    /// under `key.count`, `key.avg`, `key.min`, `key.max`, `key.p95`, `key.p99`.
    /// A gauge shadows a counter with the same key.
    pub fn flatten(&self) -> BTreeMap<String, f64> {
        let mut flat = self.counters.clone();
        flat.extend(self.gauges.iter().map(|(k, v)| (k.clone(), *v)));
        for (key, stats) in &self.histograms {
            flat.insert(format!("{key}.count"), stats.count as f64);
            flat.insert(format!("{key}.avg"), stats.avg);
            flat.insert(format!("{key}.min"), stats.min);
            flat.insert(format!("{key}.max"), stats.max);
            flat.insert(format!("{key}.p95"), stats.p95);
            flat.insert(format!("{key}.p99"), stats.p99);
        }
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_increment_accumulates() {
        let registry = MetricsRegistry::new();
        registry.increment("x", 5.0, &[]);
        registry.increment("x", 3.0, &[]);
        assert_eq!(registry.counter_value("x", &[]), Some(8.0));
    }

    #[test]
    fn test_increment_fractional_and_tagged() {
        let registry = MetricsRegistry::new();
        registry.increment("bytes", 0.5, &[("b", "2"), ("a", "1")]);
        registry.increment("bytes", 0.25, &[("a", "1"), ("b", "2")]);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.counters.get("bytes{a:1,b:2}"), Some(&0.75));
    }

    #[test]
    fn test_gauge_last_write_wins() {
        let registry = MetricsRegistry::new();
        registry.gauge("queue", 10.0, &[]);
        registry.gauge("queue", 4.0, &[]);
        assert_eq!(registry.gauge_value("queue", &[]), Some(4.0));
    }

    #[test]
    fn test_histogram_snapshot_stats() {
        let registry = MetricsRegistry::new();
        for v in [40.0, 10.0, 30.0, 20.0] {
            registry.record("latency", v, &[]);
        }
        let stats = registry.snapshot().histograms["latency"];
        assert_eq!(
            stats,
            HistogramStats {
                count: 4,
                avg: 25.0,
                min: 10.0,
                max: 40.0,
                p95: 40.0,
                p99: 40.0,
            }
        );
    }

    #[test]
    fn test_snapshot_without_histograms() {
        let registry = MetricsRegistry::new();
        registry.increment("c", 1.0, &[]);
        let snapshot = registry.snapshot();
        assert!(snapshot.histograms.is_empty());
        assert!(!snapshot.flatten().keys().any(|k| k.ends_with(".count")));
    }

    #[test]
    fn test_timer_records_each_stop() {
        let registry = MetricsRegistry::new();
        let timer = registry.timer("op", &[("kind", "test")]);
        let first = timer.stop();
        timer.stop();
        assert!(first >= 0.0);
        let stats = registry.snapshot().histograms["op{kind:test}"];
        assert_eq!(stats.count, 2);
    }

    #[test]
    fn test_reset_clears_everything() {
        let registry = MetricsRegistry::new();
        registry.increment("c", 1.0, &[]);
        registry.gauge("g", 1.0, &[]);
        registry.record("h", 1.0, &[]);
        registry.reset();
        assert_eq!(registry.snapshot(), RegistrySnapshot::default());
    }

    #[test]
    fn test_flatten_layout() {
        let registry = MetricsRegistry::new();
        registry.increment("requests", 2.0, &[]);
        registry.gauge("memory", 512.0, &[]);
        registry.record("ttfb", 100.0, &[]);
        let flat = registry.snapshot().flatten();
        assert_eq!(flat["requests"], 2.0);
        assert_eq!(flat["memory"], 512.0);
        assert_eq!(flat["ttfb.count"], 1.0);
        assert_eq!(flat["ttfb.p99"], 100.0);
    }

    #[test]
    fn test_keys_rendering_alike_are_merged() {
        let registry = MetricsRegistry::new();
        registry.increment("a{b:c}", 1.0, &[]);
        registry.increment("a", 2.0, &[("b", "c")]);
        registry.record("a{b:c}", 10.0, &[]);
        registry.record("a", 30.0, &[("b", "c")]);
        registry.gauge("a{b:c}", 1.0, &[]);
        registry.gauge("a", 5.0, &[("b", "c")]);

        // Both sides stay separate in the registry itself
        assert_eq!(registry.counter_value("a{b:c}", &[]), Some(1.0));
        assert_eq!(registry.counter_value("a", &[("b", "c")]), Some(2.0));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.counters.len(), 1);
        assert_eq!(snapshot.counters["a{b:c}"], 3.0);
        assert_eq!(snapshot.histograms["a{b:c}"].count, 2);
        assert_eq!(snapshot.histograms["a{b:c}"].avg, 20.0);
        // "a{b:c}" sorts after "a" with tags, so the untagged gauge wins
        assert_eq!(snapshot.gauges["a{b:c}"], 1.0);
    }

    #[test]
    fn test_clones_share_state() {
        let registry = MetricsRegistry::new();
        let handle = registry.clone();
        handle.increment("shared", 1.0, &[]);
        assert_eq!(registry.counter_value("shared", &[]), Some(1.0));
    }

    #[test]
    fn test_concurrent_records() {
        let registry = MetricsRegistry::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        registry.record("h", f64::from(i), &[]);
                        registry.increment("c", 1.0, &[]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.histograms["h"].count, 800);
        assert_eq!(snapshot.counters["c"], 800.0);
    }
}
