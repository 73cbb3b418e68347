//! Report ingestion
//!
//! Stores incoming reports, flags critical samples and returns per-request
//! aggregates.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::models::{
    AggregatedMetrics, MetricSample, PerformanceReport, Rating, RequestOrigin, StoredReport,
};
use crate::registry::MetricsRegistry;
use crate::store::ReportRepository;

use super::aggregate::aggregate_metrics;

/// Outcome of ingesting one report
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Number of samples in the report
    pub received: usize,
    /// Number of critical samples
    pub critical: usize,
    /// Aggregates over this report's samples
    pub aggregated: AggregatedMetrics,
}

/// Accepts performance reports into the report log
#[derive(Clone)]
pub struct ReportIngestor {
    reports: ReportRepository,
    registry: MetricsRegistry,
    critical_metrics: BTreeSet<String>,
}

impl ReportIngestor {
    /// Create an ingestor writing into `reports`
    pub fn new(reports: ReportRepository, registry: MetricsRegistry, config: &IngestConfig) -> Self {
        Self {
            reports,
            registry,
            critical_metrics: config.critical_metrics.clone(),
        }
    }

    /// A sample is critical when rated poor and its metric is recognized
    pub fn is_critical(&self, sample: &MetricSample) -> bool {
        sample.rating == Rating::Poor && self.critical_metrics.contains(&sample.name)
    }

    /// Store a validated report and summarise it
    pub fn ingest(&self, report: PerformanceReport, origin: &RequestOrigin) -> IngestOutcome {
        let timer = self.registry.timer("perfwatch.ingest.duration", &[]);

        let critical: Vec<&MetricSample> =
            report.metrics.iter().filter(|m| self.is_critical(m)).collect();
        if !critical.is_empty() {
            let names: Vec<&str> = critical.iter().map(|m| m.name.as_str()).collect();
            warn!(
                url = %report.performance.url,
                metrics = ?names,
                "Critical performance metrics detected"
            );
        }
        let critical = critical.len();

        let aggregated = aggregate_metrics(&report.metrics);
        for sample in &report.metrics {
            self.registry
                .record("web_vitals", sample.value, &[("metric", sample.name.as_str())]);
        }

        let received = report.metrics.len();
        let url = report.performance.url.clone();
        let timestamp = report.performance.timestamp;

        let stored = StoredReport::new(report, origin, Utc::now());
        if self.reports.insert(stored).is_some() {
            self.registry.increment("perfwatch.reports.evicted", 1.0, &[]);
        }

        self.registry.increment("perfwatch.reports.received", 1.0, &[]);
        self.registry
            .increment("perfwatch.samples.received", received as f64, &[]);
        self.registry
            .increment("perfwatch.samples.critical", critical as f64, &[]);
        self.registry
            .gauge("perfwatch.reports.stored", self.reports.len() as f64, &[]);

        info!(
            url = %url,
            timestamp,
            metrics_count = received,
            critical_count = critical,
            "Performance metrics received"
        );

        timer.stop();

        IngestOutcome {
            received,
            critical,
            aggregated,
        }
    }
}
