//! Derived statistics over stored reports and alerts

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::collector::aggregate_metrics;
use crate::models::{
    AlertStats, EnrichedAlert, PerformanceStats, Severity, StoredReport, TimeRange, TopMetric,
    UrlCount,
};

/// Number of entries in the "top problematic metrics" ranking
pub const TOP_METRICS: usize = 10;

/// Number of URLs reported in alert stats
pub const TOP_URLS: usize = 10;

/// Aggregate every sample in `reports` and rank metrics by share of `poor`
/// ratings
pub fn performance_stats(reports: &[StoredReport]) -> PerformanceStats {
    if reports.is_empty() {
        return PerformanceStats::default();
    }

    let samples = reports.iter().flat_map(|r| r.metrics.iter());
    let total_metrics = reports.iter().map(|r| r.metrics.len()).sum();
    let aggregated = aggregate_metrics(samples);

    let time_range = TimeRange {
        start: reports
            .iter()
            .map(|r| r.performance.timestamp)
            .min()
            .unwrap_or_default(),
        end: reports
            .iter()
            .map(|r| r.performance.timestamp)
            .max()
            .unwrap_or_default(),
    };

    let mut top_metrics: Vec<TopMetric> = aggregated
        .iter()
        .map(|(name, agg)| TopMetric {
            name: name.clone(),
            average_value: agg.average,
            poor_percentage: agg.poor_percentage(),
            count: agg.count,
        })
        .collect();
    top_metrics.sort_by(|a, b| b.poor_percentage.total_cmp(&a.poor_percentage));
    top_metrics.truncate(TOP_METRICS);

    PerformanceStats {
        total_reports: reports.len(),
        total_metrics,
        time_range: Some(time_range),
        top_metrics,
        aggregated,
    }
}

/// Counts over a set of alerts; `recent_since` bounds the `recent` count
/// (exclusive)
pub fn alert_stats<'a, I>(alerts: I, recent_since: DateTime<Utc>) -> AlertStats
where
    I: IntoIterator<Item = &'a EnrichedAlert>,
{
    let mut stats = AlertStats::default();
    let mut url_counts: HashMap<&str, usize> = HashMap::new();

    for alert in alerts {
        stats.total += 1;
        match alert.severity {
            Severity::Critical => stats.critical += 1,
            Severity::High => stats.high += 1,
        }
        if alert.acknowledged {
            stats.acknowledged += 1;
        }
        if alert.server_timestamp > recent_since {
            stats.recent += 1;
        }
        *stats.by_metric.entry(alert.input.metric.clone()).or_insert(0) += 1;
        *url_counts.entry(alert.input.url.as_str()).or_insert(0) += 1;
    }

    let mut by_url: Vec<UrlCount> = url_counts
        .into_iter()
        .map(|(url, count)| UrlCount {
            url: url.to_string(),
            count,
        })
        .collect();
    // ties broken by URL so the ranking is deterministic
    by_url.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.url.cmp(&b.url)));
    by_url.truncate(TOP_URLS);
    stats.by_url = by_url;

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CriticalAlertInput, MetricSample, PerformanceData, Rating};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn sample(name: &str, value: f64, rating: Rating) -> MetricSample {
        MetricSample {
            name: name.to_string(),
            value,
            rating,
            delta: 0.0,
            id: String::new(),
            navigation_type: String::new(),
            entries: vec![],
        }
    }

    fn report(timestamp: i64, metrics: Vec<MetricSample>) -> StoredReport {
        StoredReport {
            performance: PerformanceData {
                timestamp,
                url: "/".to_string(),
                user_agent: String::new(),
                connection: None,
                navigation: None,
                memory: None,
                extra: Default::default(),
            },
            metrics,
            server_timestamp: Utc::now(),
            client_ip: "unknown".to_string(),
            server_user_agent: "unknown".to_string(),
        }
    }

    fn alert(metric: &str, url: &str, severity: Severity, at: DateTime<Utc>) -> EnrichedAlert {
        EnrichedAlert {
            id: format!("{metric}-{url}-{}", at.timestamp_nanos_opt().unwrap_or_default()),
            input: CriticalAlertInput {
                alert_type: "critical-performance".to_string(),
                metric: metric.to_string(),
                value: 1.0,
                threshold: None,
                url: url.to_string(),
                timestamp: 0,
                user_agent: String::new(),
            },
            server_timestamp: at,
            client_ip: "unknown".to_string(),
            severity,
            acknowledged: false,
        }
    }

    #[test]
    fn test_empty_reports() {
        let stats = performance_stats(&[]);
        assert_eq!(stats.total_reports, 0);
        assert_eq!(stats.time_range, None);
        assert!(stats.top_metrics.is_empty());
    }

    #[test]
    fn test_time_range_and_totals() {
        let reports = vec![
            report(300, vec![sample("LCP", 1000.0, Rating::Good)]),
            report(100, vec![sample("LCP", 3000.0, Rating::Poor), sample("CLS", 0.1, Rating::Good)]),
            report(200, vec![]),
        ];
        let stats = performance_stats(&reports);
        assert_eq!(stats.total_reports, 3);
        assert_eq!(stats.total_metrics, 3);
        assert_eq!(stats.time_range, Some(TimeRange { start: 100, end: 300 }));
        assert_eq!(stats.aggregated["LCP"].count, 2);
    }

    #[test]
    fn test_top_metrics_ranked_by_poor_share() {
        let reports = vec![report(
            1,
            vec![
                sample("CLS", 0.05, Rating::Good),
                sample("INP", 900.0, Rating::Poor),
                sample("LCP", 5000.0, Rating::Poor),
                sample("LCP", 1000.0, Rating::Good),
            ],
        )];
        let stats = performance_stats(&reports);
        let ranking: Vec<(&str, f64)> = stats
            .top_metrics
            .iter()
            .map(|m| (m.name.as_str(), m.poor_percentage))
            .collect();
        assert_eq!(ranking, vec![("INP", 100.0), ("LCP", 50.0), ("CLS", 0.0)]);
        assert!((stats.top_metrics[1].average_value - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_metrics_capped_at_ten() {
        let metrics = (0..15)
            .map(|i| sample(&format!("M{i:02}"), 1.0, Rating::Good))
            .collect();
        let stats = performance_stats(&[report(1, metrics)]);
        assert_eq!(stats.top_metrics.len(), TOP_METRICS);
    }

    #[test]
    fn test_alert_stats_counts() {
        let now = Utc::now();
        let mut acked = alert("CLS", "/b", Severity::High, now - Duration::hours(2));
        acked.acknowledged = true;
        let alerts = vec![
            alert("LCP", "/a", Severity::Critical, now),
            alert("LCP", "/a", Severity::High, now - Duration::minutes(10)),
            acked,
        ];

        let stats = alert_stats(&alerts, now - Duration::hours(1));
        assert_eq!(stats.total, 3);
        assert_eq!(stats.critical, 1);
        assert_eq!(stats.high, 2);
        assert_eq!(stats.acknowledged, 1);
        assert_eq!(stats.recent, 2);
        assert_eq!(stats.by_metric["LCP"], 2);
        assert_eq!(
            stats.by_url,
            vec![
                UrlCount { url: "/a".to_string(), count: 2 },
                UrlCount { url: "/b".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_alert_stats_top_ten_urls() {
        let now = Utc::now();
        let alerts: Vec<_> = (0..12)
            .flat_map(|i| {
                (0..=i).map(move |j| {
                    alert("LCP", &format!("/page{i}"), Severity::High, now - Duration::seconds(j))
                })
            })
            .collect();
        let stats = alert_stats(&alerts, now - Duration::hours(1));
        assert_eq!(stats.by_url.len(), TOP_URLS);
        assert_eq!(stats.by_url[0].url, "/page11");
        assert_eq!(stats.by_url[0].count, 12);
    }
}
