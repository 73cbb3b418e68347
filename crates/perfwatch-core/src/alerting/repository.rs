//! Alert repository for storing and querying enriched alerts

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{AlertQuery, AlertStats, EnrichedAlert};
use crate::stats;
use crate::store::BoundedLog;

struct AlertLog {
    alerts: BoundedLog<EnrichedAlert>,
    /// alert id -> sequence number in `alerts`
    index: HashMap<String, u64>,
}

/// Repository for alerts
#[derive(Clone)]
pub struct AlertRepository {
    inner: Arc<RwLock<AlertLog>>,
}

/// Result of storing an alert
#[derive(Debug)]
pub struct InsertOutcome {
    /// Alerts for the same metric and URL received after the window start,
    /// including the one just stored
    pub recent_count: usize,
    /// Oldest alert dropped to make room, if the store was full
    pub evicted: Option<EnrichedAlert>,
}

impl AlertRepository {
    /// Create a repository retaining at most `capacity` alerts
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(AlertLog {
                alerts: BoundedLog::new(capacity),
                index: HashMap::new(),
            })),
        }
    }

    /// Store an alert and count its recent siblings in one step.
    ///
    /// An alert counts as recent when its server timestamp is strictly after
    /// `window_start`. The count includes the alert being inserted.
    pub fn insert(&self, alert: EnrichedAlert, window_start: DateTime<Utc>) -> InsertOutcome {
        let mut inner = self.inner.write();

        let id = alert.id.clone();
        let (seq, evicted) = inner.alerts.push(alert);
        if let Some(old) = &evicted {
            inner.index.remove(&old.id);
            debug!(evicted_id = %old.id, "Alert store full, evicted oldest alert");
        }
        inner.index.insert(id, seq);

        let Some(stored) = inner.alerts.get(seq) else {
            return InsertOutcome {
                recent_count: 0,
                evicted,
            };
        };
        let (metric, url) = (&stored.input.metric, &stored.input.url);
        let recent_count = inner
            .alerts
            .iter()
            .filter(|a| {
                &a.input.metric == metric
                    && &a.input.url == url
                    && a.server_timestamp > window_start
            })
            .count();

        InsertOutcome {
            recent_count,
            evicted,
        }
    }

    /// Get an alert by id
    pub fn get(&self, id: &str) -> Option<EnrichedAlert> {
        let inner = self.inner.read();
        let seq = *inner.index.get(id)?;
        inner.alerts.get(seq).cloned()
    }

    /// Alerts matching the filters, newest server timestamp first, at most
    /// `limit` (or `default_limit`) of them
    pub fn query(&self, query: &AlertQuery, default_limit: usize) -> Vec<EnrichedAlert> {
        let limit = query.limit.unwrap_or(default_limit);
        let inner = self.inner.read();

        let mut matched: Vec<&EnrichedAlert> = inner
            .alerts
            .iter()
            .filter(|a| query.severity.map_or(true, |s| a.severity == s))
            .filter(|a| query.acknowledged.map_or(true, |ack| a.acknowledged == ack))
            .filter(|a| {
                query
                    .since
                    .map_or(true, |since| a.server_timestamp.timestamp_millis() >= since)
            })
            .collect();

        // stable sort, so equal timestamps keep newest-inserted first
        matched.reverse();
        matched.sort_by(|a, b| b.server_timestamp.cmp(&a.server_timestamp));
        matched.truncate(limit);

        matched.into_iter().cloned().collect()
    }

    /// Statistics over every retained alert, ignoring query filters
    pub fn stats(&self, now: DateTime<Utc>, recent_window: chrono::Duration) -> AlertStats {
        let inner = self.inner.read();
        stats::alert_stats(inner.alerts.iter(), now - recent_window)
    }

    /// Set the acknowledged flag.
    ///
    /// Acknowledgment is one-way: an acknowledged alert cannot be reopened,
    /// and acknowledging twice is a no-op.
    pub fn acknowledge(&self, id: &str, acknowledged: bool) -> Result<EnrichedAlert> {
        let mut inner = self.inner.write();
        let seq = *inner
            .index
            .get(id)
            .ok_or_else(|| Error::not_found("Alert", id))?;
        let alert = inner
            .alerts
            .get_mut(seq)
            .ok_or_else(|| Error::not_found("Alert", id))?;

        if alert.acknowledged && !acknowledged {
            return Err(Error::validation(format!(
                "alert {id} is already acknowledged and cannot be reopened"
            )));
        }
        alert.acknowledged = acknowledged;

        Ok(alert.clone())
    }

    /// Number of retained alerts
    pub fn len(&self) -> usize {
        self.inner.read().alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().alerts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CriticalAlertInput, Severity};
    use chrono::Duration;

    fn alert(id: &str, metric: &str, url: &str, at: DateTime<Utc>, severity: Severity) -> EnrichedAlert {
        EnrichedAlert {
            id: id.to_string(),
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

    fn ids(alerts: &[EnrichedAlert]) -> Vec<&str> {
        alerts.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_recent_count_includes_new_alert() {
        let repo = AlertRepository::new(100);
        let now = Utc::now();
        let window_start = now - Duration::minutes(5);
        for i in 0..5 {
            let outcome = repo.insert(
                alert(&format!("a{i}"), "LCP", "/", now - Duration::seconds(i), Severity::High),
                window_start,
            );
            assert_eq!(outcome.recent_count, (i + 1) as usize);
        }
        let sixth = repo.insert(alert("a5", "LCP", "/", now, Severity::High), window_start);
        assert_eq!(sixth.recent_count, 6);
    }

    #[test]
    fn test_recent_count_scoped_to_metric_url_and_window() {
        let repo = AlertRepository::new(100);
        let now = Utc::now();
        let window_start = now - Duration::minutes(5);
        repo.insert(alert("old", "LCP", "/", now - Duration::minutes(6), Severity::High), window_start);
        repo.insert(alert("other-url", "LCP", "/x", now, Severity::High), window_start);
        repo.insert(alert("other-metric", "CLS", "/", now, Severity::High), window_start);
        let outcome = repo.insert(alert("new", "LCP", "/", now, Severity::High), window_start);
        assert_eq!(outcome.recent_count, 1);
    }

    #[test]
    fn test_query_sorted_newest_first_with_limit() {
        let repo = AlertRepository::new(100);
        let now = Utc::now();
        let start = now - Duration::hours(1);
        repo.insert(alert("mid", "LCP", "/", now - Duration::minutes(2), Severity::High), start);
        repo.insert(alert("newest", "LCP", "/", now, Severity::Critical), start);
        repo.insert(alert("oldest", "LCP", "/", now - Duration::minutes(9), Severity::High), start);

        let all = repo.query(&AlertQuery::default(), 50);
        assert_eq!(ids(&all), vec!["newest", "mid", "oldest"]);

        let limited = repo.query(
            &AlertQuery {
                limit: Some(1),
                ..Default::default()
            },
            50,
        );
        assert_eq!(ids(&limited), vec!["newest"]);
    }

    #[test]
    fn test_query_filters() {
        let repo = AlertRepository::new(100);
        let now = Utc::now();
        let start = now - Duration::hours(1);
        repo.insert(alert("c", "LCP", "/", now, Severity::Critical), start);
        repo.insert(alert("h", "LCP", "/", now - Duration::minutes(1), Severity::High), start);
        repo.acknowledge("h", true).unwrap();

        let critical = repo.query(
            &AlertQuery {
                severity: Some(Severity::Critical),
                ..Default::default()
            },
            50,
        );
        assert_eq!(ids(&critical), vec!["c"]);

        let acked = repo.query(
            &AlertQuery {
                acknowledged: Some(true),
                ..Default::default()
            },
            50,
        );
        assert_eq!(ids(&acked), vec!["h"]);

        let since = repo.query(
            &AlertQuery {
                since: Some(now.timestamp_millis()),
                ..Default::default()
            },
            50,
        );
        assert_eq!(ids(&since), vec!["c"]);
    }

    #[test]
    fn test_acknowledge_unknown_is_not_found() {
        let repo = AlertRepository::new(10);
        assert!(matches!(
            repo.acknowledge("missing", true),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_acknowledge_is_one_way() {
        let repo = AlertRepository::new(10);
        let now = Utc::now();
        repo.insert(alert("a", "LCP", "/", now, Severity::High), now);
        assert!(repo.acknowledge("a", true).unwrap().acknowledged);
        assert!(repo.acknowledge("a", true).unwrap().acknowledged);
        assert!(matches!(repo.acknowledge("a", false), Err(Error::Validation(_))));
        assert!(repo.get("a").unwrap().acknowledged);
    }

    #[test]
    fn test_eviction_drops_index_entry() {
        let repo = AlertRepository::new(2);
        let now = Utc::now();
        repo.insert(alert("first", "LCP", "/", now, Severity::High), now);
        repo.insert(alert("second", "LCP", "/", now, Severity::High), now);
        let outcome = repo.insert(alert("third", "LCP", "/", now, Severity::High), now);
        assert_eq!(outcome.evicted.map(|a| a.id), Some("first".to_string()));
        assert!(repo.get("first").is_none());
        assert!(matches!(repo.acknowledge("first", true), Err(Error::NotFound { .. })));
        assert!(repo.acknowledge("third", true).is_ok());
        assert_eq!(repo.len(), 2);
    }
}
