//! Report log repository

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::models::{ReportQuery, StoredReport};

use super::ring::BoundedLog;

/// Repository for received performance reports
#[derive(Clone)]
pub struct ReportRepository {
    log: Arc<RwLock<BoundedLog<StoredReport>>>,
}

impl ReportRepository {
    /// Create a repository retaining at most `capacity` reports
    pub fn new(capacity: usize) -> Self {
        Self {
            log: Arc::new(RwLock::new(BoundedLog::new(capacity))),
        }
    }

    /// Append a report, returning the evicted report if the log was full
    pub fn insert(&self, report: StoredReport) -> Option<StoredReport> {
        let (seq, evicted) = self.log.write().push(report);
        if let Some(old) = &evicted {
            debug!(
                seq,
                evicted_url = %old.performance.url,
                "Report log full, evicted oldest report"
            );
        }
        evicted
    }

    /// Reports matching the filters.
    ///
    /// `url` is a substring match and `since` an inclusive lower bound on the
    /// client timestamp. `limit` keeps the last N matches in storage order;
    /// results are never re-sorted by time.
    pub fn query(&self, query: &ReportQuery, default_limit: usize) -> Vec<StoredReport> {
        let limit = query.limit.unwrap_or(default_limit);
        let log = self.log.read();

        let mut matched: Vec<&StoredReport> = log
            .iter()
            .rev()
            .filter(|r| {
                query
                    .url
                    .as_deref()
                    .map_or(true, |url| r.performance.url.contains(url))
            })
            .filter(|r| query.since.map_or(true, |since| r.performance.timestamp >= since))
            .take(limit)
            .collect();
        matched.reverse();

        matched.into_iter().cloned().collect()
    }

    /// Number of retained reports
    pub fn len(&self) -> usize {
        self.log.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.read().is_empty()
    }
}
