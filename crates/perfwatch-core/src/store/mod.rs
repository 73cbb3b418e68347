//! In-memory storage for perfwatch
//!
//! Reports and alerts are kept in fixed-capacity ring logs for the lifetime
//! of the process. Nothing is written to disk.

mod reports;
mod ring;

pub use reports::ReportRepository;
pub use ring::BoundedLog;

use crate::alerting::AlertRepository;
use crate::config::RetentionConfig;

/// Storage bundle shared by the ingestor, evaluator and API
#[derive(Clone)]
pub struct Store {
    /// Performance report log
    pub reports: ReportRepository,
    /// Alert store
    pub alerts: AlertRepository,
}

impl Store {
    /// Create empty stores sized by the retention configuration
    pub fn new(config: &RetentionConfig) -> Self {
        Self {
            reports: ReportRepository::new(config.max_reports),
            alerts: AlertRepository::new(config.max_alerts),
        }
    }
}
