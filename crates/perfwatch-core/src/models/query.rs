//! Query and response types shared between the API and store layers

use serde::{Deserialize, Serialize};

use super::alert::{AlertStats, EnrichedAlert, Severity};
use super::metrics::{AggregatedMetrics, PerformanceStats};
use super::report::StoredReport;

/// Filters for `GET /performance`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    /// Substring the report URL must contain
    pub url: Option<String>,
    /// Keep only the last `limit` matches, in storage order
    pub limit: Option<usize>,
    /// Inclusive lower bound on the client timestamp (epoch ms)
    pub since: Option<i64>,
}

/// Filters for `GET /performance/alerts`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertQuery {
    pub severity: Option<Severity>,
    pub acknowledged: Option<bool>,
    /// Maximum number of alerts, newest first
    pub limit: Option<usize>,
    /// Inclusive lower bound on the server timestamp (epoch ms)
    pub since: Option<i64>,
}

/// Query string of `PATCH /performance/alerts`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcknowledgeQuery {
    pub id: Option<String>,
}

/// Body of `PATCH /performance/alerts`
#[derive(Debug, Clone, Deserialize)]
pub struct AcknowledgeRequest {
    pub acknowledged: bool,
}

/// Response of `POST /performance`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub received: usize,
    pub critical: usize,
    pub aggregated: AggregatedMetrics,
}

/// Response of `GET /performance`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportListResponse {
    pub reports: Vec<StoredReport>,
    pub count: usize,
    pub total: usize,
    pub stats: PerformanceStats,
}

/// Response of `POST /performance/alerts`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    pub success: bool,
    pub alert_id: String,
    pub severity: Severity,
    pub recent_alerts_count: usize,
}

/// Response of `GET /performance/alerts`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertListResponse {
    pub alerts: Vec<EnrichedAlert>,
    pub count: usize,
    pub total: usize,
    pub stats: AlertStats,
}

/// Response of `PATCH /performance/alerts`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgeResponse {
    pub success: bool,
    pub alert: EnrichedAlert,
}
