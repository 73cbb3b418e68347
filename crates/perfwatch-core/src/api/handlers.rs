//! API handlers for the HTTP REST API

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alerting::AlertEvaluator;
use crate::collector::ReportIngestor;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{
    AcknowledgeQuery, AcknowledgeRequest, AcknowledgeResponse, AlertListResponse, AlertQuery,
    AlertResponse, CriticalAlertInput, IngestResponse, PerformanceReport, ReportListResponse,
    ReportQuery, RequestOrigin,
};
use crate::registry::{HistogramStats, MetricsRegistry};
use crate::stats;
use crate::store::Store;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ingestor: ReportIngestor,
    pub evaluator: Arc<AlertEvaluator>,
    pub store: Store,
    pub registry: MetricsRegistry,
    pub config: Arc<Config>,
}

/// Caller metadata from proxy and user-agent headers
pub fn request_origin(headers: &HeaderMap) -> RequestOrigin {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    let client_ip = header("x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header("x-real-ip"))
        .unwrap_or_else(|| "unknown".to_string());

    RequestOrigin {
        client_ip,
        user_agent: header("user-agent").unwrap_or_else(|| "unknown".to_string()),
    }
}

/// Parse a JSON body whatever its content type. `navigator.sendBeacon`
/// posts strings as `text/plain`, so the header is not checked.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| Error::validation(format!("Invalid JSON body: {e}")))
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Ingest a performance report
pub async fn ingest_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestResponse>> {
    let report = PerformanceReport::from_json(parse_body(&body)?)?;
    let outcome = state.ingestor.ingest(report, &request_origin(&headers));

    Ok(Json(IngestResponse {
        success: true,
        received: outcome.received,
        critical: outcome.critical,
        aggregated: outcome.aggregated,
    }))
}

/// List stored reports with stats over the returned set
pub async fn list_reports(
    State(state): State<AppState>,
    query: std::result::Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Json<ReportListResponse>> {
    let Query(query) = query?;
    debug!(?query, "Querying performance reports");

    let reports = state
        .store
        .reports
        .query(&query, state.config.ingest.default_query_limit);
    let stats = stats::performance_stats(&reports);

    Ok(Json(ReportListResponse {
        count: reports.len(),
        total: state.store.reports.len(),
        reports,
        stats,
    }))
}

/// Record a client-reported alert
pub async fn create_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AlertResponse>> {
    let input = CriticalAlertInput::from_json(parse_body(&body)?)?;
    let outcome = state.evaluator.evaluate(input, &request_origin(&headers));

    Ok(Json(AlertResponse {
        success: true,
        alert_id: outcome.alert.id,
        severity: outcome.alert.severity,
        recent_alerts_count: outcome.recent_count,
    }))
}

/// List alerts with stats over the whole store
pub async fn list_alerts(
    State(state): State<AppState>,
    query: std::result::Result<Query<AlertQuery>, QueryRejection>,
) -> Result<Json<AlertListResponse>> {
    let Query(query) = query?;
    debug!(?query, "Querying alerts");

    let alerting = &state.config.alerting;
    let recent_window = chrono::Duration::from_std(alerting.recent_window)
        .map_err(|e| Error::internal(format!("alerting.recent_window: {e}")))?;

    let alerts = state
        .store
        .alerts
        .query(&query, alerting.default_query_limit);
    let stats = state.store.alerts.stats(Utc::now(), recent_window);

    Ok(Json(AlertListResponse {
        count: alerts.len(),
        total: state.store.alerts.len(),
        alerts,
        stats,
    }))
}

/// Acknowledge an alert by id
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    query: std::result::Result<Query<AcknowledgeQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<AcknowledgeResponse>> {
    let Query(query) = query?;
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::validation("Alert ID required"))?;
    let request: AcknowledgeRequest = parse_body(&body)?;

    let alert = state.store.alerts.acknowledge(&id, request.acknowledged)?;
    debug!(alert_id = %id, acknowledged = alert.acknowledged, "Alert updated");

    Ok(Json(AcknowledgeResponse {
        success: true,
        alert,
    }))
}

/// Registry snapshot response
#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub counters: BTreeMap<String, f64>,
    pub gauges: BTreeMap<String, f64>,
    pub histograms: BTreeMap<String, HistogramStats>,
    pub flat: BTreeMap<String, f64>,
}

/// Snapshot of the metrics registry
pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    let snapshot = state.registry.snapshot();
    let flat = snapshot.flatten();

    Json(MetricsResponse {
        counters: snapshot.counters,
        gauges: snapshot.gauges,
        histograms: snapshot.histograms,
        flat,
    })
}

/// Clear every counter, gauge and histogram
pub async fn reset_metrics(State(state): State<AppState>) -> StatusCode {
    state.registry.reset();
    StatusCode::NO_CONTENT
}
