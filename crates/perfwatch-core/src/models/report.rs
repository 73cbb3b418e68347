//! Performance report data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::lenient;

/// Rating attached to a sample by the reporting client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    /// Within the good budget
    Good,
    /// Between the good and poor budgets
    NeedsImprovement,
    /// Beyond the poor budget
    Poor,
}

impl Rating {
    /// Wire name of the rating
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Good => "good",
            Rating::NeedsImprovement => "needs-improvement",
            Rating::Poor => "poor",
        }
    }
}

/// A single rated metric sample (LCP, CLS, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    /// Metric name
    pub name: String,

    /// Measured value (milliseconds, or a unitless score for CLS)
    pub value: f64,

    /// Client-side rating
    pub rating: Rating,

    /// Change since the previous report of this metric
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub delta: f64,

    /// Client-generated sample id
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub id: String,

    /// Navigation type (navigate, reload, back-forward, ...)
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub navigation_type: String,

    /// Raw performance entries, stored as received
    #[serde(
        default,
        deserialize_with = "lenient::or_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub entries: Vec<Value>,
}

/// Network information reported by the browser; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    #[serde(
        default,
        deserialize_with = "lenient::or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub effective_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub downlink: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub rtt: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Navigation timing summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationInfo {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient::or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub nav_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub redirect_count: Option<f64>,
    /// Any further timing fields the client sends
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// JS heap usage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    #[serde(
        rename = "usedJSHeapSize",
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub used_js_heap_size: Option<f64>,
    #[serde(
        rename = "totalJSHeapSize",
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_js_heap_size: Option<f64>,
    #[serde(
        rename = "jsHeapSizeLimit",
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub js_heap_size_limit: Option<f64>,
}

/// Page context a batch of samples was collected in.
///
/// Only the `performance` object itself is required; unusable field values
/// fall back to defaults and unknown fields are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceData {
    /// Client timestamp (epoch milliseconds, fractions truncated)
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub timestamp: i64,

    /// Page URL
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub url: String,

    /// Client-reported user agent
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub user_agent: String,

    #[serde(
        default,
        deserialize_with = "lenient::or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub connection: Option<ConnectionInfo>,

    #[serde(
        default,
        deserialize_with = "lenient::or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub navigation: Option<NavigationInfo>,

    #[serde(
        default,
        deserialize_with = "lenient::or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub memory: Option<MemoryInfo>,

    /// Fields the client sends beyond the known ones
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /performance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub performance: PerformanceData,
    pub metrics: Vec<MetricSample>,
}

impl PerformanceReport {
    /// Validate a raw JSON payload and convert it into a report.
    ///
    /// The nested `performance` object and a `metrics` array are required.
    pub fn from_json(value: Value) -> Result<Self> {
        let Some(body) = value.as_object() else {
            return Err(Error::validation("Invalid performance data structure"));
        };

        if !body.get("performance").is_some_and(Value::is_object) {
            return Err(Error::validation(
                "Invalid performance data structure: missing performance object",
            ));
        }
        if !body.get("metrics").is_some_and(Value::is_array) {
            return Err(Error::validation(
                "Invalid performance data structure: metrics must be an array",
            ));
        }

        serde_json::from_value(value).map_err(|e| {
            Error::validation(format!("Invalid performance data structure: {e}"))
        })
    }
}

/// A report as kept in the report log, with server-side receipt metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReport {
    pub performance: PerformanceData,

    pub metrics: Vec<MetricSample>,

    /// When the server received the report
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub server_timestamp: DateTime<Utc>,

    /// Caller address (`x-forwarded-for`, `x-real-ip`, or "unknown")
    #[serde(rename = "clientIP")]
    pub client_ip: String,

    /// User agent seen on the HTTP request
    pub server_user_agent: String,
}

impl StoredReport {
    /// Attach receipt metadata to an incoming report
    pub fn new(report: PerformanceReport, origin: &RequestOrigin, received_at: DateTime<Utc>) -> Self {
        Self {
            performance: report.performance,
            metrics: report.metrics,
            server_timestamp: received_at,
            client_ip: origin.client_ip.clone(),
            server_user_agent: origin.user_agent.clone(),
        }
    }
}

/// Where a request came from, as far as the HTTP layer can tell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub client_ip: String,
    pub user_agent: String,
}

impl Default for RequestOrigin {
    fn default() -> Self {
        Self {
            client_ip: "unknown".to_string(),
            user_agent: "unknown".to_string(),
        }
    }
}
