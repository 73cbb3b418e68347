//! Alert data models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::lenient;

/// Alert severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Threshold exceeded
    #[default]
    High,
    /// At or beyond the critical threshold
    Critical,
}

impl Severity {
    /// Wire name of the severity
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(Error::validation(format!("unknown severity: {other}"))),
        }
    }
}

/// Severity thresholds for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricThreshold {
    /// Values at or above this are "high"
    pub high: f64,
    /// Values at or above this are "critical"
    pub critical: f64,
}

impl MetricThreshold {
    /// Threshold table for the Core Web Vitals (ms, CLS unitless)
    pub fn web_vitals_defaults() -> BTreeMap<String, MetricThreshold> {
        [
            ("LCP", 4000.0, 6000.0),
            ("FID", 300.0, 500.0),
            ("CLS", 0.25, 0.5),
            ("TTFB", 600.0, 1000.0),
            ("INP", 500.0, 800.0),
        ]
        .into_iter()
        .map(|(name, high, critical)| (name.to_string(), MetricThreshold { high, critical }))
        .collect()
    }
}

/// Alert submitted by a client that detected a threshold breach locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalAlertInput {
    /// Alert type tag (e.g. "critical-performance")
    #[serde(rename = "type")]
    pub alert_type: String,

    /// Metric name
    pub metric: String,

    /// Observed value
    pub value: f64,

    /// Threshold the client compared against; numeric strings are accepted
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub threshold: Option<f64>,

    /// Page URL
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub url: String,

    /// Client timestamp (epoch milliseconds, fractions truncated)
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub timestamp: i64,

    /// Client-reported user agent
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub user_agent: String,
}

impl CriticalAlertInput {
    /// Validate a raw JSON payload and convert it into an alert input.
    ///
    /// `type` and `metric` must be non-empty strings and `value` a number.
    /// The remaining fields never fail validation.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let input: CriticalAlertInput = serde_json::from_value(value)
            .map_err(|e| Error::validation(format!("Invalid alert data structure: {e}")))?;

        if input.alert_type.is_empty() || input.metric.is_empty() {
            return Err(Error::validation(
                "Invalid alert data structure: type and metric are required",
            ));
        }

        Ok(input)
    }
}

/// A stored alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedAlert {
    /// Unique identifier
    pub id: String,

    #[serde(flatten)]
    pub input: CriticalAlertInput,

    /// When the server received the alert
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub server_timestamp: DateTime<Utc>,

    #[serde(rename = "clientIP")]
    pub client_ip: String,

    pub severity: Severity,

    /// Set once an operator has seen the alert
    pub acknowledged: bool,
}

/// Global statistics over the alert store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertStats {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub acknowledged: usize,
    /// Alerts received within the recent window (last hour by default)
    pub recent: usize,
    #[serde(rename = "byMetric")]
    pub by_metric: BTreeMap<String, usize>,
    /// Top URLs by alert count, highest first. On the wire this is a
    /// `{url: count}` object whose keys keep the ranking order.
    #[serde(rename = "byUrl", with = "url_counts")]
    pub by_url: Vec<UrlCount>,
}

/// Alert count for one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlCount {
    pub url: String,
    pub count: usize,
}

mod url_counts {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::UrlCount;

    pub fn serialize<S>(counts: &[UrlCount], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(counts.len()))?;
        for entry in counts {
            map.serialize_entry(&entry.url, &entry.count)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<UrlCount>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CountsVisitor;

        impl<'de> Visitor<'de> for CountsVisitor {
            type Value = Vec<UrlCount>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of URL to alert count")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut counts = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((url, count)) = access.next_entry()? {
                    counts.push(UrlCount { url, count });
                }
                Ok(counts)
            }
        }

        deserializer.deserialize_map(CountsVisitor)
    }
}
