//! Configuration management for perfwatch

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::MetricThreshold;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "PERFWATCH";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Report ingestion configuration
    pub ingest: IngestConfig,

    /// Alerting configuration
    pub alerting: AlertingConfig,

    /// Retention limits for the in-memory logs
    pub retention: RetentionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from an optional file and `PERFWATCH__*` environment
    /// variables. Anything left unset falls back to the `Default` impls.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        let config: Config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.retention.max_reports == 0 || self.retention.max_alerts == 0 {
            return Err(Error::config("retention capacities must be non-zero"));
        }
        if self.alerting.frequency_window.is_zero() {
            return Err(Error::config("alerting.frequency_window must be non-zero"));
        }
        for (metric, threshold) in &self.alerting.thresholds {
            if threshold.high > threshold.critical {
                return Err(Error::config(format!(
                    "threshold for {metric}: high ({}) exceeds critical ({})",
                    threshold.high, threshold.critical
                )));
            }
        }
        Ok(())
    }

    /// Socket address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// HTTP API port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Report ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Metric names whose `poor` samples count as critical
    pub critical_metrics: BTreeSet<String>,
    /// Default `limit` for report queries
    pub default_query_limit: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            critical_metrics: ["LCP", "FID", "CLS", "TTFB", "INP"]
                .into_iter()
                .map(String::from)
                .collect(),
            default_query_limit: 100,
        }
    }
}

/// Alerting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Per-metric severity thresholds
    pub thresholds: BTreeMap<String, MetricThreshold>,
    /// Sliding window for the high-frequency check
    #[serde(with = "humantime_serde")]
    pub frequency_window: Duration,
    /// Alerts per metric and URL within the window before warning
    pub frequency_limit: usize,
    /// Window used for the `recent` count in alert stats
    #[serde(with = "humantime_serde")]
    pub recent_window: Duration,
    /// Default `limit` for alert queries
    pub default_query_limit: usize,
    /// Notification configuration for critical alerts
    pub notifications: NotificationConfig,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            thresholds: MetricThreshold::web_vitals_defaults(),
            frequency_window: Duration::from_secs(5 * 60),
            frequency_limit: 5,
            recent_window: Duration::from_secs(60 * 60),
            default_query_limit: 50,
            notifications: NotificationConfig::default(),
        }
    }
}

/// Critical alert notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Slack-compatible webhook URL; critical alerts are only logged when unset
    pub webhook_url: Option<String>,
    /// Upper bound for a single delivery attempt
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Retention limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Maximum number of stored performance reports
    pub max_reports: usize,
    /// Maximum number of stored alerts
    pub max_alerts: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_reports: 10_000,
            max_alerts: 10_000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
