//! Alert classification and intake

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AlertingConfig;
use crate::error::{Error, Result};
use crate::models::{
    CriticalAlertInput, EnrichedAlert, MetricThreshold, RequestOrigin, Severity,
};
use crate::registry::MetricsRegistry;

use super::notifier::{truncate_user_agent, AlertNotifier};
use super::repository::AlertRepository;

/// Result of evaluating one alert
#[derive(Debug, Clone)]
pub struct AlertOutcome {
    /// The stored alert
    pub alert: EnrichedAlert,
    /// Alerts for the same metric and URL within the frequency window,
    /// including this one
    pub recent_count: usize,
}

/// Classifies incoming alerts, stores them and dispatches notifications
pub struct AlertEvaluator {
    /// Alert store
    alert_repo: AlertRepository,
    /// Registry for self-instrumentation
    registry: MetricsRegistry,
    /// Destination for critical alerts
    notifier: Arc<dyn AlertNotifier>,
    /// Per-metric thresholds
    thresholds: BTreeMap<String, MetricThreshold>,
    /// Sliding window for the frequency check
    frequency_window: Duration,
    /// Recent alerts allowed before warning
    frequency_limit: usize,
    /// Upper bound for one notification attempt
    notification_timeout: StdDuration,
}

impl AlertEvaluator {
    /// Create a new alert evaluator
    pub fn new(
        alert_repo: AlertRepository,
        registry: MetricsRegistry,
        notifier: Arc<dyn AlertNotifier>,
        config: &AlertingConfig,
    ) -> Result<Self> {
        let frequency_window = Duration::from_std(config.frequency_window)
            .map_err(|e| Error::config(format!("alerting.frequency_window: {e}")))?;

        Ok(Self {
            alert_repo,
            registry,
            notifier,
            thresholds: config.thresholds.clone(),
            frequency_window,
            frequency_limit: config.frequency_limit,
            notification_timeout: config.notifications.timeout,
        })
    }

    /// Thresholds for a metric. Exact names win; otherwise the lookup ignores
    /// ASCII case, since config sources may fold key case.
    pub fn threshold_for(&self, metric: &str) -> Option<&MetricThreshold> {
        self.thresholds.get(metric).or_else(|| {
            self.thresholds
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(metric))
                .map(|(_, threshold)| threshold)
        })
    }

    /// Severity for a value: critical at or above the critical threshold,
    /// high otherwise (including metrics without thresholds)
    pub fn classify(&self, metric: &str, value: f64) -> Severity {
        match self.threshold_for(metric) {
            Some(threshold) if value >= threshold.critical => Severity::Critical,
            _ => Severity::High,
        }
    }

    /// Store an alert, run the frequency check and notify if critical
    pub fn evaluate(&self, input: CriticalAlertInput, origin: &RequestOrigin) -> AlertOutcome {
        let now = Utc::now();
        let severity = self.classify(&input.metric, input.value);

        let alert = EnrichedAlert {
            id: format!("alert-{}-{}", now.timestamp_millis(), Uuid::new_v4().simple()),
            input,
            server_timestamp: now,
            client_ip: origin.client_ip.clone(),
            severity,
            acknowledged: false,
        };

        let outcome = self
            .alert_repo
            .insert(alert.clone(), now - self.frequency_window);
        if outcome.evicted.is_some() {
            self.registry.increment("perfwatch.alerts.evicted", 1.0, &[]);
        }
        self.registry
            .increment("perfwatch.alerts.received", 1.0, &[("severity", severity.as_str())]);
        self.registry
            .gauge("perfwatch.alerts.stored", self.alert_repo.len() as f64, &[]);

        if outcome.recent_count > self.frequency_limit {
            self.registry.increment("perfwatch.alerts.high_frequency", 1.0, &[]);
            warn!(
                metric = %alert.input.metric,
                url = %alert.input.url,
                recent_alerts = outcome.recent_count,
                "High frequency of alerts"
            );
        }

        if severity == Severity::Critical {
            self.dispatch_notification(alert.clone());
        }

        info!(
            alert_id = %alert.id,
            severity = severity.as_str(),
            metric = %alert.input.metric,
            value = alert.input.value,
            threshold = ?alert.input.threshold,
            url = %alert.input.url,
            user_agent = truncate_user_agent(&alert.input.user_agent),
            "Performance alert"
        );

        AlertOutcome {
            alert,
            recent_count: outcome.recent_count,
        }
    }

    /// Deliver in the background; failures are logged and never surface to
    /// the caller
    fn dispatch_notification(&self, alert: EnrichedAlert) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(alert_id = %alert.id, "No async runtime, skipping notification");
            return;
        };

        let notifier = Arc::clone(&self.notifier);
        let timeout = self.notification_timeout;
        runtime.spawn(async move {
            match tokio::time::timeout(timeout, notifier.notify(&alert)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(
                    alert_id = %alert.id,
                    channel = notifier.channel(),
                    error = %e,
                    "Failed to send critical notification"
                ),
                Err(_) => error!(
                    alert_id = %alert.id,
                    channel = notifier.channel(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Critical notification timed out"
                ),
            }
        });
    }
}
