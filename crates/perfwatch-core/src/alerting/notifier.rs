//! Notification delivery for critical alerts

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use crate::config::NotificationConfig;
use crate::error::{Error, Result};
use crate::models::EnrichedAlert;

/// Longest user agent included in messages and logs
pub const USER_AGENT_PREVIEW_LEN: usize = 100;

/// Delivers critical alerts somewhere a human will see them
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Channel name used in logs
    fn channel(&self) -> &'static str;

    /// Deliver one alert
    async fn notify(&self, alert: &EnrichedAlert) -> Result<()>;
}

/// Build the notifier described by the configuration
pub fn from_config(config: &NotificationConfig) -> Result<Box<dyn AlertNotifier>> {
    match &config.webhook_url {
        Some(url) => Ok(Box::new(WebhookNotifier::new(url.clone(), config.timeout)?)),
        None => Ok(Box::new(LogNotifier)),
    }
}

/// Unit suffix for a metric value
pub fn metric_unit(metric: &str) -> &'static str {
    match metric {
        "LCP" | "FID" | "TTFB" | "INP" | "FCP" => "ms",
        _ => "",
    }
}

/// First `USER_AGENT_PREVIEW_LEN` characters of a user agent
pub fn truncate_user_agent(user_agent: &str) -> &str {
    match user_agent.char_indices().nth(USER_AGENT_PREVIEW_LEN) {
        Some((idx, _)) => &user_agent[..idx],
        None => user_agent,
    }
}

/// Human-readable text for a critical alert
pub fn format_critical_message(alert: &EnrichedAlert) -> String {
    let input = &alert.input;
    let unit = metric_unit(&input.metric);
    let threshold = input
        .threshold
        .map_or_else(|| "n/a".to_string(), |t| format!("{t}{unit}"));
    let time = DateTime::<Utc>::from_timestamp_millis(input.timestamp)
        .map_or_else(|| input.timestamp.to_string(), |t| t.to_rfc3339());

    format!(
        "🚨 CRITICAL Performance Alert\n\n\
         Metric: {}\n\
         Value: {}{unit}\n\
         Threshold: {threshold}\n\
         URL: {}\n\
         Time: {time}\n\
         User Agent: {}\n\n\
         Severity: {}",
        input.metric,
        input.value,
        input.url,
        truncate_user_agent(&input.user_agent),
        alert.severity.as_str().to_uppercase(),
    )
}

/// Writes critical alerts to the error log; used when no webhook is set
pub struct LogNotifier;

#[async_trait]
impl AlertNotifier for LogNotifier {
    fn channel(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, alert: &EnrichedAlert) -> Result<()> {
        error!(
            alert_id = %alert.id,
            message = %format_critical_message(alert),
            "CRITICAL PERFORMANCE ALERT"
        );
        Ok(())
    }
}

/// Posts critical alerts to a Slack-compatible incoming webhook
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    /// Create a notifier whose requests give up after `timeout`
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: String,
    username: &'a str,
    icon_emoji: &'a str,
}

#[async_trait]
impl AlertNotifier for WebhookNotifier {
    fn channel(&self) -> &'static str {
        "webhook"
    }

    async fn notify(&self, alert: &EnrichedAlert) -> Result<()> {
        let payload = WebhookPayload {
            text: format_critical_message(alert),
            username: "Performance Monitor",
            icon_emoji: ":warning:",
        };

        let response = self.client.post(&self.url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::internal(format!(
                "Webhook returned {status}: {body}"
            )));
        }

        info!(alert_id = %alert.id, "Webhook notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CriticalAlertInput, Severity};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn critical_alert(user_agent: &str) -> EnrichedAlert {
        EnrichedAlert {
            id: "alert-1".to_string(),
            input: CriticalAlertInput {
                alert_type: "critical-performance".to_string(),
                metric: "LCP".to_string(),
                value: 7200.0,
                threshold: Some(4000.0),
                url: "https://example.com/checkout".to_string(),
                timestamp: 1_700_000_000_000,
                user_agent: user_agent.to_string(),
            },
            server_timestamp: Utc::now(),
            client_ip: "unknown".to_string(),
            severity: Severity::Critical,
            acknowledged: false,
        }
    }

    #[test]
    fn test_metric_units() {
        assert_eq!(metric_unit("LCP"), "ms");
        assert_eq!(metric_unit("CLS"), "");
        assert_eq!(metric_unit("custom"), "");
    }

    #[test]
    fn test_truncate_user_agent() {
        let long = "a".repeat(250);
        assert_eq!(truncate_user_agent(&long).len(), USER_AGENT_PREVIEW_LEN);
        assert_eq!(truncate_user_agent("short"), "short");
    }

    #[test]
    fn test_message_contents() {
        let message = format_critical_message(&critical_alert("Mozilla/5.0"));
        assert!(message.contains("Metric: LCP"));
        assert!(message.contains("Value: 7200ms"));
        assert!(message.contains("Threshold: 4000ms"));
        assert!(message.contains("Time: 2023-11-14T22:13:20+00:00"));
        assert!(message.contains("Severity: CRITICAL"));
    }

    #[tokio::test]
    async fn test_webhook_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({"username": "Performance Monitor"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier =
            WebhookNotifier::new(format!("{}/hook", server.uri()), Duration::from_secs(2)).unwrap();
        notifier.notify(&critical_alert("ua")).await.unwrap();
    }

    #[tokio::test]
    async fn test_webhook_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri(), Duration::from_secs(2)).unwrap();
        assert!(notifier.notify(&critical_alert("ua")).await.is_err());
    }

    #[tokio::test]
    async fn test_from_config_without_webhook_logs() {
        let notifier = from_config(&NotificationConfig::default()).unwrap();
        assert_eq!(notifier.channel(), "log");
        notifier.notify(&critical_alert("ua")).await.unwrap();
    }
}
