//! Notification channels

use super::types::{Alert, AlertSeverity};
use crate::utils::error::{GatewayError, Result};
use std::time::Duration;

/// Destination alerts are forwarded to
#[async_trait::async_trait]
pub trait NotificationChannel: Send + Sync + std::fmt::Debug {
    async fn send(&self, alert: &Alert) -> Result<()>;

    fn name(&self) -> &str;

    /// Whether alerts of this severity go to the channel
    fn supports_severity(&self, severity: AlertSeverity) -> bool;
}

/// Slack-compatible incoming webhook
#[derive(Debug)]
pub struct WebhookChannel {
    client: reqwest::Client,
    webhook_url: String,
    min_severity: AlertSeverity,
}

impl WebhookChannel {
    pub fn new(webhook_url: String, min_severity: AlertSeverity) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            webhook_url,
            min_severity,
        })
    }
}

#[async_trait::async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let color = match alert.severity {
            AlertSeverity::Info => "#36a64f",
            AlertSeverity::Warning => "#ff9500",
            AlertSeverity::Critical => "#ff0000",
        };

        let payload = serde_json::json!({
            "text": alert.title,
            "attachments": [{
                "color": color,
                "title": alert.title,
                "text": alert.description,
                "fields": [
                    { "title": "Severity", "value": alert.severity.to_string(), "short": true },
                    { "title": "Source", "value": alert.source, "short": true },
                    { "title": "Type", "value": alert.kind, "short": true }
                ],
                "footer": "Gateway Monitoring",
                "ts": alert.timestamp.timestamp()
            }],
            "alert": alert,
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                GatewayError::Alert(format!("Failed to send webhook notification: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(GatewayError::Alert(format!(
                "Webhook returned status: {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }

    fn supports_severity(&self, severity: AlertSeverity) -> bool {
        severity >= self.min_severity
    }
}
