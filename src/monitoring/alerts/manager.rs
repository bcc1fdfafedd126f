//! Alert manager

use super::channels::{NotificationChannel, WebhookChannel};
use super::types::{Alert, AlertSeverity, AlertStats};
use crate::config::AlertingConfig;
use crate::monitoring::health::MonitorEvent;
use crate::utils::error::Result;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const HISTORY_LIMIT: usize = 1000;

#[derive(Debug, Default)]
struct AlertStorage {
    history: VecDeque<Alert>,
    stats: AlertStats,
}

/// Turns monitor events into logged, recorded and forwarded alerts
#[derive(Debug)]
pub struct AlertManager {
    storage: RwLock<AlertStorage>,
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl AlertManager {
    pub fn new(config: &AlertingConfig) -> Result<Self> {
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();
        if let Some(webhook_url) = &config.webhook_url {
            info!("Alert webhook configured");
            channels.push(Box::new(WebhookChannel::new(
                webhook_url.clone(),
                AlertSeverity::Info,
            )?));
        }
        Ok(Self::with_channels(channels))
    }

    pub fn with_channels(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self {
            storage: RwLock::new(AlertStorage::default()),
            channels,
        }
    }

    /// Record and forward the alert for `event`, if any
    pub async fn handle_event(&self, event: &MonitorEvent) -> Option<Alert> {
        let alert = Alert::from_event(event)?;
        self.send_alert(&alert).await;
        Some(alert)
    }

    /// Log, record and forward one alert. Delivery failures are counted,
    /// never returned.
    pub async fn send_alert(&self, alert: &Alert) {
        match alert.severity {
            AlertSeverity::Critical => error!(
                source = %alert.source,
                kind = %alert.kind,
                "{}: {}",
                alert.title,
                alert.description
            ),
            AlertSeverity::Warning => warn!(
                source = %alert.source,
                kind = %alert.kind,
                "{}: {}",
                alert.title,
                alert.description
            ),
            AlertSeverity::Info => {
                info!(source = %alert.source, kind = %alert.kind, "{}", alert.title)
            }
        }

        {
            let mut storage = self.storage.write();
            storage.stats.total_alerts += 1;
            *storage
                .stats
                .alerts_by_severity
                .entry(alert.severity.to_string())
                .or_insert(0) += 1;
            *storage
                .stats
                .alerts_by_kind
                .entry(alert.kind.clone())
                .or_insert(0) += 1;
            storage.stats.last_alert = Some(alert.timestamp);
            storage.history.push_back(alert.clone());
            if storage.history.len() > HISTORY_LIMIT {
                storage.history.pop_front();
            }
        }

        for channel in self.channels.iter().filter(|c| c.supports_severity(alert.severity)) {
            if let Err(e) = channel.send(alert).await {
                warn!("Failed to send alert via {}: {}", channel.name(), e);
                self.storage.write().stats.failed_notifications += 1;
            } else {
                debug!("Alert sent via {}", channel.name());
            }
        }
    }

    /// Consume monitor events until the sender is dropped
    pub fn spawn(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<MonitorEvent>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        manager.handle_event(&event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Alert manager lagged, {} monitor events skipped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn get_stats(&self) -> AlertStats {
        self.storage.read().stats.clone()
    }

    /// Most recent alerts first
    pub fn get_history(&self, limit: Option<usize>) -> Vec<Alert> {
        let storage = self.storage.read();
        storage
            .history
            .iter()
            .rev()
            .take(limit.unwrap_or(100))
            .cloned()
            .collect()
    }
}
