//! Alerting
//!
//! Alerts are fire-and-log: every alert is logged and kept in a bounded
//! history, then optionally forwarded to notification channels.

mod channels;
mod manager;
mod types;


pub use channels::{NotificationChannel, WebhookChannel};
pub use manager::AlertManager;
pub use types::{Alert, AlertSeverity, AlertStats};
