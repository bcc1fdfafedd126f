//! Monitoring
//!
//! - **health**: per-service checks, aggregate status and monitor events
//! - **system**: host resource sampling
//! - **alerts**: alert recording and forwarding
//! - **export**: Prometheus, InfluxDB and JSON renderings of one snapshot

pub mod alerts;
pub mod export;
pub mod health;
pub mod system;

pub use alerts::{Alert, AlertManager, AlertSeverity};
pub use export::{ExportFormat, MetricsSnapshot};
pub use health::{HealthMonitor, HealthReport, MonitorEvent};
pub use system::{ResourceKind, SystemSample, SystemSampler};
