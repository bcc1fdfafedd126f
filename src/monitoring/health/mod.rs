//! Service health monitoring
//!
//! Each registered service is checked on its own timer by the check
//! strategy its descriptor names (HTTP, TCP, process or a registered
//! predicate). Outcomes are written through the registry; alerts fire
//! once per crossing of the consecutive-failure threshold.

mod checks;
mod monitor;
mod tasks;
mod types;

#[cfg(test)]
mod tests;

pub use checks::{
    CustomCheck, HealthCheck, HttpCheck, ProcessCheck, TcpCheck, check_with_timeout,
    classify_http,
};
pub use monitor::HealthMonitor;
pub use types::{HealthCounts, HealthReport, MonitorEvent, ServiceHealthSummary};
