//! Host resource sampling
//!
//! Samples come from `sysinfo` when the `metrics` feature is on; without it
//! every sample reads zero.

use crate::config::ThresholdConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[cfg(feature = "metrics")]
use sysinfo::{Disks, System};

/// Resource that can breach a threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Cpu,
    Memory,
    Disk,
    /// Share of proxied requests answered with a 5xx
    ErrorRate,
}

impl ResourceKind {
    /// Alert type tag
    pub fn alert_tag(&self) -> &'static str {
        match self {
            ResourceKind::Cpu => "high_cpu",
            ResourceKind::Memory => "high_memory",
            ResourceKind::Disk => "high_disk",
            ResourceKind::ErrorRate => "high_error_rate",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alert_tag())
    }
}

/// One resource sample, percentages in 0..=100
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub timestamp: DateTime<Utc>,
}

impl Default for SystemSample {
    fn default() -> Self {
        Self {
            cpu_percent: 0.0,
            memory_percent: 0.0,
            disk_percent: 0.0,
            memory_used_bytes: 0,
            memory_total_bytes: 0,
            timestamp: Utc::now(),
        }
    }
}

impl SystemSample {
    /// Resources at or above their threshold
    pub fn breaches(&self, thresholds: &ThresholdConfig) -> Vec<(ResourceKind, f64, f64)> {
        [
            (ResourceKind::Cpu, self.cpu_percent, thresholds.cpu),
            (ResourceKind::Memory, self.memory_percent, thresholds.memory),
            (ResourceKind::Disk, self.disk_percent, thresholds.disk),
        ]
        .into_iter()
        .filter(|(_, value, threshold)| value >= threshold)
        .collect()
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Reusable sysinfo handles
pub struct SystemSampler {
    #[cfg(feature = "metrics")]
    system: parking_lot::Mutex<System>,
    #[cfg(feature = "metrics")]
    disks: parking_lot::Mutex<Disks>,
}

impl fmt::Debug for SystemSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemSampler").finish_non_exhaustive()
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSampler {
    #[cfg(feature = "metrics")]
    pub fn new() -> Self {
        Self {
            system: parking_lot::Mutex::new(System::new()),
            disks: parking_lot::Mutex::new(Disks::new_with_refreshed_list()),
        }
    }

    #[cfg(not(feature = "metrics"))]
    pub fn new() -> Self {
        Self {}
    }

    /// Take a sample. CPU usage needs two refreshes to be meaningful, so
    /// the first sample after construction may read zero.
    #[cfg(feature = "metrics")]
    pub fn sample(&self) -> SystemSample {
        let (cpu_percent, memory_used_bytes, memory_total_bytes) = {
            let mut system = self.system.lock();
            system.refresh_cpu_usage();
            system.refresh_memory();
            (
                system.global_cpu_usage() as f64,
                system.used_memory(),
                system.total_memory(),
            )
        };

        let (disk_used, disk_total) = {
            let mut disks = self.disks.lock();
            disks.refresh_list();
            disks.iter().fold((0u64, 0u64), |(used, total), disk| {
                (
                    used + disk.total_space().saturating_sub(disk.available_space()),
                    total + disk.total_space(),
                )
            })
        };

        SystemSample {
            cpu_percent,
            memory_percent: percent(memory_used_bytes, memory_total_bytes),
            disk_percent: percent(disk_used, disk_total),
            memory_used_bytes,
            memory_total_bytes,
            timestamp: Utc::now(),
        }
    }

    #[cfg(not(feature = "metrics"))]
    pub fn sample(&self) -> SystemSample {
        SystemSample::default()
    }
}
