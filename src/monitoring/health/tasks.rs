//! Background check scheduling
//!
//! Every service gets its own timer with a random initial delay inside one
//! interval, so checks against different backends never line up.

use super::monitor::HealthMonitor;
use crate::core::registry::RegistryEvent;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

impl HealthMonitor {
    /// Start per-service checks, the registry watcher and system sampling.
    /// Calling it again while running does nothing.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::AcqRel) {
            debug!("Health monitor already running");
            return;
        }
        info!(
            "Starting health monitor ({} services, every {}ms)",
            self.registry.len(),
            self.config.interval_ms
        );

        for id in self.registry.ids() {
            self.spawn_service_task(&id);
        }

        let watcher = self.spawn_registry_watcher();
        let sampler = self.spawn_system_sampler();
        self.background.lock().extend([watcher, sampler]);
    }

    /// Abort every task the monitor started
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        info!("Stopping health monitor");
        for handle in self.background.lock().drain(..) {
            handle.abort();
        }
        let ids: Vec<String> = self.tasks.iter().map(|entry| entry.key().clone()).collect();
        for id in ids {
            if let Some((_, handle)) = self.tasks.remove(&id) {
                handle.abort();
            }
        }
    }

    fn spawn_service_task(self: &Arc<Self>, service_id: &str) {
        if self.tasks.contains_key(service_id) {
            return;
        }
        let interval = Duration::from_millis(self.config.interval_ms);
        let jitter_ms = rand::thread_rng().gen_range(0..self.config.interval_ms.max(1));
        let jitter = Duration::from_millis(jitter_ms);
        let monitor = Arc::clone(self);
        let id = service_id.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(jitter).await;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !monitor.is_running() {
                    break;
                }
                if let Err(e) = monitor.perform_health_check(&id).await {
                    HealthMonitor::log_check_error(&id, &e);
                    if monitor.registry.get_service(&id).is_none() {
                        break;
                    }
                }
            }
            monitor.tasks.remove(&id);
        });
        self.tasks.insert(service_id.to_string(), handle);
        debug!(service = %service_id, "Health check scheduled after {:?}", jitter);
    }

    fn spawn_registry_watcher(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let mut events = self.registry.subscribe();
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(RegistryEvent::Registered { id }) => monitor.spawn_service_task(&id),
                    Ok(RegistryEvent::Deregistered { id }) => {
                        if let Some((_, handle)) = monitor.tasks.remove(&id) {
                            handle.abort();
                        }
                        monitor.forget(&id);
                    }
                    Ok(RegistryEvent::HealthChanged { .. }) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Registry watcher lagged by {} events", skipped);
                        for id in monitor.registry.ids() {
                            monitor.spawn_service_task(&id);
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn spawn_system_sampler(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let monitor = Arc::clone(self);
        let interval = Duration::from_millis(self.config.system_interval_ms.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !monitor.is_running() {
                    break;
                }
                monitor.check_system_resources();
            }
        })
    }
}
