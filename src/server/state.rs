//! Application state shared across HTTP handlers

use crate::auth::AuthGate;
use crate::config::Config;
use crate::core::broadcast::{UpdateBroadcaster, bridge_from_config};
use crate::core::circuit_breaker::CircuitBreakerManager;
use crate::core::registry::ServiceRegistry;
use crate::core::router::RequestRouter;
use crate::core::tracker::RequestTracker;
use crate::monitoring::{AlertManager, HealthMonitor};
use crate::storage::StorageLayer;
use crate::utils::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Every long-lived component, constructed once at boot and passed by
/// reference. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: StorageLayer,
    pub auth: Arc<AuthGate>,
    pub registry: Arc<ServiceRegistry>,
    pub breakers: Arc<CircuitBreakerManager>,
    pub router: Arc<RequestRouter>,
    pub tracker: Arc<RequestTracker>,
    pub monitor: Arc<HealthMonitor>,
    pub alerts: Arc<AlertManager>,
    pub broadcaster: Arc<UpdateBroadcaster>,
}

impl AppState {
    /// Open the configured store and build every component on top of it.
    /// An unreachable store is fatal.
    pub async fn build(config: Config) -> Result<Self> {
        let storage = StorageLayer::new(&config.gateway.storage).await?;
        Self::with_storage(config, storage).await
    }

    /// Build every component on an already opened store
    pub async fn with_storage(config: Config, storage: StorageLayer) -> Result<Self> {
        let gateway = &config.gateway;

        let registry = Arc::new(ServiceRegistry::new(
            storage.clone(),
            gateway.discovery.clone(),
        ));
        if let Err(e) = registry.load_persisted().await {
            warn!("Could not restore persisted services: {}", e);
        }
        for registration in &gateway.services {
            registry.register_service(registration.clone()).await?;
        }

        let breakers = Arc::new(CircuitBreakerManager::new(gateway.circuit_breaker.clone()));
        let router = Arc::new(RequestRouter::new(
            &gateway.routes,
            Arc::clone(&breakers),
            Duration::from_millis(gateway.circuit_breaker.timeout_ms),
        )?);
        let tracker = Arc::new(RequestTracker::new(storage.clone()));
        let monitor = Arc::new(
            HealthMonitor::new(gateway.monitoring.clone(), Arc::clone(&registry))?
                .with_tracker(Arc::clone(&tracker)),
        );
        let alerts = Arc::new(AlertManager::new(&gateway.monitoring.alerting)?);
        let broadcaster = Arc::new(UpdateBroadcaster::new(bridge_from_config(&gateway.bridge)?));

        Ok(Self {
            auth: Arc::new(AuthGate::new(&gateway.auth)),
            config: Arc::new(config),
            storage,
            registry,
            breakers,
            router,
            tracker,
            monitor,
            alerts,
            broadcaster,
        })
    }

    /// Start alerting, health checks, the update relay and, when
    /// configured, startup discovery
    pub async fn start_background(&self) -> Result<Vec<JoinHandle<()>>> {
        let mut handles = vec![self.alerts.spawn(self.monitor.subscribe())];

        if self.config.gateway.discovery.on_startup {
            let registry = Arc::clone(&self.registry);
            handles.push(tokio::spawn(async move {
                let report = registry.discover_services().await;
                info!(
                    "Discovery registered {} services, {} failed",
                    report.registered.len(),
                    report.failed.len()
                );
            }));
        }

        self.monitor.start();

        let channel = &self.config.gateway.bridge.update_channel;
        handles.push(self.broadcaster.spawn_relay(&self.storage, channel).await?);
        Ok(handles)
    }

    /// Stop background checks
    pub fn shutdown(&self) {
        self.monitor.stop();
    }
}
