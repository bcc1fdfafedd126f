//! Service registry

use super::topology::{dependency_graph, topological_order};
use super::types::{
    CheckRecord, DependencyNode, HealthCheckResult, HealthStatus, RegistryEvent,
    ServiceDescriptor, ServiceRegistration, ServiceStatus,
};
use crate::config::DiscoveryConfig;
use crate::storage::StorageLayer;
use crate::utils::error::{GatewayError, Result};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 1024;

/// Key prefix of persisted descriptors
pub const SERVICE_KEY_PREFIX: &str = "service:";

/// Owns every service descriptor. The map lock is never held across an
/// await. Store writes for one id are serialized by its write gate and
/// always carry the descriptor as it is when the gate is taken, so a
/// deregistration is never undone by a write that started before it.
#[derive(Debug)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, ServiceDescriptor>>,
    write_gates: DashMap<String, Arc<Mutex<()>>>,
    events: broadcast::Sender<RegistryEvent>,
    storage: StorageLayer,
    pub(super) discovery: DiscoveryConfig,
    pub(super) http: reqwest::Client,
}

impl ServiceRegistry {
    pub fn new(storage: StorageLayer, discovery: DiscoveryConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            services: RwLock::new(HashMap::new()),
            write_gates: DashMap::new(),
            events,
            storage,
            discovery,
            http: reqwest::Client::new(),
        }
    }

    /// Receive registry events
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: RegistryEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Insert or refresh a service. Runtime state and metrics survive
    /// re-registration.
    pub async fn register_service(
        &self,
        registration: ServiceRegistration,
    ) -> Result<ServiceDescriptor> {
        self.insert(registration, false).await
    }

    /// Insert a service, discarding any accumulated runtime state
    pub async fn register_service_overwrite(
        &self,
        registration: ServiceRegistration,
    ) -> Result<ServiceDescriptor> {
        self.insert(registration, true).await
    }

    async fn insert(
        &self,
        registration: ServiceRegistration,
        overwrite: bool,
    ) -> Result<ServiceDescriptor> {
        if registration.id.trim().is_empty() {
            return Err(GatewayError::validation("Service id cannot be empty"));
        }
        url::Url::parse(&registration.endpoint).map_err(|e| {
            GatewayError::validation(format!("Invalid endpoint for {}: {}", registration.id, e))
        })?;

        let id = registration.id.clone();
        let descriptor = {
            let mut services = self.services.write();
            match services.get_mut(&id) {
                Some(existing) if !overwrite => {
                    existing.refresh(registration);
                    existing.clone()
                }
                _ => {
                    let descriptor = ServiceDescriptor::from_registration(registration);
                    services.insert(id.clone(), descriptor.clone());
                    descriptor
                }
            }
        };

        self.persist(&id).await;
        info!(service = %id, endpoint = %descriptor.endpoint, "Service registered");
        self.emit(RegistryEvent::Registered { id });
        Ok(descriptor)
    }

    /// Remove a service; `false` when it was not registered
    pub async fn deregister_service(&self, id: &str) -> bool {
        let removed = self.services.write().remove(id).is_some();
        if !removed {
            debug!("Deregister of unknown service {}", id);
            return false;
        }

        {
            let gate = self.write_gate(id);
            let _guard = gate.lock().await;
            if let Err(e) = self.storage.store().delete(&service_key(id)).await {
                warn!("Failed to remove persisted service {}: {}", id, e);
            }
        }
        info!(service = %id, "Service deregistered");
        self.emit(RegistryEvent::Deregistered { id: id.to_string() });
        true
    }

    /// Set the health of a service. Unknown ids are ignored. The change
    /// event fires only when the value differs from the previous one.
    pub async fn update_service_health(
        &self,
        id: &str,
        health: HealthStatus,
        details: Option<String>,
    ) -> bool {
        let previous = {
            let mut services = self.services.write();
            let Some(service) = services.get_mut(id) else {
                return false;
            };
            let previous = service.health;
            service.health = health;
            service.last_check = Some(Utc::now());
            apply_status_hint(service);
            previous
        };

        self.persist(id).await;
        self.emit_health_change(id, previous, health, details);
        true
    }

    /// Fold one check outcome into a service's metrics, failure counter and
    /// health. `None` when the service is unknown.
    pub async fn record_check(&self, id: &str, result: &HealthCheckResult) -> Option<CheckRecord> {
        let record = {
            let mut services = self.services.write();
            let service = services.get_mut(id)?;
            let reachable = result.status.is_reachable();

            service.metrics.record(reachable, result.response_time_ms);
            service.consecutive_failures = if reachable {
                0
            } else {
                service.consecutive_failures.saturating_add(1)
            };
            let previous = service.health;
            service.health = result.status;
            service.last_check = Some(result.timestamp);
            apply_status_hint(service);

            CheckRecord {
                previous,
                current: service.health,
                consecutive_failures: service.consecutive_failures,
            }
        };

        self.persist(id).await;
        self.emit_health_change(id, record.previous, record.current, result.error.clone());
        Some(record)
    }

    /// Flag a service as draining
    pub async fn mark_shutting_down(&self, id: &str) -> bool {
        {
            let mut services = self.services.write();
            let Some(service) = services.get_mut(id) else {
                return false;
            };
            service.status = ServiceStatus::ShuttingDown;
        }
        self.persist(id).await;
        true
    }

    fn emit_health_change(
        &self,
        id: &str,
        old: HealthStatus,
        new: HealthStatus,
        details: Option<String>,
    ) {
        if old == new {
            return;
        }
        info!(service = %id, "Health changed {} -> {}", old, new);
        self.emit(RegistryEvent::HealthChanged {
            id: id.to_string(),
            old,
            new,
            details,
        });
    }

    pub fn get_service(&self, id: &str) -> Option<ServiceDescriptor> {
        self.services.read().get(id).cloned()
    }

    /// Every service, sorted by id
    pub fn get_all_services(&self) -> Vec<ServiceDescriptor> {
        let mut services: Vec<_> = self.services.read().values().cloned().collect();
        services.sort_by(|a, b| a.id.cmp(&b.id));
        services
    }

    pub fn get_services_by_group(&self, group: &str) -> Vec<ServiceDescriptor> {
        self.get_all_services()
            .into_iter()
            .filter(|s| s.gateway_group == group)
            .collect()
    }

    pub fn get_healthy_services(&self) -> Vec<ServiceDescriptor> {
        self.get_all_services()
            .into_iter()
            .filter(|s| s.health == HealthStatus::Healthy)
            .collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.services.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }

    /// Dependencies and dependents of every service
    pub fn get_dependency_graph(&self) -> BTreeMap<String, DependencyNode> {
        dependency_graph(&self.services.read())
    }

    /// Services ordered so every dependency precedes its dependents.
    ///
    /// Never fails: missing dependencies are skipped and cycles are broken,
    /// with a warning for each.
    pub fn get_service_topology(&self) -> Vec<ServiceDescriptor> {
        let services = self.services.read();
        let topology = topological_order(&services);

        for cycle in &topology.cycles {
            warn!("Dependency cycle broken during ordering: {}", cycle.join(" -> "));
        }
        for (service, dependency) in &topology.missing {
            warn!("Service {} depends on unregistered {}", service, dependency);
        }

        topology
            .order
            .iter()
            .filter_map(|id| services.get(id).cloned())
            .collect()
    }

    /// Strict variant of the topology check
    pub fn validate_topology(&self) -> Result<()> {
        let topology = topological_order(&self.services.read());
        if let Some(cycle) = topology.cycles.first() {
            return Err(GatewayError::CyclicDependency(cycle.join(" -> ")));
        }
        if let Some((service, dependency)) = topology.missing.first() {
            return Err(GatewayError::validation(format!(
                "Service {} depends on unregistered {}",
                service, dependency
            )));
        }
        Ok(())
    }

    /// True only when every declared dependency is registered and healthy
    pub fn check_dependencies(&self, id: &str) -> bool {
        self.unhealthy_dependencies(id)
            .is_some_and(|unhealthy| unhealthy.is_empty())
    }

    /// Like [`check_dependencies`](Self::check_dependencies), naming the
    /// offending dependencies
    pub fn dependency_report(&self, id: &str) -> Result<()> {
        let unhealthy = self
            .unhealthy_dependencies(id)
            .ok_or_else(|| GatewayError::not_found(format!("Service '{}'", id)))?;
        if unhealthy.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::DependencyUnhealthy(format!(
                "{} waits on {}",
                id,
                unhealthy.join(", ")
            )))
        }
    }

    fn unhealthy_dependencies(&self, id: &str) -> Option<Vec<String>> {
        let services = self.services.read();
        let service = services.get(id)?;
        Some(
            service
                .dependencies
                .iter()
                .filter(|dep| {
                    services
                        .get(dep.as_str())
                        .is_none_or(|d| d.health != HealthStatus::Healthy)
                })
                .cloned()
                .collect(),
        )
    }

    /// Restore descriptors persisted by a previous run
    pub async fn load_persisted(&self) -> Result<usize> {
        let keys = self.storage.store().keys(SERVICE_KEY_PREFIX).await?;
        let mut loaded = 0;
        for key in keys {
            match self.storage.get_json::<ServiceDescriptor>(&key).await {
                Ok(Some(descriptor)) => {
                    self.services
                        .write()
                        .entry(descriptor.id.clone())
                        .or_insert(descriptor);
                    loaded += 1;
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable persisted service {}: {}", key, e),
            }
        }
        if loaded > 0 {
            info!("Restored {} persisted services", loaded);
        }
        Ok(loaded)
    }

    fn write_gate(&self, id: &str) -> Arc<Mutex<()>> {
        self.write_gates
            .entry(id.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Write the current descriptor of `id`, or nothing once it is gone
    async fn persist(&self, id: &str) {
        let gate = self.write_gate(id);
        let _guard = gate.lock().await;
        let Some(descriptor) = self.get_service(id) else {
            debug!("Service {} removed before persisting", id);
            return;
        };
        let ttl = Some(self.storage.service_ttl());
        if let Err(e) = self.storage.put_json(&service_key(id), &descriptor, ttl).await {
            warn!("Failed to persist service {}: {}", id, e);
        }
    }
}

fn service_key(id: &str) -> String {
    format!("{}{}", SERVICE_KEY_PREFIX, id)
}

fn apply_status_hint(service: &mut ServiceDescriptor) {
    if service.status == ServiceStatus::ShuttingDown {
        return;
    }
    service.status = if service.health == HealthStatus::Healthy {
        ServiceStatus::Healthy
    } else {
        ServiceStatus::Registered
    };
}
