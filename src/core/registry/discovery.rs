//! Best-effort service discovery

use super::registry::ServiceRegistry;
use super::types::ServiceRegistration;
use crate::config::{WellKnownService, default_gateway_group, default_health_path};
use crate::utils::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What one discovery pass found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub registered: Vec<String>,
    pub failed: Vec<String>,
}

/// Body of a gateway's `/services` endpoint
#[derive(Debug, Deserialize)]
struct ServiceListing {
    #[serde(default)]
    services: Vec<ListedService>,
}

/// A self-reported service, tolerant of the field spellings in use
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedService {
    #[serde(alias = "name")]
    id: String,
    #[serde(default, alias = "url")]
    endpoint: Option<String>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default, alias = "health_endpoint")]
    health_endpoint: Option<String>,
    #[serde(default, alias = "gateway_group", alias = "group")]
    gateway_group: Option<String>,
    #[serde(default)]
    priority: Option<i32>,
    #[serde(default)]
    dependencies: BTreeSet<String>,
    #[serde(default)]
    critical: bool,
}

impl ListedService {
    fn into_registration(self, gateway: &url::Url) -> Option<ServiceRegistration> {
        let endpoint = match (self.endpoint, self.port) {
            (Some(endpoint), _) => endpoint,
            (None, Some(port)) => {
                let host = self
                    .host
                    .or_else(|| gateway.host_str().map(str::to_string))?;
                format!("{}://{}:{}", gateway.scheme(), host, port)
            }
            (None, None) => return None,
        };

        let mut registration = ServiceRegistration::new(self.id, endpoint)
            .critical(self.critical)
            .priority(self.priority.unwrap_or_default())
            .group(self.gateway_group.unwrap_or_else(default_gateway_group))
            .depends_on(self.dependencies);
        registration.health_endpoint = self.health_endpoint.unwrap_or_else(default_health_path);
        Some(registration)
    }
}

impl ServiceRegistry {
    /// Query configured gateways and well-known ports and register whatever
    /// answers. Individual failures are logged and skipped.
    pub async fn discover_services(&self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        let timeout = Duration::from_millis(self.discovery.timeout_ms);

        for gateway in &self.discovery.gateways {
            match self.fetch_listing(gateway, timeout).await {
                Ok(registrations) => {
                    for registration in registrations {
                        let id = registration.id.clone();
                        match self.register_service(registration).await {
                            Ok(_) => report.registered.push(id),
                            Err(e) => {
                                warn!("Discovered service {} rejected: {}", id, e);
                                report.failed.push(id);
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Discovery via gateway {} failed: {}", gateway, e);
                    report.failed.push(gateway.clone());
                }
            }
        }

        for known in &self.discovery.well_known {
            if report.registered.contains(&known.id) {
                continue;
            }
            let registration = self.well_known_registration(known);
            let health_url = format!(
                "{}{}",
                registration.endpoint.trim_end_matches('/'),
                registration.health_endpoint
            );
            match self.reach(&health_url, timeout).await {
                Ok(()) => match self.register_service(registration).await {
                    Ok(_) => report.registered.push(known.id.clone()),
                    Err(e) => {
                        warn!("Well-known service {} rejected: {}", known.id, e);
                        report.failed.push(known.id.clone());
                    }
                },
                Err(e) => {
                    debug!("Well-known service {} not reachable: {}", known.id, e);
                    report.failed.push(known.id.clone());
                }
            }
        }

        info!(
            "Discovery finished: {} registered, {} unreachable",
            report.registered.len(),
            report.failed.len()
        );
        report
    }

    async fn fetch_listing(
        &self,
        gateway: &str,
        timeout: Duration,
    ) -> Result<Vec<ServiceRegistration>> {
        let base = url::Url::parse(gateway).map_err(|e| {
            GatewayError::validation(format!("Invalid gateway url {}: {}", gateway, e))
        })?;
        let url = format!("{}/services", gateway.trim_end_matches('/'));

        let listing: ServiceListing = self
            .http
            .get(&url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(listing
            .services
            .into_iter()
            .filter_map(|s| {
                let id = s.id.clone();
                let registration = s.into_registration(&base);
                if registration.is_none() {
                    warn!("Listed service {} has no reachable address", id);
                }
                registration
            })
            .collect())
    }

    async fn reach(&self, url: &str, timeout: Duration) -> Result<()> {
        let response = self.http.get(url).timeout(timeout).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(GatewayError::health_check(format!(
                "{} answered {}",
                url,
                response.status()
            )))
        }
    }

    fn well_known_registration(&self, known: &WellKnownService) -> ServiceRegistration {
        let mut registration = ServiceRegistration::new(
            known.id.clone(),
            format!("http://{}:{}", self.discovery.host, known.port),
        )
        .critical(known.critical)
        .priority(known.priority);
        registration.health_endpoint = known.health_endpoint.clone();
        registration
    }
}
