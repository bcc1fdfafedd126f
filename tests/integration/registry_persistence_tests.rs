//! Registry state surviving a gateway restart on a shared store

#[cfg(test)]
mod tests {
    use crate::common::fixtures::app_state_on;
    use crate::common::gateway_config;
    use telegate::core::registry::{
        HealthStatus, SERVICE_KEY_PREFIX, ServiceRegistration, ServiceRegistry,
    };
    use telegate::storage::StorageLayer;
    use telegate::config::DiscoveryConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_descriptors_restored_after_restart() {
        let storage = StorageLayer::in_memory();

        {
            let registry = ServiceRegistry::new(storage.clone(), DiscoveryConfig::default());
            let auth = ServiceRegistration::new("auth", "http://localhost:3002").critical(true);
            registry.register_service(auth).await.unwrap();
            registry
                .register_service(
                    ServiceRegistration::new("bot", "http://localhost:3001").depends_on(["auth"]),
                )
                .await
                .unwrap();
            registry
                .update_service_health("auth", HealthStatus::Healthy, None)
                .await;
        }

        let keys = storage.store().keys(SERVICE_KEY_PREFIX).await.unwrap();
        assert_eq!(keys.len(), 2);

        let state = app_state_on(gateway_config(), storage).await;
        assert_eq!(state.registry.len(), 2);
        assert_eq!(
            state.registry.get_service("auth").unwrap().health,
            HealthStatus::Healthy
        );
        assert!(state.registry.check_dependencies("bot"));

        let order: Vec<String> = state
            .registry
            .get_service_topology()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(order, vec!["auth", "bot"]);
    }

    #[tokio::test]
    async fn test_deregistered_service_is_not_restored() {
        let storage = StorageLayer::in_memory();
        let registry = ServiceRegistry::new(storage.clone(), DiscoveryConfig::default());
        registry
            .register_service(ServiceRegistration::new("media", "http://localhost:3003"))
            .await
            .unwrap();
        assert!(registry.deregister_service("media").await);

        let state = app_state_on(gateway_config(), storage).await;
        assert!(state.registry.get_service("media").is_none());
    }

    #[tokio::test]
    async fn test_check_results_are_persisted() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&upstream)
            .await;

        let storage = StorageLayer::in_memory();
        let mut gateway = gateway_config();
        gateway.services = vec![ServiceRegistration::new("content", upstream.uri())];
        let state = app_state_on(gateway, storage.clone()).await;

        let result = state.monitor.perform_health_check("content").await.unwrap();
        assert_eq!(result.status, HealthStatus::Healthy);

        let restarted = ServiceRegistry::new(storage, DiscoveryConfig::default());
        assert_eq!(restarted.load_persisted().await.unwrap(), 1);
        let descriptor = restarted.get_service("content").unwrap();
        assert_eq!(descriptor.health, HealthStatus::Healthy);
        assert_eq!(descriptor.metrics.total_checks, 1);
    }
}
