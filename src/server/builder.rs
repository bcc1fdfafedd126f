//! Server builder and run_server function

use crate::config::Config;
use crate::server::server::HttpServer;
use crate::storage::StorageLayer;
use crate::utils::error::{GatewayError, Result};
use tracing::info;

/// Server builder for easier configuration
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config: Option<Config>,
    storage: Option<StorageLayer>,
}

impl ServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set configuration
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an already opened store instead of the configured one
    pub fn with_storage(mut self, storage: StorageLayer) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Build the HTTP server
    pub async fn build(self) -> Result<HttpServer> {
        let config = self
            .config
            .ok_or_else(|| GatewayError::Config("Configuration is required".to_string()))?;

        match self.storage {
            Some(storage) => {
                let state = crate::server::state::AppState::with_storage(config, storage).await?;
                Ok(HttpServer::with_state(state))
            }
            None => HttpServer::new(&config).await,
        }
    }
}

/// Serve with an already loaded configuration
pub async fn run_server(config: Config) -> Result<()> {
    info!("Starting {} v{}", crate::NAME, crate::VERSION);

    let server = ServerBuilder::new().with_config(config).build().await?;
    let state = server.state();
    info!(
        "Serving {} routes and {} registered services on {}",
        state.router.table().routes().len(),
        state.registry.len(),
        server.config().bind_addr()
    );

    server.start().await
}
