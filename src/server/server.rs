//! HTTP server core implementation

use crate::config::{Config, CorsConfig, ServerConfig};
use crate::server::middleware::{AuthMiddleware, RateLimitMiddleware, RequestTracking};
use crate::server::routes;
use crate::server::state::AppState;
use crate::utils::error::{GatewayError, Result};
use actix_cors::Cors;
use actix_web::{
    App, HttpServer as ActixHttpServer,
    middleware::{Condition, DefaultHeaders, Logger},
    web,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Largest request body forwarded upstream
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// HTTP server
pub struct HttpServer {
    /// Server configuration
    config: ServerConfig,
    /// Application state
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server, opening the store and building every
    /// component
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Creating HTTP server");
        let state = AppState::build(config.clone()).await?;
        Ok(Self::with_state(state))
    }

    /// Serve an already built state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config.gateway.server.clone(),
            state,
        }
    }

    /// Create the Actix-web application
    pub fn create_app(
        state: web::Data<AppState>,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let gateway = &state.config.gateway;
        let cors = build_cors(&gateway.server.cors);
        let cors_enabled = gateway.server.cors.enabled;
        let rate_limit =
            RateLimitMiddleware::new(gateway.rate_limit.clone(), state.storage.clone());
        let tracking = RequestTracking::new(Arc::clone(&state.tracker));
        let auth = Arc::clone(&state.auth);

        App::new()
            .app_data(state)
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .app_data(web::JsonConfig::default().limit(MAX_BODY_BYTES).error_handler(
                |err, _req| GatewayError::bad_request(format!("Invalid JSON body: {}", err)).into(),
            ))
            .wrap(rate_limit)
            .wrap(Condition::new(cors_enabled, cors))
            .wrap(tracking)
            .wrap(DefaultHeaders::new().add(("Server", crate::NAME)))
            .wrap(Logger::default())
            .configure(routes::health::configure_routes)
            .service(
                web::scope("/services")
                    .wrap(AuthMiddleware::new(Arc::clone(&auth)))
                    .configure(routes::services::configure_routes),
            )
            .service(
                web::scope("/circuit-breakers")
                    .wrap(AuthMiddleware::new(auth).admin_writes())
                    .configure(routes::breakers::configure_routes),
            )
            .service(web::scope("/ws").configure(routes::ws::configure_routes))
            .default_service(web::to(routes::proxy::proxy))
    }

    /// Start background tasks and serve until the server stops
    pub async fn start(self) -> Result<()> {
        let bind_addr = self.config.bind_addr();
        info!("Starting HTTP server on {}", bind_addr);

        let background = self.state.start_background().await?;
        let shutdown_state = self.state.clone();
        let state = web::Data::new(self.state);

        let mut server = ActixHttpServer::new(move || Self::create_app(state.clone()))
            .client_request_timeout(Duration::from_secs(self.config.timeout));
        if let Some(workers) = self.config.workers {
            server = server.workers(workers);
        }
        let server = server
            .bind(&bind_addr)
            .map_err(|e| GatewayError::config(format!("Failed to bind {}: {}", bind_addr, e)))?
            .run();

        info!("HTTP server listening on {}", bind_addr);
        let result = server.await;

        shutdown_state.shutdown();
        for handle in background {
            handle.abort();
        }
        result?;
        info!("HTTP server stopped");
        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

fn build_cors(config: &CorsConfig) -> Cors {
    let mut cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .expose_headers(["x-request-id"])
        .max_age(config.max_age as usize);

    if config.allows_all_origins() {
        cors = cors.allow_any_origin();
    } else {
        for origin in &config.allowed_origins {
            if origin.starts_with("http://") || origin.starts_with("https://") {
                cors = cors.allowed_origin(origin);
            } else {
                warn!("Ignoring malformed CORS origin '{}'", origin);
            }
        }
    }
    cors
}
