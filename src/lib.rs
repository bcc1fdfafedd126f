//! # telegate
//!
//! API gateway orchestration core for a Telegram content-distribution bot.
//!
//! The gateway fronts independently deployed backends (auth, bot, media,
//! frontend, TDLib bridge), isolates their failures and exposes aggregate
//! health and metrics.
//!
//! ## Features
//!
//! - **Service registry**: descriptors, dependency graph and startup order
//! - **Health monitoring**: periodic HTTP/TCP/process/custom checks,
//!   consecutive-failure alerts and system resource sampling
//! - **Circuit breaking**: one breaker per route, open breakers fail fast
//! - **Reverse proxy**: prefix routing with correlation ids
//! - **Real-time updates**: WebSocket fan-out of the bridge update stream
//! - **Persistent store**: Redis or in-memory, behind one trait
//!
//! ## Running
//!
//! ```rust,no_run
//! use telegate::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/gateway.yaml").await?;
//!     telegate::server::run_server(config).await?;
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod auth;
pub mod config;
pub mod core;
pub mod monitoring;
pub mod server;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use core::broadcast::UpdateBroadcaster;
pub use core::circuit_breaker::{CircuitBreakerManager, CircuitState};
pub use core::registry::{HealthStatus, ServiceDescriptor, ServiceRegistration, ServiceRegistry};
pub use core::router::RequestRouter;
pub use core::tracker::RequestTracker;
pub use monitoring::HealthMonitor;
pub use storage::{PersistentStore, StorageLayer};
pub use utils::error::{GatewayError, Result};

/// Current version of the crate, reported by `/health/detailed`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate, sent in the `Server` header
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(NAME, "telegate");
    }
}
