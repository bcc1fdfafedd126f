//! HTTP server implementation
//!
//! Health, metrics, registry and breaker administration, the WebSocket
//! update feed, and the proxied route table as the default service.

pub mod builder;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;


pub use builder::{ServerBuilder, run_server};
pub use server::HttpServer;
pub use state::AppState;
