//! Gateway orchestration core
//!
//! - **registry**: service descriptors, dependencies and topology
//! - **circuit_breaker**: per-route breakers and their manager
//! - **router**: prefix routing and upstream forwarding
//! - **tracker**: request correlation and traces
//! - **broadcast**: WebSocket update fan-out

pub mod broadcast;
pub mod circuit_breaker;
pub mod registry;
pub mod router;
pub mod tracker;
