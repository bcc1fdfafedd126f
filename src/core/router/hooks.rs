//! Proxy lifecycle hooks

use crate::utils::error::GatewayError;
use reqwest::header::HeaderMap;
use std::time::Instant;
use tracing::{debug, warn};

/// What a hook knows about the call in progress
#[derive(Debug, Clone)]
pub struct ForwardContext {
    pub request_id: String,
    pub route: String,
    pub method: String,
    pub path: String,
    pub target: String,
    pub started: Instant,
}

impl ForwardContext {
    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}

/// Hooks run in order inside the request's own task
pub trait ProxyHooks: Send + Sync {
    /// Last chance to adjust outbound headers
    fn before_forward(&self, _ctx: &ForwardContext, _headers: &mut HeaderMap) {}

    /// The upstream answered, with any status
    fn after_forward(&self, _ctx: &ForwardContext, _status: u16) {}

    /// The upstream could not be reached
    fn on_transport_error(&self, _ctx: &ForwardContext, _error: &GatewayError) {}
}

/// Logs every proxied call
#[derive(Debug, Default)]
pub struct TracingHooks;

impl ProxyHooks for TracingHooks {
    fn before_forward(&self, ctx: &ForwardContext, _headers: &mut HeaderMap) {
        debug!(
            request_id = %ctx.request_id,
            route = %ctx.route,
            "{} {} -> {}",
            ctx.method,
            ctx.path,
            ctx.target
        );
    }

    fn after_forward(&self, ctx: &ForwardContext, status: u16) {
        debug!(
            request_id = %ctx.request_id,
            route = %ctx.route,
            status,
            "Upstream answered in {}ms",
            ctx.elapsed_ms()
        );
    }

    fn on_transport_error(&self, ctx: &ForwardContext, error: &GatewayError) {
        warn!(
            request_id = %ctx.request_id,
            route = %ctx.route,
            "Upstream unreachable after {}ms: {}",
            ctx.elapsed_ms(),
            error
        );
    }
}
