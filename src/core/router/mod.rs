//! Request routing
//!
//! A static prefix table maps inbound paths to one upstream each. Every
//! proxied call passes the route's circuit breaker first and reports its
//! transport outcome back to it.

mod hooks;
mod proxy;
mod table;

#[cfg(test)]
mod tests;

pub use hooks::{ForwardContext, ProxyHooks, TracingHooks};
pub use proxy::{
    FORWARDED_FOR_HEADER, GATEWAY_TIMESTAMP_HEADER, HOP_BY_HOP, ProxyOutcome, ProxyRequest,
    REQUEST_ID_HEADER, RequestRouter, is_hop_by_hop,
};
pub use table::{Route, RouteTable};
