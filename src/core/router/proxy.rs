//! Circuit-protected reverse proxy

use super::hooks::{ForwardContext, ProxyHooks, TracingHooks};
use super::table::RouteTable;
use crate::config::RouteConfig;
use crate::core::circuit_breaker::{CircuitBreakerManager, now_millis};
use crate::utils::error::{GatewayError, Result};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Headers that describe one hop and are never forwarded
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const GATEWAY_TIMESTAMP_HEADER: &str = "x-gateway-timestamp";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// An inbound request, detached from the HTTP server types
#[derive(Debug, Clone, Default)]
pub struct ProxyRequest {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Bytes,
    pub client_ip: String,
}

/// How a proxied call ended
#[derive(Debug)]
pub enum ProxyOutcome {
    /// The upstream answered; any status is passed through verbatim
    Forwarded(reqwest::Response),
    /// The breaker rejected the call without touching the network
    CircuitOpen { route: String, next_attempt: i64 },
    /// No prefix matched
    NoRoute,
    /// The request itself cannot be forwarded
    Rejected(GatewayError),
    /// The upstream could not be reached
    TransportError { route: String, error: GatewayError },
}

/// Resolves routes and forwards through the matching breaker
pub struct RequestRouter {
    table: RouteTable,
    breakers: Arc<CircuitBreakerManager>,
    client: reqwest::Client,
    hooks: Vec<Arc<dyn ProxyHooks>>,
    default_timeout: Duration,
}

impl std::fmt::Debug for RequestRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestRouter")
            .field("routes", &self.table.routes().len())
            .field("hooks", &self.hooks.len())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl RequestRouter {
    pub fn new(
        routes: &[RouteConfig],
        breakers: Arc<CircuitBreakerManager>,
        default_timeout: Duration,
    ) -> Result<Self> {
        let table = RouteTable::from_config(routes)?;
        for route in table.routes() {
            breakers.get_or_create(&route.breaker);
        }

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            table,
            breakers,
            client,
            hooks: vec![Arc::new(TracingHooks)],
            default_timeout,
        })
    }

    /// Append a lifecycle hook
    pub fn with_hook(mut self, hook: Arc<dyn ProxyHooks>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerManager> {
        &self.breakers
    }

    /// Forward one request.
    ///
    /// Only transport failures count against the breaker; an upstream that
    /// answers with 4xx or 5xx is alive and counts as a success.
    pub async fn route(&self, request: ProxyRequest) -> ProxyOutcome {
        let Some(route) = self.table.resolve(&request.path) else {
            debug!("No route for {}", request.path);
            return ProxyOutcome::NoRoute;
        };

        let method = match reqwest::Method::from_bytes(request.method.as_bytes()) {
            Ok(method) => method,
            Err(e) => {
                return ProxyOutcome::Rejected(GatewayError::bad_request(format!(
                    "Invalid method: {}",
                    e
                )));
            }
        };

        let breaker = self.breakers.get_or_create(&route.breaker);
        if let Err(e) = breaker.acquire() {
            let next_attempt = match e {
                GatewayError::CircuitOpen { next_attempt, .. } => next_attempt,
                _ => now_millis(),
            };
            return ProxyOutcome::CircuitOpen {
                route: route.name.clone(),
                next_attempt,
            };
        }

        let target = route.target_url(&request.path, request.query.as_deref());
        let ctx = ForwardContext {
            request_id: request.request_id.clone(),
            route: route.name.clone(),
            method: request.method.clone(),
            path: request.path.clone(),
            target: target.clone(),
            started: Instant::now(),
        };

        let mut headers = outbound_headers(&request);
        for hook in &self.hooks {
            hook.before_forward(&ctx, &mut headers);
        }

        let timeout = route.timeout.unwrap_or(self.default_timeout);
        let result = self
            .client
            .request(method, &target)
            .headers(headers)
            .body(request.body)
            .timeout(timeout)
            .send()
            .await;

        match result {
            Ok(response) => {
                breaker.record_success();
                let status = response.status().as_u16();
                for hook in &self.hooks {
                    hook.after_forward(&ctx, status);
                }
                ProxyOutcome::Forwarded(response)
            }
            Err(e) => {
                breaker.record_failure();
                let error = if e.is_timeout() {
                    GatewayError::timeout(format!(
                        "{} did not answer within {:?}",
                        route.name, timeout
                    ))
                } else {
                    GatewayError::upstream_transport(format!("{}: {}", route.name, e))
                };
                for hook in &self.hooks {
                    hook.on_transport_error(&ctx, &error);
                }
                ProxyOutcome::TransportError {
                    route: route.name.clone(),
                    error,
                }
            }
        }
    }
}

fn outbound_headers(request: &ProxyRequest) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let mut forwarded_for: Option<String> = None;

    for (name, value) in &request.headers {
        if is_hop_by_hop(name) || name.eq_ignore_ascii_case(REQUEST_ID_HEADER) {
            continue;
        }
        if name.eq_ignore_ascii_case(FORWARDED_FOR_HEADER) {
            forwarded_for = std::str::from_utf8(value).ok().map(str::to_string);
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(value),
        ) {
            headers.append(name, value);
        }
    }

    let forwarded_for = match forwarded_for {
        Some(existing) if !existing.is_empty() => format!("{}, {}", existing, request.client_ip),
        _ => request.client_ip.clone(),
    };

    for (name, value) in [
        (REQUEST_ID_HEADER, request.request_id.clone()),
        (GATEWAY_TIMESTAMP_HEADER, now_millis().to_string()),
        (FORWARDED_FOR_HEADER, forwarded_for),
    ] {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
    headers
}
