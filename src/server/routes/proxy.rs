//! Reverse proxy fallback for every path not served by the gateway itself

use crate::core::router::{ProxyOutcome, ProxyRequest, is_hop_by_hop};
use crate::server::middleware::RequestId;
use crate::server::state::AppState;
use crate::utils::error::GatewayError;
use actix_web::http::StatusCode;
use actix_web::web::Bytes;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, Result as ActixResult, web};
use tracing::debug;
use uuid::Uuid;

/// Forward the request through the route table.
///
/// Upstream responses of any status pass through untouched. Gateway-side
/// failures become structured errors: open breaker 503, unknown prefix
/// 404, unreachable upstream 502.
pub async fn proxy(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: Bytes,
) -> ActixResult<HttpResponse> {
    let request = to_proxy_request(&req, body);
    let path = request.path.clone();

    match state.router.route(request).await {
        ProxyOutcome::Forwarded(response) => Ok(relay(response)),
        ProxyOutcome::CircuitOpen {
            route,
            next_attempt,
        } => {
            debug!("Rejected {} while breaker for {} is open", path, route);
            Err(GatewayError::circuit_open(route, next_attempt).into())
        }
        ProxyOutcome::NoRoute => {
            Err(GatewayError::not_found(format!("No route for {}", path)).into())
        }
        ProxyOutcome::Rejected(error) => Err(error.into()),
        ProxyOutcome::TransportError { error, .. } => Err(match error {
            GatewayError::UpstreamTransport(_) => error,
            other => GatewayError::upstream_transport(other.to_string()),
        }
        .into()),
    }
}

fn to_proxy_request(req: &HttpRequest, body: Bytes) -> ProxyRequest {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let client_ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();

    ProxyRequest {
        request_id,
        method: req.method().to_string(),
        path: req.path().to_string(),
        query: Some(req.query_string())
            .filter(|q| !q.is_empty())
            .map(str::to_string),
        headers: req
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect(),
        body,
        client_ip,
    }
}

/// Stream an upstream response back to the client
fn relay(response: reqwest::Response) -> HttpResponse {
    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = HttpResponse::build(status);
    for (name, value) in response.headers() {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        builder.append_header((name.as_str(), value.as_bytes()));
    }
    builder.streaming(response.bytes_stream())
}
