//! Service registry endpoints

use crate::core::registry::{DependencyNode, ServiceRegistration};
use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use crate::utils::error::GatewayError;
use actix_web::{HttpResponse, Result as ActixResult, web};
use serde::Serialize;
use tracing::info;

/// Configure registry routes. Fixed segments are declared before `{id}`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(list_services))
        .route("", web::post().to(register_service))
        .route("/topology", web::get().to(topology))
        .route("/graph", web::get().to(dependency_graph))
        .route("/discover", web::post().to(discover))
        .route("/{id}", web::get().to(get_service))
        .route("/{id}", web::delete().to(deregister_service))
        .route("/{id}/dependencies", web::get().to(dependencies))
        .route("/{id}/history", web::get().to(history))
        .route("/{id}/check", web::post().to(check_now));
}

#[derive(Debug, Serialize)]
struct ServiceList<T> {
    services: Vec<T>,
    total: usize,
}

/// Registry dump
async fn list_services(state: web::Data<AppState>) -> HttpResponse {
    let services = state.registry.get_all_services();
    let total = services.len();
    HttpResponse::Ok().json(ServiceList { services, total })
}

async fn register_service(
    state: web::Data<AppState>,
    body: web::Json<ServiceRegistration>,
) -> ActixResult<HttpResponse> {
    let descriptor = state.registry.register_service(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(descriptor)))
}

async fn get_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    let service = state
        .registry
        .get_service(&id)
        .ok_or_else(|| GatewayError::not_found(format!("Service '{}'", id)))?;
    Ok(ApiResponse::success(service).to_http_response())
}

async fn deregister_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    if !state.registry.deregister_service(&id).await {
        return Err(GatewayError::not_found(format!("Service '{}'", id)).into());
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Services in startup order
async fn topology(state: web::Data<AppState>) -> HttpResponse {
    let order: Vec<String> = state
        .registry
        .get_service_topology()
        .into_iter()
        .map(|s| s.id)
        .collect();
    ApiResponse::success(order).to_http_response()
}

async fn dependency_graph(state: web::Data<AppState>) -> HttpResponse {
    ApiResponse::success(state.registry.get_dependency_graph()).to_http_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DependencyStatus {
    id: String,
    #[serde(flatten)]
    node: DependencyNode,
    satisfied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

async fn dependencies(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    let node = state
        .registry
        .get_dependency_graph()
        .remove(&id)
        .ok_or_else(|| GatewayError::not_found(format!("Service '{}'", id)))?;
    let (satisfied, reason) = match state.registry.dependency_report(&id) {
        Ok(()) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };
    Ok(ApiResponse::success(DependencyStatus {
        id,
        node,
        satisfied,
        reason,
    })
    .to_http_response())
}

async fn history(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    if state.registry.get_service(&id).is_none() {
        return Err(GatewayError::not_found(format!("Service '{}'", id)).into());
    }
    Ok(ApiResponse::success(state.monitor.get_history(&id)).to_http_response())
}

/// Run one health check immediately
async fn check_now(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let result = state.monitor.perform_health_check(&path.into_inner()).await?;
    Ok(ApiResponse::success(result).to_http_response())
}

async fn discover(state: web::Data<AppState>) -> HttpResponse {
    let report = state.registry.discover_services().await;
    info!(
        "Discovery via API registered {} services",
        report.registered.len()
    );
    ApiResponse::success(report).to_http_response()
}
