//! Circuit breaker administration endpoints

use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use crate::utils::error::GatewayError;
use actix_web::{HttpResponse, Result as ActixResult, web};
use tracing::info;

/// Configure breaker routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(list_breakers))
        .route("/{name}", web::get().to(get_breaker))
        .route("/{name}/{action}", web::post().to(apply_action));
}

async fn list_breakers(state: web::Data<AppState>) -> HttpResponse {
    ApiResponse::success(state.breakers.get_all_stats()).to_http_response()
}

async fn get_breaker(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let name = path.into_inner();
    let stats = state
        .breakers
        .get_stats(&name)
        .ok_or_else(|| GatewayError::not_found(format!("Circuit breaker '{}'", name)))?;
    Ok(ApiResponse::success(stats).to_http_response())
}

/// Force a breaker open or closed, or reset it
async fn apply_action(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> ActixResult<HttpResponse> {
    let (name, action) = path.into_inner();
    let stats = match action.as_str() {
        "open" => state.breakers.force_open(&name)?,
        "close" => state.breakers.force_close(&name)?,
        "reset" => state.breakers.reset(&name)?,
        other => {
            return Err(GatewayError::bad_request(format!(
                "Unknown breaker action '{}', expected open, close or reset",
                other
            ))
            .into());
        }
    };
    info!(breaker = %name, "Breaker {} via API, now {}", action, stats.state);
    Ok(ApiResponse::success(stats).to_http_response())
}
