//! Fixed-window rate limiting keyed by client address

use crate::config::RateLimitConfig;
use crate::storage::StorageLayer;
use crate::utils::error::GatewayError;
use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use futures::future::{Ready, ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use tracing::{debug, warn};

/// Key prefix of rate-limit counters in the store
pub const RATE_LIMIT_KEY_PREFIX: &str = "ratelimit:";

/// Paths that are never limited
const EXEMPT_PATHS: &[&str] = &["/health"];

/// Counts requests per client IP in the persistent store and rejects the
/// excess with 429. Store failures and slow store calls let the request
/// through.
pub struct RateLimitMiddleware {
    config: RateLimitConfig,
    storage: StorageLayer,
}

impl RateLimitMiddleware {
    pub fn new(config: RateLimitConfig, storage: StorageLayer) -> Self {
        Self { config, storage }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = RateLimitMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            config: self.config.clone(),
            storage: self.storage.clone(),
        }))
    }
}

/// Service implementation for rate limit middleware
pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    config: RateLimitConfig,
    storage: StorageLayer,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        if !self.config.enabled || EXEMPT_PATHS.contains(&req.path()) {
            return Box::pin(async move { Ok(service.call(req).await?.map_into_left_body()) });
        }

        let storage = self.storage.clone();
        let max_requests = self.config.max_requests;
        let window_secs = (self.config.window_ms / 1000).max(1);
        let client_ip = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        Box::pin(async move {
            let key = format!("{}{}", RATE_LIMIT_KEY_PREFIX, client_ip);
            let counted = storage.store().incr_window(&key, window_secs);
            match storage.bounded("incr_window", counted).await {
                Ok(count) if count > max_requests => {
                    debug!("Rate limit exceeded for {} ({} requests)", client_ip, count);
                    let retry_at =
                        chrono::Utc::now().timestamp_millis() + (window_secs * 1000) as i64;
                    let err = GatewayError::rate_limit(
                        format!("Too many requests, retry after {} seconds", window_secs),
                        retry_at,
                    );
                    return Ok(req.error_response(err).map_into_right_body());
                }
                Ok(_) => {}
                Err(e) => warn!("Rate limit store unavailable, admitting request: {}", e),
            }
            Ok(service.call(req).await?.map_into_left_body())
        })
    }
}
