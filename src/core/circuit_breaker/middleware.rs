//! Actix middleware gating handlers behind a named breaker

use super::manager::CircuitBreakerManager;
use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use futures::future::{Ready, ready};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Rejects requests while the breaker is open, answering with the
/// `CIRCUIT_BREAKER_OPEN` envelope, and records every outcome. Handler
/// errors and 5xx responses count as failures.
pub struct CircuitBreakerMiddleware {
    manager: Arc<CircuitBreakerManager>,
    name: String,
}

impl CircuitBreakerMiddleware {
    pub fn new(manager: Arc<CircuitBreakerManager>, name: impl Into<String>) -> Self {
        Self {
            manager,
            name: name.into(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CircuitBreakerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = CircuitBreakerMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CircuitBreakerMiddlewareService {
            service,
            manager: self.manager.clone(),
            name: self.name.clone(),
        }))
    }
}

/// Service implementation for the circuit breaker middleware
pub struct CircuitBreakerMiddlewareService<S> {
    service: S,
    manager: Arc<CircuitBreakerManager>,
    name: String,
}

impl<S, B> Service<ServiceRequest> for CircuitBreakerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let breaker = self.manager.get_or_create(&self.name);

        if let Err(e) = breaker.acquire() {
            return Box::pin(ready(Ok(req.error_response(e).map_into_right_body())));
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            match fut.await {
                Ok(res) => {
                    if res.status().is_server_error() {
                        breaker.record_failure();
                    } else {
                        breaker.record_success();
                    }
                    Ok(res.map_into_left_body())
                }
                Err(e) => {
                    breaker.record_failure();
                    Err(e)
                }
            }
        })
    }
}
