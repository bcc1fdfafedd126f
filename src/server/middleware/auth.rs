//! Bearer-token authentication middleware

use crate::auth::{AuthGate, extract_bearer};
use crate::utils::error::GatewayError;
use actix_web::HttpMessage;
use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::{Method, header};
use futures::FutureExt;
use futures::future::{Ready, ready};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// Verifies the `Authorization: Bearer` token and stores the [`Claims`]
/// in request extensions. With `admin_writes`, non-GET requests also
/// need the admin role while auth is enabled.
///
/// [`Claims`]: crate::auth::Claims
pub struct AuthMiddleware {
    gate: Arc<AuthGate>,
    admin_writes: bool,
}

impl AuthMiddleware {
    pub fn new(gate: Arc<AuthGate>) -> Self {
        Self {
            gate,
            admin_writes: false,
        }
    }

    /// Require the admin role for state-changing methods
    pub fn admin_writes(mut self) -> Self {
        self.admin_writes = true;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            gate: Arc::clone(&self.gate),
            admin_writes: self.admin_writes,
        }))
    }
}

/// Service implementation for auth middleware
pub struct AuthMiddlewareService<S> {
    service: S,
    gate: Arc<AuthGate>,
    admin_writes: bool,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
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
        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer);

        let claims = match self.gate.authenticate(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Rejected {} {}: {}", req.method(), req.path(), e);
                return reject(req, e);
            }
        };

        if self.admin_writes
            && self.gate.is_enabled()
            && req.method() != Method::GET
            && !claims.is_admin()
        {
            return reject(req, GatewayError::auth("Admin role required"));
        }

        req.extensions_mut().insert(claims);
        Box::pin(self.service.call(req).map(|res| res.map(ServiceResponse::map_into_left_body)))
    }
}

type Rejection<B> =
    Pin<Box<dyn Future<Output = Result<ServiceResponse<EitherBody<B>>, actix_web::Error>>>>;

/// Answer with the error envelope without reaching the inner service
fn reject<B: 'static>(req: ServiceRequest, err: GatewayError) -> Rejection<B> {
    Box::pin(ready(Ok(req.error_response(err).map_into_right_body())))
}
