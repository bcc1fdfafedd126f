//! Request correlation middleware

use crate::core::router::REQUEST_ID_HEADER;
use crate::core::tracker::RequestTracker;
use crate::utils::error::GatewayError;
use actix_web::HttpMessage;
use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::header::{self, HeaderName, HeaderValue};
use futures::future::{Ready, ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

/// Correlation id assigned to the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Opens a trace per request, exposes its id to handlers through
/// [`RequestId`] and echoes it in the `x-request-id` response header.
/// Gateway error envelopes produced by inner layers are re-rendered with
/// the request id.
pub struct RequestTracking {
    tracker: Arc<RequestTracker>,
}

impl RequestTracking {
    pub fn new(tracker: Arc<RequestTracker>) -> Self {
        Self { tracker }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestTracking
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = RequestTrackingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestTrackingService {
            service: Rc::new(service),
            tracker: Arc::clone(&self.tracker),
        }))
    }
}

/// Service implementation for request tracking
pub struct RequestTrackingService<S> {
    service: Rc<S>,
    tracker: Arc<RequestTracker>,
}

impl<S, B> Service<ServiceRequest> for RequestTrackingService<S>
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
        let client_ip = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();
        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok());
        let trace = self
            .tracker
            .begin(req.method().as_str(), req.path(), &client_ip, user_agent);
        let request_id = trace.request_id.clone();
        req.extensions_mut().insert(RequestId(request_id.clone()));

        let service = Rc::clone(&self.service);
        let tracker = Arc::clone(&self.tracker);

        Box::pin(async move {
            let mut res = match service.call(req).await {
                Ok(res) => tag_error(res, &request_id),
                Err(e) => {
                    let status = e.as_response_error().status_code().as_u16();
                    tracker.finish(trace, status).await;
                    return Err(e);
                }
            };

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }
            tracker.finish(trace, res.status().as_u16()).await;
            Ok(res)
        })
    }
}

/// Re-render a [`GatewayError`] response so its envelope carries the
/// correlation id. Headers set by inner layers are kept.
fn tag_error<B>(res: ServiceResponse<B>, request_id: &str) -> ServiceResponse<EitherBody<B>> {
    let tagged = res
        .response()
        .error()
        .and_then(|e| e.as_error::<GatewayError>())
        .map(|e| e.to_response(Some(request_id)));

    match tagged {
        Some(mut tagged) => {
            let fresh: Vec<HeaderName> = tagged.headers().keys().cloned().collect();
            for (name, value) in res.headers() {
                if !fresh.contains(name) {
                    tagged.headers_mut().append(name.clone(), value.clone());
                }
            }
            res.into_response(tagged).map_into_right_body()
        }
        None => res.map_into_left_body(),
    }
}
