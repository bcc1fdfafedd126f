//! HTTP middleware
//!
//! - **tracking**: correlation ids and request traces
//! - **rate_limit**: fixed-window limiter on the persistent store
//! - **auth**: bearer-token gate for administrative scopes

mod auth;
mod rate_limit;
mod tracking;


pub use auth::{AuthMiddleware, AuthMiddlewareService};
pub use rate_limit::{RATE_LIMIT_KEY_PREFIX, RateLimitMiddleware, RateLimitMiddlewareService};
pub use tracking::{RequestId, RequestTracking, RequestTrackingService};
