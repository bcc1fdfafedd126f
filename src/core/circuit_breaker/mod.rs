//! Per-route circuit breaking
//!
//! Each breaker is an independent CLOSED / OPEN / HALF_OPEN state machine
//! over a rolling window of call outcomes. A closed breaker trips when
//! `threshold` consecutive calls fail, or when at least `volume_threshold`
//! calls in the window fail at `error_threshold` percent or more. An open
//! breaker moves to half-open lazily, on the first call at or after its
//! next attempt time. One half-open failure re-opens it; `threshold`
//! half-open successes close it.

mod breaker;
mod manager;
mod middleware;
mod types;


pub use breaker::{BreakerCore, CircuitBreaker};
pub use manager::CircuitBreakerManager;
pub use middleware::CircuitBreakerMiddleware;
pub use types::{
    BreakerEvent, BreakerSettings, BreakerStats, CircuitState, Outcome, Transition, now_millis,
};
