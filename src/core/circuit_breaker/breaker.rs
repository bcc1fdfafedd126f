//! Circuit breaker state machine

use super::types::{
    BreakerEvent, BreakerSettings, BreakerStats, CircuitState, Outcome, Transition, now_millis,
};
use crate::utils::error::{GatewayError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Unsynchronized breaker state. Every method takes the current time so
/// transitions are a pure function of the recorded outcomes and the clock.
#[derive(Debug, Clone)]
pub struct BreakerCore {
    settings: BreakerSettings,
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<i64>,
    next_attempt: Option<i64>,
    window: VecDeque<Outcome>,
}

impl BreakerCore {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_time: None,
            next_attempt: None,
            window: VecDeque::new(),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    pub fn next_attempt(&self) -> Option<i64> {
        self.next_attempt
    }

    /// Admit a call at `now`, moving OPEN -> HALF_OPEN once the cooldown
    /// has elapsed. Rejections carry the next attempt time.
    pub fn acquire_at(&mut self, now: i64) -> std::result::Result<Option<Transition>, i64> {
        if self.state != CircuitState::Open {
            return Ok(None);
        }
        let next_attempt = self.next_attempt.unwrap_or(now);
        if now < next_attempt {
            return Err(next_attempt);
        }
        self.success_count = 0;
        Ok(self.transition(CircuitState::HalfOpen))
    }

    /// Whether a call at `now` would be rejected
    pub fn is_open_at(&self, now: i64) -> bool {
        self.state == CircuitState::Open && self.next_attempt.is_none_or(|next| now < next)
    }

    pub fn on_success_at(&mut self, now: i64) -> Option<Transition> {
        self.push(now, true);
        match self.state {
            CircuitState::Closed => {
                self.failure_count = 0;
                self.evaluate_closed(now)
            }
            CircuitState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= self.settings.threshold {
                    self.clear();
                    self.transition(CircuitState::Closed)
                } else {
                    None
                }
            }
            CircuitState::Open => None,
        }
    }

    pub fn on_failure_at(&mut self, now: i64) -> Option<Transition> {
        self.push(now, false);
        self.failure_count += 1;
        self.last_failure_time = Some(now);
        match self.state {
            CircuitState::Closed => self.evaluate_closed(now),
            // A single trial failure re-opens with a fresh cooldown
            CircuitState::HalfOpen => self.trip(now),
            CircuitState::Open => None,
        }
    }

    pub fn force_open_at(&mut self, now: i64) -> Option<Transition> {
        self.trip(now)
    }

    pub fn force_close(&mut self) -> Option<Transition> {
        self.clear();
        self.transition(CircuitState::Closed)
    }

    /// Close and forget every recorded outcome
    pub fn reset(&mut self) -> Option<Transition> {
        self.last_failure_time = None;
        self.window.clear();
        self.force_close()
    }

    pub fn stats_at(&mut self, name: &str, now: i64) -> BreakerStats {
        self.prune(now);
        let (total, failed) = self.window_counts();
        BreakerStats {
            name: name.to_string(),
            state: self.state,
            failure_count: self.failure_count,
            success_count: self.success_count,
            total_requests: total,
            failed_requests: failed,
            error_rate: error_rate(total, failed),
            last_failure_time: self.last_failure_time,
            next_attempt: self.next_attempt,
        }
    }

    fn evaluate_closed(&mut self, now: i64) -> Option<Transition> {
        if self.failure_count >= self.settings.threshold {
            debug!(
                "Consecutive failures {} reached threshold {}",
                self.failure_count, self.settings.threshold
            );
            return self.trip(now);
        }

        let (total, failed) = self.window_counts();
        if total > 0 && total >= self.settings.volume_threshold as usize {
            let rate = error_rate(total, failed);
            if rate >= self.settings.error_threshold {
                debug!(
                    "Error rate {:.1}% over {} calls reached {:.1}%",
                    rate, total, self.settings.error_threshold
                );
                return self.trip(now);
            }
        }
        None
    }

    fn trip(&mut self, now: i64) -> Option<Transition> {
        self.success_count = 0;
        self.next_attempt = Some(now + self.settings.reset_timeout_ms);
        self.transition(CircuitState::Open)
    }

    /// Reset the trip counters. The rolling window outlives state changes.
    fn clear(&mut self) {
        self.failure_count = 0;
        self.success_count = 0;
        self.next_attempt = None;
    }

    fn transition(&mut self, to: CircuitState) -> Option<Transition> {
        let from = self.state;
        self.state = to;
        (from != to).then_some(Transition { from, to })
    }

    fn push(&mut self, now: i64, success: bool) {
        self.window.push_back(Outcome {
            timestamp: now,
            success,
        });
        self.prune(now);
    }

    fn prune(&mut self, now: i64) {
        let cutoff = now - self.settings.rolling_window_ms;
        while self.window.front().is_some_and(|o| o.timestamp < cutoff) {
            self.window.pop_front();
        }
    }

    fn window_counts(&self) -> (usize, usize) {
        let failed = self.window.iter().filter(|o| !o.success).count();
        (self.window.len(), failed)
    }
}

fn error_rate(total: usize, failed: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        failed as f64 * 100.0 / total as f64
    }
}

/// A named breaker. State changes are serialized by a per-breaker mutex
/// that is never held across an await.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    core: Mutex<BreakerCore>,
    events: Option<broadcast::Sender<BreakerEvent>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        Self {
            name: name.into(),
            core: Mutex::new(BreakerCore::new(settings)),
            events: None,
        }
    }

    /// Publish state changes to `events`
    pub fn with_events(mut self, events: broadcast::Sender<BreakerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.core.lock().state()
    }

    pub fn settings(&self) -> BreakerSettings {
        self.core.lock().settings().clone()
    }

    pub fn is_open(&self) -> bool {
        self.core.lock().is_open_at(now_millis())
    }

    pub fn next_attempt(&self) -> Option<i64> {
        self.core.lock().next_attempt()
    }

    /// Admit one call or fail with `CircuitOpen`
    pub fn acquire(&self) -> Result<()> {
        let result = self.core.lock().acquire_at(now_millis());
        match result {
            Ok(transition) => {
                self.publish(transition);
                Ok(())
            }
            Err(next_attempt) => {
                debug!("Circuit breaker {} rejected call", self.name);
                if let Some(events) = &self.events {
                    let _ = events.send(BreakerEvent::Rejected {
                        name: self.name.clone(),
                        next_attempt,
                    });
                }
                Err(GatewayError::circuit_open(&self.name, next_attempt))
            }
        }
    }

    pub fn record_success(&self) {
        let transition = self.core.lock().on_success_at(now_millis());
        self.publish(transition);
    }

    pub fn record_failure(&self) {
        let transition = self.core.lock().on_failure_at(now_millis());
        self.publish(transition);
    }

    pub fn force_open(&self) {
        let transition = self.core.lock().force_open_at(now_millis());
        warn!("Circuit breaker {} forced open", self.name);
        self.publish(transition);
    }

    pub fn force_close(&self) {
        let transition = self.core.lock().force_close();
        info!("Circuit breaker {} forced closed", self.name);
        self.publish(transition);
    }

    pub fn reset(&self) {
        let transition = self.core.lock().reset();
        info!("Circuit breaker {} reset", self.name);
        self.publish(transition);
    }

    pub fn get_stats(&self) -> BreakerStats {
        self.core.lock().stats_at(&self.name, now_millis())
    }

    /// Run `f` through the breaker with the configured deadline
    pub async fn execute<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.acquire()?;
        self.run(f).await
    }

    /// Like [`execute`](Self::execute), but an open breaker answers with
    /// `fallback` instead of an error
    pub async fn execute_with_fallback<F, Fut, G, GFut, T>(&self, f: F, fallback: G) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
        G: FnOnce() -> GFut,
        GFut: Future<Output = Result<T>>,
    {
        match self.acquire() {
            Ok(()) => self.run(f).await,
            Err(e) if e.is_circuit_open() => fallback().await,
            Err(e) => Err(e),
        }
    }

    async fn run<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let timeout = self.settings().timeout;
        match tokio::time::timeout(timeout, f()).await {
            Ok(Ok(value)) => {
                self.record_success();
                Ok(value)
            }
            Ok(Err(e)) => {
                self.record_failure();
                Err(e)
            }
            Err(_) => {
                self.record_failure();
                Err(GatewayError::timeout(format!(
                    "Call through circuit breaker '{}' exceeded {}ms",
                    self.name,
                    timeout.as_millis()
                )))
            }
        }
    }

    fn publish(&self, transition: Option<Transition>) {
        let Some(Transition { from, to }) = transition else {
            return;
        };

        match to {
            CircuitState::Open => warn!("Circuit breaker {} {} -> {}", self.name, from, to),
            _ => info!("Circuit breaker {} {} -> {}", self.name, from, to),
        }

        if let Some(events) = &self.events {
            let _ = events.send(BreakerEvent::StateChanged {
                name: self.name.clone(),
                from,
                to,
                timestamp: now_millis(),
            });
        }
    }
}
