//! Named collection of independent breakers

use super::breaker::CircuitBreaker;
use super::types::{BreakerEvent, BreakerSettings, BreakerStats};
use crate::config::BreakerConfig;
use crate::utils::error::{GatewayError, Result};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CAPACITY: usize = 256;

/// Owns exactly one breaker per name, created on first use
#[derive(Debug)]
pub struct CircuitBreakerManager {
    config: BreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    events: broadcast::Sender<BreakerEvent>,
}

impl CircuitBreakerManager {
    pub fn new(config: BreakerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            breakers: DashMap::new(),
            events,
        }
    }

    /// Receive breaker state changes and rejections
    pub fn subscribe(&self) -> broadcast::Receiver<BreakerEvent> {
        self.events.subscribe()
    }

    /// The breaker for `name`, creating it from defaults and overrides
    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.get(name) {
            return breaker.clone();
        }
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating circuit breaker {}", name);
                let settings = BreakerSettings::from_config(&self.config, name);
                Arc::new(CircuitBreaker::new(name, settings).with_events(self.events.clone()))
            })
            .clone()
    }

    /// An existing breaker
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|b| b.clone())
    }

    fn existing(&self, name: &str) -> Result<Arc<CircuitBreaker>> {
        self.get(name)
            .ok_or_else(|| GatewayError::not_found(format!("Circuit breaker '{}'", name)))
    }

    /// Run `f` through the named breaker
    pub async fn execute<F, Fut, T>(&self, name: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.get_or_create(name).execute(f).await
    }

    /// Like [`execute`](Self::execute), answering with `fallback` while the
    /// breaker is open
    pub async fn execute_with_fallback<F, Fut, G, GFut, T>(
        &self,
        name: &str,
        f: F,
        fallback: G,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
        G: FnOnce() -> GFut,
        GFut: Future<Output = Result<T>>,
    {
        self.get_or_create(name)
            .execute_with_fallback(f, fallback)
            .await
    }

    /// Admit one call through the named breaker
    pub fn acquire(&self, name: &str) -> Result<()> {
        self.get_or_create(name).acquire()
    }

    /// Whether calls through `name` are currently rejected
    pub fn is_open(&self, name: &str) -> bool {
        self.get(name).is_some_and(|b| b.is_open())
    }

    pub fn next_attempt(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|b| b.next_attempt())
    }

    pub fn record_success(&self, name: &str) {
        self.get_or_create(name).record_success();
    }

    pub fn record_failure(&self, name: &str) {
        self.get_or_create(name).record_failure();
    }

    pub fn force_open(&self, name: &str) -> Result<BreakerStats> {
        let breaker = self.existing(name)?;
        breaker.force_open();
        Ok(breaker.get_stats())
    }

    pub fn force_close(&self, name: &str) -> Result<BreakerStats> {
        let breaker = self.existing(name)?;
        breaker.force_close();
        Ok(breaker.get_stats())
    }

    pub fn reset(&self, name: &str) -> Result<BreakerStats> {
        let breaker = self.existing(name)?;
        breaker.reset();
        Ok(breaker.get_stats())
    }

    pub fn get_stats(&self, name: &str) -> Option<BreakerStats> {
        self.get(name).map(|b| b.get_stats())
    }

    /// Statistics of every breaker, sorted by name
    pub fn get_all_stats(&self) -> Vec<BreakerStats> {
        let breakers: Vec<Arc<CircuitBreaker>> =
            self.breakers.iter().map(|b| b.value().clone()).collect();
        let mut stats: Vec<BreakerStats> = breakers.iter().map(|b| b.get_stats()).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    /// Names of all breakers
    pub fn names(&self) -> Vec<String> {
        self.breakers.iter().map(|b| b.key().clone()).collect()
    }
}
