//! Per-request correlation traces

use crate::storage::StorageLayer;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 1000;

/// Key prefix of persisted traces
pub const TRACE_KEY_PREFIX: &str = "trace:";

/// One inbound request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTrace {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub client_ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub start_time: DateTime<Utc>,
    pub status_code: Option<u16>,
    pub duration_ms: Option<u64>,
}

/// A trace that has been opened but not finished.
///
/// Counts towards `in_flight` until it is finished or dropped, so a request
/// future cancelled mid-flight does not leak the gauge.
#[derive(Debug)]
pub struct OpenTrace {
    trace: RequestTrace,
    _in_flight: InFlight,
}

impl Deref for OpenTrace {
    type Target = RequestTrace;

    fn deref(&self) -> &RequestTrace {
        &self.trace
    }
}

#[derive(Debug)]
struct InFlight(Arc<AtomicU64>);

impl InFlight {
    fn enter(counter: &Arc<AtomicU64>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Aggregates over every finished request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerStats {
    pub total_requests: u64,
    /// Requests answered with a 5xx
    pub failed_requests: u64,
    pub in_flight: u64,
    pub average_duration_ms: f64,
    /// Failed share in percent
    pub error_rate: f64,
}

/// Assigns correlation ids and keeps recent traces
#[derive(Debug)]
pub struct RequestTracker {
    storage: StorageLayer,
    recent: Mutex<VecDeque<RequestTrace>>,
    capacity: usize,
    total: AtomicU64,
    failed: AtomicU64,
    in_flight: Arc<AtomicU64>,
    total_duration_ms: AtomicU64,
}

impl RequestTracker {
    pub fn new(storage: StorageLayer) -> Self {
        Self::with_capacity(storage, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(storage: StorageLayer, capacity: usize) -> Self {
        Self {
            storage,
            recent: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            capacity: capacity.max(1),
            total: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            in_flight: Arc::new(AtomicU64::new(0)),
            total_duration_ms: AtomicU64::new(0),
        }
    }

    /// Open a trace with a fresh correlation id
    pub fn begin(
        &self,
        method: &str,
        path: &str,
        client_ip: &str,
        user_agent: Option<&str>,
    ) -> OpenTrace {
        let trace = RequestTrace {
            request_id: Uuid::new_v4().to_string(),
            method: method.to_string(),
            path: path.to_string(),
            client_ip: client_ip.to_string(),
            user_agent: user_agent.map(str::to_string),
            start_time: Utc::now(),
            status_code: None,
            duration_ms: None,
        };
        debug!(request_id = %trace.request_id, "{} {}", trace.method, trace.path);
        OpenTrace {
            trace,
            _in_flight: InFlight::enter(&self.in_flight),
        }
    }

    /// Close a trace, record it, and persist it briefly
    pub async fn finish(&self, open: OpenTrace, status_code: u16) -> RequestTrace {
        let OpenTrace {
            mut trace,
            _in_flight: in_flight,
        } = open;
        drop(in_flight);
        let duration_ms = (Utc::now() - trace.start_time).num_milliseconds().max(0) as u64;
        trace.status_code = Some(status_code);
        trace.duration_ms = Some(duration_ms);

        self.total.fetch_add(1, Ordering::Relaxed);
        self.total_duration_ms.fetch_add(duration_ms, Ordering::Relaxed);
        if status_code >= 500 {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }

        {
            let mut recent = self.recent.lock();
            if recent.len() >= self.capacity {
                recent.pop_front();
            }
            recent.push_back(trace.clone());
        }

        debug!(
            request_id = %trace.request_id,
            status = status_code,
            duration_ms,
            "{} {} completed",
            trace.method,
            trace.path
        );

        let key = format!("{}{}", TRACE_KEY_PREFIX, trace.request_id);
        let ttl = Some(self.storage.trace_ttl());
        let persist = self.storage.put_json(&key, &trace, ttl);
        if let Err(e) = self.storage.bounded("put trace", persist).await {
            warn!("Failed to persist trace {}: {}", trace.request_id, e);
        }
        trace
    }

    /// Most recent finished traces, newest last
    pub fn recent(&self, limit: usize) -> Vec<RequestTrace> {
        let recent = self.recent.lock();
        let skip = recent.len().saturating_sub(limit);
        recent.iter().skip(skip).cloned().collect()
    }

    /// Look up a finished trace in memory, then in the store
    pub async fn get_trace(&self, request_id: &str) -> Option<RequestTrace> {
        let cached = self
            .recent
            .lock()
            .iter()
            .find(|t| t.request_id == request_id)
            .cloned();
        if cached.is_some() {
            return cached;
        }
        let key = format!("{}{}", TRACE_KEY_PREFIX, request_id);
        self.storage.get_json(&key).await.ok().flatten()
    }

    pub fn stats(&self) -> TrackerStats {
        let total = self.total.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let duration = self.total_duration_ms.load(Ordering::Relaxed);
        let (average_duration_ms, error_rate) = if total == 0 {
            (0.0, 0.0)
        } else {
            (
                duration as f64 / total as f64,
                failed as f64 * 100.0 / total as f64,
            )
        };
        TrackerStats {
            total_requests: total,
            failed_requests: failed,
            in_flight: self.in_flight.load(Ordering::Relaxed),
            average_duration_ms,
            error_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_begin_and_finish() {
        let tracker = RequestTracker::new(StorageLayer::in_memory());
        let trace = tracker.begin("GET", "/core/x", "10.0.0.1", Some("curl"));
        assert_eq!(tracker.stats().in_flight, 1);
        assert!(Uuid::parse_str(&trace.request_id).is_ok());

        let finished = tracker.finish(trace, 200).await;
        assert_eq!(finished.status_code, Some(200));
        assert!(finished.duration_ms.is_some());

        let stats = tracker.stats();
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.failed_requests, 0);
    }

    #[tokio::test]
    async fn test_ring_is_bounded() {
        let tracker = RequestTracker::with_capacity(StorageLayer::in_memory(), 2);
        for path in ["/a", "/b", "/c"] {
            let trace = tracker.begin("GET", path, "::1", None);
            tracker.finish(trace, 200).await;
        }
        let paths: Vec<_> = tracker.recent(10).into_iter().map(|t| t.path).collect();
        assert_eq!(paths, vec!["/b", "/c"]);
    }

    #[tokio::test]
    async fn test_trace_is_persisted() {
        let storage = StorageLayer::in_memory();
        let tracker = RequestTracker::with_capacity(storage.clone(), 1);
        let first = tracker.begin("GET", "/a", "::1", None);
        let first_id = first.request_id.clone();
        tracker.finish(first, 502).await;
        let second = tracker.begin("GET", "/b", "::1", None);
        tracker.finish(second, 200).await;

        // Evicted from the ring, still in the store
        let restored = tracker.get_trace(&first_id).await.unwrap();
        assert_eq!(restored.status_code, Some(502));
        assert_eq!(tracker.stats().error_rate, 50.0);
    }

    #[tokio::test]
    async fn test_dropped_trace_leaves_in_flight() {
        let tracker = RequestTracker::new(StorageLayer::in_memory());
        let kept = tracker.begin("GET", "/a", "::1", None);
        let abandoned = tracker.begin("GET", "/b", "::1", None);
        assert_eq!(tracker.stats().in_flight, 2);

        // A cancelled request future drops its trace without finishing it
        drop(abandoned);
        assert_eq!(tracker.stats().in_flight, 1);
        assert_eq!(tracker.stats().total_requests, 0);

        tracker.finish(kept, 200).await;
        assert_eq!(tracker.stats().in_flight, 0);
    }
}
