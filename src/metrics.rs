use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Synchronous generation requests received
pub const SYNC_REQUESTS: &str = "requests.sync";
/// Streaming generation requests received
pub const STREAM_REQUESTS: &str = "requests.stream";
/// Requests refused by the per-client limiter
pub const RATE_LIMITED: &str = "requests.rate_limited";
/// Requests refused before any upstream call
pub const REJECTED: &str = "requests.rejected";
/// READMEs delivered
pub const GENERATED: &str = "readmes.generated";
/// Generations that ended in an error
pub const FAILED: &str = "readmes.failed";
/// Streams whose client disconnected early
pub const CANCELLED: &str = "readmes.cancelled";
/// Generations currently running
pub const IN_FLIGHT: &str = "readmes.in_flight";
/// Duration of the most recent successful generation
pub const LAST_GENERATION: &str = "readmes.last_duration";

/// Collects in-process request metrics
#[derive(Clone, Default)]
pub struct Metrics {
    counters: Arc<RwLock<HashMap<String, u64>>>,
    timers: Arc<RwLock<HashMap<String, Duration>>>,
}

impl Metrics {
    /// Creates a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments a counter metric by 1
    pub async fn increment(&self, key: &str) {
        let mut counters = self.counters.write().await;
        let value = counters.entry(key.to_string()).or_insert(0);
        *value += 1;
        debug!("Incremented counter {}: {}", key, value);
    }

    /// Decrements a counter metric by 1, stopping at zero
    pub async fn decrement(&self, key: &str) {
        let mut counters = self.counters.write().await;
        let value = counters.entry(key.to_string()).or_insert(0);
        *value = value.saturating_sub(1);
        debug!("Decremented counter {}: {}", key, value);
    }

    /// Records a timing metric
    pub async fn record_time(&self, key: &str, duration: Duration) {
        let mut timers = self.timers.write().await;
        timers.insert(key.to_string(), duration);
        debug!("Recorded timer {}: {:?}", key, duration);
    }

    /// Gets the current value of a counter metric
    pub async fn get_counter(&self, key: &str) -> Option<u64> {
        self.counters.read().await.get(key).copied()
    }

    /// Gets the current value of a timer metric
    pub async fn get_timer(&self, key: &str) -> Option<Duration> {
        self.timers.read().await.get(key).copied()
    }

    /// All counters, ordered by name
    pub async fn counters(&self) -> BTreeMap<String, u64> {
        self.counters
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Logs every collected metric
    pub async fn report(&self) {
        info!("=== Metrics Report ===");
        for (k, v) in self.counters().await {
            info!("  {}: {}", k, v);
        }
        for (k, v) in self.timers.read().await.iter() {
            info!("  {}: {:?}", k, v);
        }
    }
}
