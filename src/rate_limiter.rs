use crate::config::RateLimitConfig;
use axum::http::HeaderMap;
use lru::LruCache;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Identifier used when a request carries no forwarding header
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Admits at most `max_requests` per client within a trailing window
///
/// Each client keeps the instants of its admitted requests. Instants older
/// than the window are purged on every check. The table holds at most
/// `max_clients` identifiers, and only identifiers with no request left in
/// the window are ever evicted. A new client arriving while every slot is
/// still active is refused.
pub struct SlidingWindowLimiter {
    window: Duration,
    max_requests: usize,
    clients: Mutex<LruCache<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    /// Creates a limiter remembering at most `max_clients` identifiers
    pub fn new(window: Duration, max_requests: usize, max_clients: usize) -> Self {
        let capacity = NonZeroUsize::new(max_clients).unwrap_or(NonZeroUsize::MIN);
        Self {
            window,
            max_requests,
            clients: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Creates a limiter from configuration
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window(), config.max_requests, config.max_clients)
    }

    /// Records a request for `client` now, returning whether it is admitted
    pub async fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now()).await
    }

    /// Records a request for `client` at `now`, returning whether it is admitted
    pub async fn check_at(&self, client: &str, now: Instant) -> bool {
        let mut clients = self.clients.lock().await;
        if !clients.contains(client) && !self.make_room(&mut clients, now) {
            warn!("Client table full, refusing new client {}", client);
            return false;
        }
        let requests = clients.get_or_insert_mut(client.to_string(), VecDeque::new);

        while let Some(&oldest) = requests.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                requests.pop_front();
            } else {
                break;
            }
        }

        if requests.len() >= self.max_requests {
            warn!("Rate limit exceeded for client {}", client);
            return false;
        }

        requests.push_back(now);
        debug!(
            "Admitted request for {} ({}/{} in window)",
            client,
            requests.len(),
            self.max_requests
        );
        true
    }

    /// Frees a slot by dropping identifiers whose window has fully elapsed
    fn make_room(&self, clients: &mut LruCache<String, VecDeque<Instant>>, now: Instant) -> bool {
        if clients.len() < clients.cap().get() {
            return true;
        }

        let stale: Vec<String> = clients
            .iter()
            .filter(|(_, requests)| {
                requests
                    .back()
                    .map_or(true, |&newest| now.saturating_duration_since(newest) >= self.window)
            })
            .map(|(client, _)| client.clone())
            .collect();

        for client in &stale {
            clients.pop(client);
        }
        debug!("Evicted {} idle clients from the rate-limit table", stale.len());

        clients.len() < clients.cap().get()
    }

    /// Number of client identifiers currently remembered
    pub async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.len()
    }
}

/// Derives the rate-limit key from the first `x-forwarded-for` value
pub fn client_identifier(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
