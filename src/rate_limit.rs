use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::{DashMap, mapref::entry::Entry};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;

use crate::metrics::{RATE_LIMITED_TOTAL, RATE_LIMIT_CLIENTS, REQUEST_TOTAL};
use crate::models::MessageResponse;
use crate::state::AppState;

pub const DEFAULT_MAX_REQUESTS: u32 = 16;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

// Rate limit entry - tracks requests per IP/key
#[derive(Debug, Clone, Copy)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
    pub last_seen: Instant,
}

impl RateLimitEntry {
    fn fresh(now: Instant) -> Self {
        Self {
            count: 1,
            window_start: now,
            last_seen: now,
        }
    }
}

/// Fixed-window admission control keyed by client identity.
///
/// Every request counts toward its client's window, rejected ones included,
/// so a client that keeps hammering stays throttled until the window lapses.
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    max_requests: u32,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn admit(&self, client: &str) -> bool {
        self.admit_at(client, Instant::now())
    }

    /// Records one request from `client` at `now` and decides whether it is allowed.
    ///
    /// The entry guard holds the shard lock for the whole read-decide-write,
    /// so concurrent requests from one client cannot lose increments.
    pub fn admit_at(&self, client: &str, now: Instant) -> bool {
        match self.entries.entry(client.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(RateLimitEntry::fresh(now));
                true
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();

                // window expired..? Reset it
                if now.saturating_duration_since(entry.window_start) > self.window {
                    *entry = RateLimitEntry::fresh(now);
                    return true;
                }

                entry.count = entry.count.saturating_add(1);
                entry.last_seen = now;
                entry.count <= self.max_requests
            }
        }
    }

    /// Drops clients whose window has lapsed and who have been quiet for a full window.
    /// Returns how many entries were removed.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let window = self.window;
        let is_stale = |entry: &RateLimitEntry| {
            now.saturating_duration_since(entry.window_start) > window
                && now.saturating_duration_since(entry.last_seen) >= window
        };

        let candidates: Vec<String> = self
            .entries
            .iter()
            .filter(|item| is_stale(item.value()))
            .map(|item| item.key().clone())
            .collect();

        // remove_if re-checks under the shard lock; a client that came back
        // between collection and removal keeps its entry
        candidates
            .into_iter()
            .filter(|key| self.entries.remove_if(key, |_, entry| is_stale(entry)).is_some())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn entry(&self, client: &str) -> Option<RateLimitEntry> {
        self.entries.get(client).map(|entry| *entry)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

// Sweeper loop - evicts idle clients so the map stays bounded by active callers
pub async fn run_sweeper(limiter: Arc<RateLimiter>, every: Duration) {
    let mut ticker = interval(every);

    tracing::info!(interval = ?every, "Rate limit sweeper started");

    loop {
        ticker.tick().await;

        let evicted = limiter.sweep_expired(Instant::now());
        RATE_LIMIT_CLIENTS.set(limiter.len() as f64);

        if evicted > 0 {
            tracing::debug!(evicted, remaining = limiter.len(), "Swept idle rate limit entries");
        }
    }
}

/// Client identity for a request: the peer IP, or "unknown" when the server
/// was started without connect info.
pub fn client_key(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    REQUEST_TOTAL.inc();
    let client = client_key(&request);

    if state.rate_limiter.admit(&client) {
        return next.run(request).await;
    }

    RATE_LIMITED_TOTAL.inc();
    tracing::warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");

    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(MessageResponse::new("Too many request, please try again later")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let limiter = RateLimiter::default();
        let start = Instant::now();

        for i in 0..16 {
            assert!(limiter.admit_at("10.0.0.1", start + Duration::from_secs(i)));
        }

        // 17th and later stay rejected while the window is open
        assert!(!limiter.admit_at("10.0.0.1", start + Duration::from_secs(20)));
        assert!(!limiter.admit_at("10.0.0.1", start + Duration::from_secs(600)));
        assert_eq!(limiter.entry("10.0.0.1").unwrap().count, 18);
    }

    #[test]
    fn window_reset_after_expiry() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.admit_at("client", start));
        assert!(limiter.admit_at("client", start));
        assert!(!limiter.admit_at("client", start));

        // exactly one window later is still inside it
        assert!(!limiter.admit_at("client", start + Duration::from_secs(60)));

        let later = start + Duration::from_secs(61);
        assert!(limiter.admit_at("client", later));

        let entry = limiter.entry("client").unwrap();
        assert_eq!(entry.count, 1);
        assert_eq!(entry.window_start, later);
    }

    #[test]
    fn clients_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.admit_at("a", now));
        assert!(!limiter.admit_at("a", now));
        assert!(limiter.admit_at("b", now));
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn concurrent_requests_never_over_admit() {
        let limiter = Arc::new(RateLimiter::default());

        let admitted: usize = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let limiter = Arc::clone(&limiter);
                    scope.spawn(move || (0..25).filter(|_| limiter.admit("shared")).count())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(admitted, 16);
        assert_eq!(limiter.entry("shared").unwrap().count, 200);
    }

    #[test]
    fn concurrent_distinct_clients_do_not_interfere() {
        let limiter = Arc::new(RateLimiter::new(5, Duration::from_secs(60)));

        thread::scope(|scope| {
            for client in ["a", "b", "c", "d"] {
                let limiter = Arc::clone(&limiter);
                scope.spawn(move || {
                    for _ in 0..5 {
                        assert!(limiter.admit(client));
                    }
                });
            }
        });

        for client in ["a", "b", "c", "d"] {
            assert_eq!(limiter.entry(client).unwrap().count, 5);
        }
    }

    #[test]
    fn sweep_removes_only_idle_expired_entries() {
        let limiter = RateLimiter::new(16, Duration::from_secs(60));
        let start = Instant::now();

        limiter.admit_at("idle", start);
        limiter.admit_at("active", start);
        limiter.admit_at("active", start + Duration::from_secs(50));

        let now = start + Duration::from_secs(90);
        assert_eq!(limiter.sweep_expired(now), 1);
        assert!(limiter.entry("idle").is_none());
        assert!(limiter.entry("active").is_some());

        assert_eq!(limiter.sweep_expired(start + Duration::from_secs(200)), 1);
        assert!(limiter.is_empty());
    }

    #[test]
    fn sweep_keeps_fresh_windows() {
        let limiter = RateLimiter::default();
        let now = Instant::now();
        limiter.admit_at("10.1.1.1", now);

        assert_eq!(limiter.sweep_expired(now + Duration::from_secs(5)), 0);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn client_key_falls_back_without_connect_info() {
        let request = Request::builder().uri("/report").body(Body::empty()).unwrap();
        assert_eq!(client_key(&request), "unknown");

        let mut request = Request::builder().uri("/report").body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 7], 4242))));
        assert_eq!(client_key(&request), "192.168.1.7");
    }
}
