use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::config::{ConfigError, LimiterConfig};
use crate::error::ApiError;

type Bucket = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

struct ClientEntry {
    bucket: Bucket,
    last_seen: Instant,
}

struct Inner {
    enabled: bool,
    quota: Quota,
    sweep_interval: Duration,
    idle_ttl: Duration,
    clients: Mutex<HashMap<String, ClientEntry>>,
}

/// Token bucket per client identity, shared between the request path and
/// the idle sweep.
#[derive(Clone)]
pub struct ClientRateLimiter {
    inner: Arc<Inner>,
}

impl ClientRateLimiter {
    pub fn new(settings: &LimiterConfig) -> Result<Self, ConfigError> {
        let period = settings.replenish_period()?;
        let burst = NonZeroU32::new(settings.burst).ok_or(ConfigError::InvalidLimiterBurst)?;
        let quota = Quota::with_period(period)
            .ok_or(ConfigError::InvalidLimiterRate(settings.rps))?
            .allow_burst(burst);

        Ok(Self {
            inner: Arc::new(Inner {
                enabled: settings.enabled,
                quota,
                sweep_interval: Duration::from_secs(settings.sweep_interval_secs.max(1)),
                idle_ttl: Duration::from_secs(settings.idle_ttl_secs),
                clients: Mutex::new(HashMap::new()),
            }),
        })
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<String, ClientEntry>> {
        self.inner.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enabled(&self) -> bool {
        self.inner.enabled
    }

    /// Spend one token for `identity`. New clients start with a full bucket.
    pub fn allow(&self, identity: &str) -> bool {
        if !self.inner.enabled {
            return true;
        }

        let mut clients = self.clients();
        let entry = clients.entry(identity.to_string()).or_insert_with(|| ClientEntry {
            bucket: RateLimiter::direct(self.inner.quota),
            last_seen: Instant::now(),
        });
        entry.last_seen = Instant::now();
        entry.bucket.check().is_ok()
    }

    /// Drop every client not seen for longer than the idle window. Returns how many went.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let idle_ttl = self.inner.idle_ttl;
        let mut clients = self.clients();
        let before = clients.len();
        clients.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= idle_ttl);
        before - clients.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients().len()
    }

    /// Start the periodic idle sweep. The handle is aborted at shutdown.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.inner.sweep_interval);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = limiter.evict_idle(Instant::now());
                if evicted > 0 {
                    debug!(evicted, remaining = limiter.tracked_clients(), "evicted idle rate limiter entries");
                }
            }
        })
    }
}

/// Rate limiting middleware keyed by the peer IP address
pub async fn rate_limit(
    State(limiter): State<ClientRateLimiter>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    if limiter.enabled() {
        let identity = connect_info
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if !limiter.allow(&identity) {
            debug!(client = %identity, "rate limit exceeded");
            return ApiError::RateLimitExceeded.into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(rps: f64, burst: u32) -> LimiterConfig {
        LimiterConfig {
            enabled: true,
            rps,
            burst,
            sweep_interval_secs: 60,
            idle_ttl_secs: 180,
        }
    }

    #[test]
    fn allows_burst_then_rejects() {
        let limiter = ClientRateLimiter::new(&settings(1.0, 4)).unwrap();
        for _ in 0..4 {
            assert!(limiter.allow("10.0.0.1"));
        }
        assert!(!limiter.allow("10.0.0.1"));
        // other clients have their own bucket
        assert!(limiter.allow("10.0.0.2"));
    }

    #[test]
    fn replenishes_at_the_configured_rate() {
        let limiter = ClientRateLimiter::new(&settings(20.0, 1)).unwrap();
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        std::thread::sleep(Duration::from_millis(120));
        assert!(limiter.allow("a"));
    }

    #[test]
    fn disabled_limiter_tracks_nothing() {
        let mut config = settings(1.0, 1);
        config.enabled = false;
        let limiter = ClientRateLimiter::new(&config).unwrap();
        for _ in 0..10 {
            assert!(limiter.allow("a"));
        }
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn rejects_unusable_settings() {
        assert!(matches!(
            ClientRateLimiter::new(&settings(0.0, 1)),
            Err(ConfigError::InvalidLimiterRate(_))
        ));
        // one request per 1e300 seconds overflows Duration
        assert!(matches!(
            ClientRateLimiter::new(&settings(1e-300, 1)),
            Err(ConfigError::InvalidLimiterRate(_))
        ));
        assert!(matches!(
            ClientRateLimiter::new(&settings(1.0, 0)),
            Err(ConfigError::InvalidLimiterBurst)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_entries_are_evicted_and_recreated_full() {
        let limiter = ClientRateLimiter::new(&settings(0.01, 2)).unwrap();
        assert!(limiter.allow("a"));
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));

        assert_eq!(limiter.evict_idle(Instant::now() + Duration::from_secs(180)), 0);
        assert_eq!(limiter.evict_idle(Instant::now() + Duration::from_secs(181)), 1);
        assert_eq!(limiter.tracked_clients(), 0);

        // a recreated entry starts with a full bucket
        assert!(limiter.allow("a"));
        assert!(limiter.allow("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_in_the_background() {
        let limiter = ClientRateLimiter::new(&settings(1.0, 1)).unwrap();
        limiter.allow("a");
        let sweeper = limiter.spawn_sweeper();

        tokio::time::sleep(Duration::from_secs(150)).await;
        limiter.allow("b");
        assert_eq!(limiter.tracked_clients(), 2);

        // "a" is past the window at the 240s sweep, "b" is not
        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(limiter.tracked_clients(), 1);

        sweeper.abort();
    }
}
