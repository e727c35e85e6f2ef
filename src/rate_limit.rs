//! Rolling-window rate limiting keyed by route and client address.
//!
//! Each key keeps the instants of its admitted requests inside the current
//! window. A request is admitted while fewer than `max_requests` instants are
//! younger than `window`. Updates for one key happen under that key's
//! `DashMap` shard lock, so concurrent bursts from the same client cannot
//! undercount; distinct keys never share a global lock.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RateKey {
    scope: &'static str,
    client: IpAddr,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    hits: DashMap<RateKey, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            hits: DashMap::new(),
        }
    }

    /// Records a request for `client` on `scope` and returns whether it is
    /// within quota. Rejected requests are not recorded.
    pub fn try_acquire(&self, scope: &'static str, client: IpAddr) -> bool {
        self.try_acquire_at(scope, client, Instant::now())
    }

    fn try_acquire_at(&self, scope: &'static str, client: IpAddr, now: Instant) -> bool {
        let mut entry = self.hits.entry(RateKey { scope, client }).or_default();
        let log = entry.value_mut();
        evict_expired(log, now, self.config.window);
        if log.len() >= self.config.max_requests {
            return false;
        }
        log.push_back(now);
        true
    }

    /// Drops keys whose window has fully elapsed. Called periodically so the
    /// map does not grow with every address ever seen.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let window = self.config.window;
        self.hits.retain(|_, log| {
            evict_expired(log, now, window);
            !log.is_empty()
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.hits.len()
    }
}

fn evict_expired(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = log.front() {
        if now.duration_since(*front) >= window {
            log.pop_front();
        } else {
            break;
        }
    }
}
