//! Run counters for the ingestion and enrichment stages

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point-in-time copy of the run counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Events returned by the listing call
    pub events_listed: u64,
    /// Events walked by the ingestion loop
    pub events_processed: u64,
    /// Events whose market fetch exhausted its retries
    pub events_failed: u64,
    /// Individual market fetch attempts
    pub fetch_attempts: u64,
    pub props_normalized: u64,
    pub outcomes_malformed: u64,
    /// Upstream stats calls actually issued (cache misses)
    pub player_lookups: u64,
    pub stats_fetches: u64,
    pub game_log_fetches: u64,
    pub lookup_failures: u64,
    /// Stats requests that had to wait on the rate limiter
    pub stats_rate_limited: u64,
}

/// Thread-safe metrics collector
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    events_listed: AtomicU64,
    events_processed: AtomicU64,
    events_failed: AtomicU64,
    fetch_attempts: AtomicU64,
    props_normalized: AtomicU64,
    outcomes_malformed: AtomicU64,
    player_lookups: AtomicU64,
    stats_fetches: AtomicU64,
    game_log_fetches: AtomicU64,
    lookup_failures: AtomicU64,
    stats_rate_limited: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_events_listed(&self, n: u64) {
        self.inner.events_listed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_events_processed(&self) {
        self.inner.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_events_failed(&self) {
        self.inner.events_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fetch_attempts(&self) {
        self.inner.fetch_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_props_normalized(&self, n: u64) {
        self.inner.props_normalized.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_outcomes_malformed(&self, n: u64) {
        self.inner.outcomes_malformed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_player_lookups(&self) {
        self.inner.player_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_stats_fetches(&self) {
        self.inner.stats_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_game_log_fetches(&self) {
        self.inner.game_log_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_lookup_failures(&self) {
        self.inner.lookup_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_stats_rate_limited(&self) {
        self.inner.stats_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_listed: self.inner.events_listed.load(Ordering::Relaxed),
            events_processed: self.inner.events_processed.load(Ordering::Relaxed),
            events_failed: self.inner.events_failed.load(Ordering::Relaxed),
            fetch_attempts: self.inner.fetch_attempts.load(Ordering::Relaxed),
            props_normalized: self.inner.props_normalized.load(Ordering::Relaxed),
            outcomes_malformed: self.inner.outcomes_malformed.load(Ordering::Relaxed),
            player_lookups: self.inner.player_lookups.load(Ordering::Relaxed),
            stats_fetches: self.inner.stats_fetches.load(Ordering::Relaxed),
            game_log_fetches: self.inner.game_log_fetches.load(Ordering::Relaxed),
            lookup_failures: self.inner.lookup_failures.load(Ordering::Relaxed),
            stats_rate_limited: self.inner.stats_rate_limited.load(Ordering::Relaxed),
        }
    }
}
