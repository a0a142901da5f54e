//! Rate Limiter - token bucket for the stats API
//!
//! The public MLB stats API does not publish hard limits, so the enrichment
//! stage spends from a configurable bucket (default 40 requests per 10
//! seconds) shared by every worker.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::debug;

/// A single token bucket
struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl TokenBucket {
    fn new(max_requests: u32, window: Duration) -> Self {
        let max = max_requests.max(1) as f64;
        let window_secs = window.as_secs_f64().max(0.001);
        Self {
            tokens: max,
            max_tokens: max,
            refill_rate: max / window_secs,
            last_refill: Instant::now(),
        }
    }

    /// Refill tokens based on elapsed time
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    /// Try to consume one token. Returns true if successful.
    fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until one token is available
    fn time_until_available(&mut self) -> Duration {
        self.refill();
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            let deficit = 1.0 - self.tokens;
            Duration::from_secs_f64(deficit / self.refill_rate)
        }
    }
}

/// Cloneable handle to one shared token bucket
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<TokenBucket>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            bucket: Arc::new(Mutex::new(TokenBucket::new(max_requests, window))),
        }
    }

    /// Acquire a token, waiting if necessary.
    /// Returns true if we had to wait (i.e., were rate limited).
    pub async fn acquire(&self) -> bool {
        let mut waited = false;
        loop {
            let wait_time = {
                let mut b = self.bucket.lock().await;
                if b.try_acquire() {
                    return waited;
                }
                b.time_until_available()
            };

            waited = true;
            debug!("Rate limiter: waiting {:?}", wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }
}
