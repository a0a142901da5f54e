//! Shared plumbing for the pipeline stages

pub mod metrics;
pub mod odds_errors;
pub mod rate_limiter;
pub mod retry;

pub use metrics::{Metrics, MetricsSnapshot};
pub use odds_errors::UpstreamError;
pub use rate_limiter::RateLimiter;
pub use retry::{with_retry, RetryConfig, RetryExhausted};
