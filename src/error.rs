//! Error taxonomy for a pipeline run
//!
//! Only `SourceUnavailable` ever escapes a run. The other kinds are built at
//! the point of failure, logged, counted and then degraded to partial data.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// The initial event listing failed; no events means no work.
    #[error("odds source unavailable: {0}")]
    SourceUnavailable(String),

    /// One event's market fetch failed on every attempt.
    #[error("market fetch for event {event_id} failed after {attempts} attempts: {message}")]
    EventFetchFailed {
        event_id: String,
        attempts: u32,
        message: String,
    },

    /// A stats or identity lookup failed for one player.
    #[error("{lookup} lookup failed for {player}: {message}")]
    EnrichmentLookupFailed {
        player: String,
        lookup: &'static str,
        message: String,
    },

    /// A raw outcome was missing a required field.
    #[error("malformed outcome from {bookmaker} in {market_key} (event {event_id}): missing {field}")]
    MalformedOutcome {
        event_id: String,
        bookmaker: String,
        market_key: String,
        field: &'static str,
    },
}
