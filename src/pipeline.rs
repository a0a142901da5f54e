//! Sequential ingestion: event listing → per-event fetch → normalize → aggregate
//!
//! One event at a time, paced by a fixed delay. A failed event contributes
//! zero props and the loop moves on; only a failed listing aborts the run.

use crate::aggregator::PropAggregator;
use crate::config::OddsConfig;
use crate::error::PipelineError;
use crate::normalizer::normalize_event_odds;
use crate::odds_client::OddsSource;
use crate::services::metrics::Metrics;
use crate::services::retry::{with_retry, RetryConfig};
use crate::types::{Event, PropCategory};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Knobs for the ingestion loop
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Pause between successive event fetches, skipped after the last one
    pub delay_between_events: Duration,
    /// Only process the first N listed events
    pub max_events: Option<usize>,
    pub retry: RetryConfig,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self::from(&OddsConfig::default())
    }
}

impl From<&OddsConfig> for IngestionConfig {
    fn from(config: &OddsConfig) -> Self {
        Self {
            delay_between_events: Duration::from_millis(config.request_delay_ms),
            max_events: config.max_events,
            retry: RetryConfig::fixed(config.fetch_max_attempts, config.fetch_retry_delay_ms),
        }
    }
}

/// What happened to one event during ingestion
#[derive(Debug, Clone, Serialize)]
pub struct EventOutcome {
    pub event_id: String,
    pub matchup: String,
    /// Props ingested from this event (0 when the fetch failed)
    pub props: usize,
    pub malformed: usize,
    /// Fixed categories the response actually contained
    pub categories: BTreeSet<PropCategory>,
    pub fetch_failed: bool,
}

/// Result of a completed ingestion run
#[derive(Debug)]
pub struct IngestionOutput {
    pub events: Vec<Event>,
    pub outcomes: Vec<EventOutcome>,
    pub aggregator: PropAggregator,
}

impl IngestionOutput {
    pub fn failed_events(&self) -> usize {
        self.outcomes.iter().filter(|o| o.fetch_failed).count()
    }
}

/// Drives the ingestion loop against an odds source
pub struct PropPipeline {
    source: Arc<dyn OddsSource>,
    config: IngestionConfig,
    metrics: Metrics,
}

impl PropPipeline {
    pub fn new(source: Arc<dyn OddsSource>, config: IngestionConfig, metrics: Metrics) -> Self {
        Self {
            source,
            config,
            metrics,
        }
    }

    /// Run ingestion to completion.
    ///
    /// Fails only with `SourceUnavailable`.
    pub async fn run(&self) -> Result<IngestionOutput, PipelineError> {
        info!("Target prop categories: {}", PropCategory::markets_param(&PropCategory::ALL));

        let mut events = self
            .source
            .list_events()
            .await
            .map_err(|e| PipelineError::SourceUnavailable(e.to_string()))?;

        self.metrics.add_events_listed(events.len() as u64);

        if let Some(max) = self.config.max_events {
            events.truncate(max);
            info!("Processing first {} events", events.len());
        }

        if events.is_empty() {
            warn!("No events found");
        }

        let mut aggregator = PropAggregator::new();
        let mut outcomes = Vec::with_capacity(events.len());
        let total = events.len();

        for (i, event) in events.iter().enumerate() {
            info!("[{}/{}] Processing: {}", i + 1, total, event.matchup());

            let outcome = self.ingest_event(event, &mut aggregator).await;
            outcomes.push(outcome);
            self.metrics.inc_events_processed();

            if i + 1 < total && !self.config.delay_between_events.is_zero() {
                tokio::time::sleep(self.config.delay_between_events).await;
            }
        }

        info!(
            "Completed: processed {} events, {} unique players, {} props",
            total,
            aggregator.players().len(),
            aggregator.total_ingested()
        );

        Ok(IngestionOutput {
            events,
            outcomes,
            aggregator,
        })
    }

    async fn ingest_event(&self, event: &Event, aggregator: &mut PropAggregator) -> EventOutcome {
        let operation = format!("fetch markets for {}", event.id);
        let fetched = with_retry(&self.config.retry, &operation, || {
            self.metrics.inc_fetch_attempts();
            self.source.fetch_markets(&event.id, &PropCategory::ALL)
        })
        .await;

        let odds = match fetched {
            Ok(odds) => odds,
            Err(exhausted) => {
                let err = PipelineError::EventFetchFailed {
                    event_id: event.id.clone(),
                    attempts: exhausted.attempts,
                    message: exhausted.last_error.to_string(),
                };
                warn!("{}", err);
                self.metrics.inc_events_failed();
                return EventOutcome {
                    event_id: event.id.clone(),
                    matchup: event.matchup(),
                    props: 0,
                    malformed: 0,
                    categories: BTreeSet::new(),
                    fetch_failed: true,
                };
            }
        };

        let normalized = normalize_event_odds(event, &odds);
        let categories = normalized.matching_categories();
        let props = normalized.props.len();
        let malformed = normalized.malformed.len();

        self.metrics.add_props_normalized(props as u64);
        self.metrics.add_outcomes_malformed(malformed as u64);

        if categories.is_empty() {
            info!("   No props data available");
        } else {
            info!(
                "   Found {} categories: {}",
                categories.len(),
                categories.iter().map(|c| c.market_key()).collect::<Vec<_>>().join(", ")
            );
        }

        aggregator.ingest_all(normalized.props);

        EventOutcome {
            event_id: event.id.clone(),
            matchup: event.matchup(),
            props,
            malformed,
            categories,
            fetch_failed: false,
        }
    }
}
