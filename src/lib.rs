//! MLB Player Props Pipeline Library
//!
//! Collects MLB player prop lines from a sports-odds API and stages them for
//! reporting:
//!
//! 1. **Ingestion**: list the day's events, fetch each event's prop markets
//!    one at a time with retries and pacing, normalize every outcome and
//!    aggregate by player and by Over/Under category bucket.
//!
//! 2. **Enrichment**: resolve each aggregated player to season and recent
//!    game statistics through single-flight caches and a bounded worker pool.

pub mod aggregator;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod identity;
pub mod normalizer;
pub mod odds_client;
pub mod pipeline;
pub mod report;
pub mod services;
pub mod types;

pub use aggregator::{CategoryBuckets, PlayerAggregate, PropAggregator};
pub use config::Config;
pub use enrichment::{MlbStatsClient, StatsEnricher, StatsLookup, StatsSource};
pub use error::PipelineError;
pub use identity::PlayerKey;
pub use odds_client::{OddsApiClient, OddsSource};
pub use pipeline::{IngestionConfig, IngestionOutput, PropPipeline};
pub use report::ReportData;
pub use types::{BetSide, CanonicalProp, Event, Line, PropCategory};
