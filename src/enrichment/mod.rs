//! Stats enrichment stage

pub mod cache;
pub mod enricher;
pub mod mlb_stats;
pub mod source;

pub use cache::KeyedCache;
pub use enricher::StatsEnricher;
pub use mlb_stats::MlbStatsClient;
pub use source::{PlayerId, PlayerStats, StatsEntry, StatsLookup, StatsSource};
