//! Report hand-off
//!
//! `ReportData` is the plain data a report renderer consumes: events, the
//! per-category Over/Under buckets, the player aggregates and the stats
//! results. The derived views below are what the CLI prints.

use crate::aggregator::{players_with_category, CategoryBuckets, PlayerAggregate};
use crate::enrichment::StatsEntry;
use crate::pipeline::{EventOutcome, IngestionOutput};
use crate::services::metrics::MetricsSnapshot;
use crate::types::{BetSide, CanonicalProp, Event, PropCategory};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// Sample props listed per player before truncating
const SAMPLE_PROPS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub events: Vec<Event>,
    pub event_outcomes: Vec<EventOutcome>,
    /// Serialized as top-level `over` and `under` maps
    #[serde(flatten)]
    pub buckets: CategoryBuckets,
    pub players: BTreeMap<String, PlayerAggregate>,
    pub stats: Vec<StatsEntry>,
    pub metrics: MetricsSnapshot,
}

/// Per-category row of the Over/Under summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: PropCategory,
    pub over: usize,
    pub under: usize,
    pub total: usize,
    pub players: usize,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Balance {
    OverHeavy,
    UnderHeavy,
    Balanced,
    NoData,
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Balance::OverHeavy => "Over Heavy",
            Balance::UnderHeavy => "Under Heavy",
            Balance::Balanced => "Balanced",
            Balance::NoData => "No Data",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceRow {
    pub category: PropCategory,
    pub over: usize,
    pub under: usize,
    /// Share of Over props, 0 when the category is empty
    pub over_pct: f64,
    pub balance: Balance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRow {
    pub name: String,
    pub category_count: usize,
    pub prop_count: usize,
    pub game_count: usize,
    pub bookmakers: Vec<String>,
    pub categories: Vec<String>,
    pub sample: String,
}

/// A quoted line measured against the player's recent games
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineComparison {
    pub player: String,
    pub category: PropCategory,
    pub side: BetSide,
    pub line: Decimal,
    pub games: usize,
    pub over: usize,
    pub under: usize,
    pub push: usize,
    /// Fraction of recent games that cleared the prop's side
    pub hit_rate: Option<f64>,
}

impl ReportData {
    pub fn new(output: IngestionOutput, stats: Vec<StatsEntry>, metrics: MetricsSnapshot) -> Self {
        let (players, buckets) = output.aggregator.into_parts();
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            events: output.events,
            event_outcomes: output.outcomes,
            buckets,
            players,
            stats,
            metrics,
        }
    }

    pub fn total_over(&self) -> usize {
        self.buckets.over.values().map(Vec::len).sum()
    }

    pub fn total_under(&self) -> usize {
        self.buckets.under.values().map(Vec::len).sum()
    }

    pub fn category_summary(&self) -> Vec<CategorySummary> {
        PropCategory::ALL
            .into_iter()
            .map(|category| {
                let over = self.buckets.over_count(category);
                let under = self.buckets.under_count(category);
                let players = players_with_category(&self.players, category);
                CategorySummary {
                    category,
                    over,
                    under,
                    total: over + under,
                    players,
                    active: over + under > 0,
                }
            })
            .collect()
    }

    pub fn balance(&self) -> Vec<BalanceRow> {
        PropCategory::ALL
            .into_iter()
            .map(|category| {
                let over = self.buckets.over_count(category);
                let under = self.buckets.under_count(category);
                let total = over + under;
                let (over_pct, balance) = if total == 0 {
                    (0.0, Balance::NoData)
                } else {
                    let pct = over as f64 / total as f64 * 100.0;
                    let balance = match over.cmp(&under) {
                        std::cmp::Ordering::Greater => Balance::OverHeavy,
                        std::cmp::Ordering::Less => Balance::UnderHeavy,
                        std::cmp::Ordering::Equal => Balance::Balanced,
                    };
                    (pct, balance)
                };
                BalanceRow {
                    category,
                    over,
                    under,
                    over_pct,
                    balance,
                }
            })
            .collect()
    }

    /// Players sorted by name, with the first few props as a sample
    pub fn player_rows(&self) -> Vec<PlayerRow> {
        self.players
            .values()
            .map(|p| {
                let mut sample = p
                    .props
                    .iter()
                    .take(SAMPLE_PROPS)
                    .map(CanonicalProp::short_label)
                    .collect::<Vec<_>>()
                    .join("; ");
                if p.props.len() > SAMPLE_PROPS {
                    sample.push_str(&format!(" ... (+{} more)", p.props.len() - SAMPLE_PROPS));
                }
                PlayerRow {
                    name: p.name.clone(),
                    category_count: p.categories.len(),
                    prop_count: p.props.len(),
                    game_count: p.games.len(),
                    bookmakers: p.bookmakers.iter().cloned().collect(),
                    categories: p.categories.iter().cloned().collect(),
                    sample,
                }
            })
            .collect()
    }

    /// Distinct (player, category, side, line) quotes compared against the
    /// player's recent values. Quotes without a line or without recent
    /// games are left out.
    pub fn line_comparisons(&self) -> Vec<LineComparison> {
        let recent: HashMap<(&str, PropCategory), &[f64]> = self
            .stats
            .iter()
            .filter_map(|e| {
                let stats = e.result.stats()?;
                (!stats.recent.values.is_empty())
                    .then(|| ((e.player.as_str(), e.category), stats.recent.values.as_slice()))
            })
            .collect();

        let mut seen = BTreeSet::new();
        let mut rows = Vec::new();

        for prop in self.buckets.iter_all() {
            let (Some(category), Some(line)) = (prop.category, prop.line.point()) else {
                continue;
            };
            let Some(values) = recent.get(&(prop.player.as_str(), category)) else {
                continue;
            };
            if !seen.insert((prop.player.clone(), category, prop.side.to_string(), line.normalize())) {
                continue;
            }
            let Some(threshold) = line.to_f64() else {
                continue;
            };

            let over = values.iter().filter(|v| **v > threshold).count();
            let under = values.iter().filter(|v| **v < threshold).count();
            let push = values.len() - over - under;
            let hits = match prop.side {
                BetSide::Over => Some(over),
                BetSide::Under => Some(under),
                BetSide::Other(_) => None,
            };

            rows.push(LineComparison {
                player: prop.player.clone(),
                category,
                side: prop.side.clone(),
                line,
                games: values.len(),
                over,
                under,
                push,
                hit_rate: hits.map(|h| h as f64 / values.len() as f64),
            });
        }

        rows
    }

    /// Share of (player, category) pairs that resolved to stats
    pub fn stats_coverage(&self) -> (usize, usize) {
        let found = self.stats.iter().filter(|e| e.result.is_found()).count();
        (found, self.stats.len())
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        Ok(())
    }
}
