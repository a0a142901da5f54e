//! Player aggregator and Over/Under category buckets
//!
//! Groups canonical props by exact player display name. Props are never
//! deduplicated here: a prop ingested twice is stored twice.

use crate::types::{BetSide, CanonicalProp, PropCategory};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Per-player rollup of every prop seen in a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerAggregate {
    pub name: String,
    /// Market keys seen for this player, fixed categories or not
    pub categories: BTreeSet<String>,
    /// Props in processing order
    pub props: Vec<CanonicalProp>,
    pub games: BTreeSet<String>,
    pub bookmakers: BTreeSet<String>,
}

impl PlayerAggregate {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Categories seen for this player that belong to the fixed set
    pub fn fixed_categories(&self) -> BTreeSet<PropCategory> {
        self.categories
            .iter()
            .filter_map(|k| PropCategory::from_market_key(k))
            .collect()
    }
}

/// Parallel Over and Under mappings from category to props.
///
/// Every fixed category has an entry, possibly empty.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryBuckets {
    pub over: BTreeMap<PropCategory, Vec<CanonicalProp>>,
    pub under: BTreeMap<PropCategory, Vec<CanonicalProp>>,
}

impl Default for CategoryBuckets {
    fn default() -> Self {
        let empty = || {
            PropCategory::ALL
                .into_iter()
                .map(|c| (c, Vec::new()))
                .collect::<BTreeMap<_, _>>()
        };
        Self {
            over: empty(),
            under: empty(),
        }
    }
}

impl CategoryBuckets {
    pub fn over_count(&self, category: PropCategory) -> usize {
        self.over.get(&category).map_or(0, Vec::len)
    }

    pub fn under_count(&self, category: PropCategory) -> usize {
        self.under.get(&category).map_or(0, Vec::len)
    }

    /// Props across every bucket on both sides
    pub fn total(&self) -> usize {
        self.over.values().chain(self.under.values()).map(Vec::len).sum()
    }

    /// Bucketed props in category order, Over before Under within a category
    pub fn iter_all(&self) -> impl Iterator<Item = &CanonicalProp> {
        PropCategory::ALL.into_iter().flat_map(move |c| {
            self.over
                .get(&c)
                .into_iter()
                .flatten()
                .chain(self.under.get(&c).into_iter().flatten())
        })
    }
}

/// Number of distinct players with a prop in the given category
pub fn players_with_category(
    players: &BTreeMap<String, PlayerAggregate>,
    category: PropCategory,
) -> usize {
    players
        .values()
        .filter(|p| p.categories.contains(category.market_key()))
        .count()
}

/// Accumulates canonical props for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct PropAggregator {
    players: BTreeMap<String, PlayerAggregate>,
    buckets: CategoryBuckets,
    ingested: usize,
}

impl PropAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one prop under its player, and in its Over/Under bucket when
    /// both the side and the category are recognized.
    pub fn ingest(&mut self, prop: CanonicalProp) {
        self.ingested += 1;

        if let Some(category) = prop.category {
            let bucket = match prop.side {
                BetSide::Over => Some(&mut self.buckets.over),
                BetSide::Under => Some(&mut self.buckets.under),
                BetSide::Other(_) => None,
            };
            if let Some(bucket) = bucket {
                bucket.entry(category).or_default().push(prop.clone());
            }
        }

        let player = self
            .players
            .entry(prop.player.clone())
            .or_insert_with(|| PlayerAggregate::new(&prop.player));
        player.categories.insert(prop.market_key.clone());
        player.games.insert(prop.game.clone());
        player.bookmakers.insert(prop.bookmaker.clone());
        player.props.push(prop);
    }

    pub fn ingest_all(&mut self, props: impl IntoIterator<Item = CanonicalProp>) {
        for prop in props {
            self.ingest(prop);
        }
    }

    pub fn players(&self) -> &BTreeMap<String, PlayerAggregate> {
        &self.players
    }

    pub fn player(&self, name: &str) -> Option<&PlayerAggregate> {
        self.players.get(name)
    }

    pub fn buckets(&self) -> &CategoryBuckets {
        &self.buckets
    }

    /// Total props ingested, bucketed or not
    pub fn total_ingested(&self) -> usize {
        self.ingested
    }

    pub fn into_parts(self) -> (BTreeMap<String, PlayerAggregate>, CategoryBuckets) {
        (self.players, self.buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Line;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn prop(player: &str, market_key: &str, side: &str, bookmaker: &str, game: &str) -> CanonicalProp {
        CanonicalProp {
            event_id: "e1".to_string(),
            game: game.to_string(),
            game_time: Utc::now(),
            market_key: market_key.to_string(),
            category: PropCategory::from_market_key(market_key),
            player: player.to_string(),
            side: BetSide::parse(side),
            line: Line::Point(dec!(1.5)),
            odds: -110,
            bookmaker: bookmaker.to_string(),
            last_update: None,
        }
    }

    #[test]
    fn test_over_under_scenario() {
        let mut agg = PropAggregator::new();
        agg.ingest(prop("Player X", "batter_hits", "Over", "DraftKings", "A @ B"));
        agg.ingest(prop("Player X", "batter_hits", "Under", "DraftKings", "A @ B"));

        let player = agg.player("Player X").unwrap();
        assert_eq!(agg.players().len(), 1);
        assert_eq!(player.props.len(), 2);
        assert_eq!(player.categories.len(), 1);
        assert_eq!(player.games.len(), 1);
        assert_eq!(agg.buckets().over_count(PropCategory::BatterHits), 1);
        assert_eq!(agg.buckets().under_count(PropCategory::BatterHits), 1);
    }

    #[test]
    fn test_unknown_category_tracked_but_not_bucketed() {
        let mut agg = PropAggregator::new();
        agg.ingest(prop("Player X", "batter_walks", "Over", "FanDuel", "A @ B"));

        let player = agg.player("Player X").unwrap();
        assert!(player.categories.contains("batter_walks"));
        assert!(player.fixed_categories().is_empty());
        assert_eq!(agg.buckets().total(), 0);
        assert_eq!(agg.total_ingested(), 1);
    }

    #[test]
    fn test_unrecognized_side_not_bucketed() {
        let mut agg = PropAggregator::new();
        agg.ingest(prop("Player X", "batter_hits", "Yes", "FanDuel", "A @ B"));
        assert_eq!(agg.buckets().total(), 0);
        assert_eq!(agg.player("Player X").unwrap().props.len(), 1);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut agg = PropAggregator::new();
        let p = prop("Player X", "batter_hits", "Over", "DraftKings", "A @ B");
        agg.ingest(p.clone());
        agg.ingest(p);
        assert_eq!(agg.player("Player X").unwrap().props.len(), 2);
        assert_eq!(agg.buckets().over_count(PropCategory::BatterHits), 2);
    }

    #[test]
    fn test_player_names_are_case_sensitive() {
        let mut agg = PropAggregator::new();
        agg.ingest(prop("Player X", "batter_hits", "Over", "DraftKings", "A @ B"));
        agg.ingest(prop("player x", "batter_hits", "Over", "DraftKings", "A @ B"));
        assert_eq!(agg.players().len(), 2);
    }

    #[test]
    fn test_sets_accumulate_across_games_and_books() {
        let mut agg = PropAggregator::new();
        agg.ingest(prop("Player X", "batter_hits", "Over", "DraftKings", "A @ B"));
        agg.ingest(prop("Player X", "batter_rbis", "Over", "FanDuel", "A @ B"));
        agg.ingest(prop("Player X", "batter_hits", "Under", "FanDuel", "C @ D"));

        let player = agg.player("Player X").unwrap();
        assert_eq!(player.categories.len(), 2);
        assert_eq!(player.games.len(), 2);
        assert_eq!(player.bookmakers.len(), 2);
        assert_eq!(players_with_category(agg.players(), PropCategory::BatterRbis), 1);
        assert_eq!(players_with_category(agg.players(), PropCategory::BatterHits), 1);
    }

    #[test]
    fn test_bucket_total_never_exceeds_ingested() {
        let mut agg = PropAggregator::new();
        agg.ingest_all(vec![
            prop("A", "batter_hits", "Over", "DK", "G"),
            prop("A", "batter_walks", "Over", "DK", "G"),
            prop("B", "pitcher_outs", "Under", "DK", "G"),
            prop("B", "pitcher_outs", "Push", "DK", "G"),
        ]);
        assert_eq!(agg.buckets().total(), 2);
        assert!(agg.buckets().total() <= agg.total_ingested());
        assert_eq!(agg.buckets().iter_all().count(), 2);
    }

    #[test]
    fn test_every_category_has_a_bucket() {
        let agg = PropAggregator::new();
        assert_eq!(agg.buckets().over.len(), 12);
        assert_eq!(agg.buckets().under.len(), 12);
    }
}
