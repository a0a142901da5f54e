//! Stats enrichment over the aggregated player set
//!
//! Three caches, each single-flight per key:
//! - player identity, keyed by canonical name (a miss is cached as `None`)
//! - stats, keyed by (player id, category)
//! - game logs, keyed by player id
//!
//! A failed upstream call degrades to a cached "not found" for its key and
//! never stops the batch.

use crate::aggregator::PlayerAggregate;
use crate::config::EnrichmentConfig;
use crate::enrichment::cache::KeyedCache;
use crate::enrichment::source::{
    GameLogs, PlayerId, PlayerStats, RecentForm, StatsEntry, StatsLookup, StatsSource,
};
use crate::error::PipelineError;
use crate::identity::PlayerKey;
use crate::normalizer::UNKNOWN_PLAYER;
use crate::services::metrics::Metrics;
use crate::types::PropCategory;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct StatsEnricher {
    source: Arc<dyn StatsSource>,
    player_ids: KeyedCache<PlayerKey, Option<PlayerId>>,
    stats: KeyedCache<(PlayerId, PropCategory), StatsLookup>,
    game_logs: KeyedCache<PlayerId, Option<Arc<GameLogs>>>,
    config: EnrichmentConfig,
    metrics: Metrics,
}

impl StatsEnricher {
    pub fn new(source: Arc<dyn StatsSource>, config: EnrichmentConfig, metrics: Metrics) -> Self {
        Self {
            source,
            player_ids: KeyedCache::new(),
            stats: KeyedCache::new(),
            game_logs: KeyedCache::new(),
            config,
            metrics,
        }
    }

    /// Stats for one player and category. Never fails: every upstream
    /// problem ends as `StatsLookup::NotFound`.
    pub async fn get_stats(&self, player_name: &str, category: PropCategory) -> StatsLookup {
        // the normalizer's placeholder names nobody
        if player_name == UNKNOWN_PLAYER {
            return StatsLookup::NotFound;
        }

        let key = PlayerKey::from_display_name(player_name);
        if key.is_empty() {
            return StatsLookup::NotFound;
        }

        let Some(player_id) = self.resolve_player(&key, player_name).await else {
            return StatsLookup::NotFound;
        };

        self.stats
            .get_or_fetch((player_id, category), || {
                self.fetch_stats(player_name, player_id, category)
            })
            .await
    }

    /// Enrich every (player, fixed category) pair the aggregator saw using
    /// at most `workers` players in flight. Rows come back sorted by player
    /// then category.
    pub async fn enrich(&self, players: &BTreeMap<String, PlayerAggregate>) -> Vec<StatsEntry> {
        let workers = self.config.workers.max(1);
        let pairs: usize = players.values().map(|p| p.fixed_categories().len()).sum();

        info!(
            "Enriching {} players ({} player/category pairs) with {} workers",
            players.len(),
            pairs,
            workers
        );

        let mut entries: Vec<StatsEntry> = stream::iter(players.values())
            .map(|player| self.enrich_player(player))
            .buffer_unordered(workers)
            .flat_map(|entries| stream::iter(entries))
            .collect()
            .await;

        entries.sort_by(|a, b| a.player.cmp(&b.player).then(a.category.cmp(&b.category)));

        let found = entries.iter().filter(|e| e.result.is_found()).count();
        info!(
            "Enrichment complete: {}/{} pairs found, {} identities cached",
            found,
            entries.len(),
            self.player_ids.len().await
        );

        entries
    }

    async fn enrich_player(&self, player: &PlayerAggregate) -> Vec<StatsEntry> {
        let mut entries = Vec::new();
        for category in player.fixed_categories() {
            let result = self.get_stats(&player.name, category).await;
            entries.push(StatsEntry {
                player: player.name.clone(),
                category,
                result,
            });
        }
        entries
    }

    async fn resolve_player(&self, key: &PlayerKey, player_name: &str) -> Option<PlayerId> {
        self.player_ids
            .get_or_fetch(key.clone(), || async {
                self.metrics.inc_player_lookups();
                match self.source.lookup_player(key, player_name).await {
                    Ok(Some(id)) => {
                        debug!("Resolved {} to player id {}", player_name, id);
                        Some(id)
                    }
                    Ok(None) => {
                        debug!("No stats identity for {}", player_name);
                        None
                    }
                    Err(e) => {
                        self.record_failure(player_name, "identity", e);
                        None
                    }
                }
            })
            .await
    }

    async fn fetch_stats(
        &self,
        player_name: &str,
        player_id: PlayerId,
        category: PropCategory,
    ) -> StatsLookup {
        self.metrics.inc_stats_fetches();

        let season = match self.source.season_stats(player_id, category).await {
            Ok(season) => season,
            Err(e) => {
                self.record_failure(player_name, "season stats", e);
                return StatsLookup::NotFound;
            }
        };

        let recent = match self.logs_for(player_name, player_id).await {
            Some(logs) => RecentForm::from_logs(&logs, category, self.config.recent_games),
            None => RecentForm::default(),
        };

        if season.is_none() && recent.values.is_empty() {
            return StatsLookup::NotFound;
        }

        StatsLookup::Found(PlayerStats {
            player_id,
            category,
            season,
            recent,
        })
    }

    async fn logs_for(&self, player_name: &str, player_id: PlayerId) -> Option<Arc<GameLogs>> {
        self.game_logs
            .get_or_fetch(player_id, || async {
                self.metrics.inc_game_log_fetches();
                match self.source.game_logs(player_id).await {
                    Ok(logs) => Some(Arc::new(logs)),
                    Err(e) => {
                        self.record_failure(player_name, "game log", e);
                        None
                    }
                }
            })
            .await
    }

    fn record_failure(&self, player_name: &str, lookup: &'static str, err: anyhow::Error) {
        let err = PipelineError::EnrichmentLookupFailed {
            player: player_name.to_string(),
            lookup,
            message: format!("{:#}", err),
        };
        warn!("{}", err);
        self.metrics.inc_lookup_failures();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::PropAggregator;
    use crate::enrichment::source::{GameLine, SeasonStats, StatLine};
    use crate::types::{BetSide, CanonicalProp, Line};
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Knows "aaron judge" (id 99), "broken bat" (id 13, whose stats
    /// calls fail) and a real "unknown" (id 7). Lookups for "flaky lookup" error.
    #[derive(Default)]
    struct FakeStats {
        lookups: AtomicU32,
        season_calls: AtomicU32,
        log_calls: AtomicU32,
    }

    #[async_trait]
    impl StatsSource for FakeStats {
        async fn lookup_player(&self, key: &PlayerKey, _display_name: &str) -> anyhow::Result<Option<PlayerId>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            match key.as_str() {
                "aaron judge" => Ok(Some(PlayerId(99))),
                "broken bat" => Ok(Some(PlayerId(13))),
                "unknown" => Ok(Some(PlayerId(7))),
                "flaky lookup" => anyhow::bail!("search timed out"),
                _ => Ok(None),
            }
        }

        async fn season_stats(
            &self,
            player: PlayerId,
            category: PropCategory,
        ) -> anyhow::Result<Option<SeasonStats>> {
            self.season_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            if player == PlayerId(13) {
                anyhow::bail!("HTTP 503");
            }
            let line = StatLine {
                games_played: Some(10.0),
                hits: Some(12.0),
                home_runs: Some(4.0),
                ..Default::default()
            };
            Ok(SeasonStats::from_line(2025, category, &line))
        }

        async fn game_logs(&self, _player: PlayerId) -> anyhow::Result<GameLogs> {
            self.log_calls.fetch_add(1, Ordering::SeqCst);
            let game = |day, hits| GameLine {
                date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
                stat: StatLine {
                    hits: Some(hits),
                    home_runs: Some(0.0),
                    ..Default::default()
                },
            };
            Ok(GameLogs {
                hitting: vec![game(3, 2.0), game(2, 1.0), game(1, 0.0)],
                pitching: vec![],
            })
        }
    }

    fn enricher(source: Arc<FakeStats>, workers: usize) -> StatsEnricher {
        StatsEnricher::new(
            source,
            EnrichmentConfig {
                workers,
                recent_games: 2,
                ..Default::default()
            },
            Metrics::new(),
        )
    }

    fn players(entries: &[(&str, &str)]) -> BTreeMap<String, PlayerAggregate> {
        let mut agg = PropAggregator::new();
        for (player, market_key) in entries {
            agg.ingest(CanonicalProp {
                event_id: "e1".to_string(),
                game: "A @ B".to_string(),
                game_time: Utc::now(),
                market_key: market_key.to_string(),
                category: PropCategory::from_market_key(market_key),
                player: player.to_string(),
                side: BetSide::Over,
                line: Line::Point(dec!(0.5)),
                odds: -110,
                bookmaker: "DraftKings".to_string(),
                last_update: None,
            });
        }
        agg.into_parts().0
    }

    #[tokio::test]
    async fn test_found_stats_carry_season_and_recent_form() {
        let source = Arc::new(FakeStats::default());
        let result = enricher(source, 4)
            .get_stats("Aaron Judge", PropCategory::BatterHits)
            .await;

        let stats = result.stats().unwrap();
        assert_eq!(stats.player_id, PlayerId(99));
        assert_eq!(stats.season.as_ref().unwrap().total, 12.0);
        assert_eq!(stats.recent.values, vec![2.0, 1.0]);
        assert_eq!(stats.recent.average, Some(1.5));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_fetch_once() {
        let source = Arc::new(FakeStats::default());
        let enricher = Arc::new(enricher(source.clone(), 4));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let enricher = enricher.clone();
            handles.push(tokio::spawn(async move {
                enricher.get_stats("Aaron Judge", PropCategory::BatterHomeRuns).await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert!(results.iter().all(|r| *r == results[0]));
        assert!(results[0].is_found());
        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(source.season_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.log_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_name_variants_share_one_identity_lookup() {
        let source = Arc::new(FakeStats::default());
        let enricher = enricher(source.clone(), 2);

        let a = enricher.get_stats("Aaron Judge", PropCategory::BatterHits).await;
        let b = enricher.get_stats("AARON JUDGE", PropCategory::BatterHits).await;

        assert_eq!(a, b);
        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(source.season_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unresolved_player_is_cached_not_found() {
        let source = Arc::new(FakeStats::default());
        let enricher = enricher(source.clone(), 2);

        for _ in 0..3 {
            let result = enricher.get_stats("Unknown Rookie", PropCategory::BatterHits).await;
            assert_eq!(result, StatsLookup::NotFound);
        }
        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(source.season_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_placeholder_player_is_never_looked_up() {
        let source = Arc::new(FakeStats::default());
        let enricher = enricher(source.clone(), 2);

        let entries = enricher
            .enrich(&players(&[(UNKNOWN_PLAYER, "batter_hits"), ("Aaron Judge", "batter_hits")]))
            .await;

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].player, "Aaron Judge");
        assert!(entries[0].result.is_found());
        assert_eq!(entries[1].player, UNKNOWN_PLAYER);
        assert_eq!(entries[1].result, StatsLookup::NotFound);
        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let source = Arc::new(FakeStats::default());
        let enricher = enricher(source.clone(), 3);

        let entries = enricher
            .enrich(&players(&[
                ("Aaron Judge", "batter_hits"),
                ("Aaron Judge", "batter_home_runs"),
                ("Aaron Judge", "batter_walks"),
                ("Broken Bat", "batter_hits"),
                ("Flaky Lookup", "batter_rbis"),
            ]))
            .await;

        let summary: Vec<(&str, PropCategory, bool)> = entries
            .iter()
            .map(|e| (e.player.as_str(), e.category, e.result.is_found()))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("Aaron Judge", PropCategory::BatterHomeRuns, true),
                ("Aaron Judge", PropCategory::BatterHits, true),
                ("Broken Bat", PropCategory::BatterHits, false),
                ("Flaky Lookup", PropCategory::BatterRbis, false),
            ]
        );

        let snap = enricher.metrics.snapshot();
        assert_eq!(snap.lookup_failures, 2);
        assert_eq!(snap.player_lookups, 3);
    }

    #[tokio::test]
    async fn test_empty_player_set() {
        let source = Arc::new(FakeStats::default());
        let entries = enricher(source.clone(), 4).enrich(&BTreeMap::new()).await;
        assert!(entries.is_empty());
        assert_eq!(source.lookups.load(Ordering::SeqCst), 0);
    }
}
