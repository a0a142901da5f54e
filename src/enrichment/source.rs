//! Stats source seam and the stat value types it produces

use crate::identity::PlayerKey;
use crate::types::{PropCategory, StatGroup};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream stats-source player identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where historical player statistics come from.
///
/// Errors are returned as-is; the enricher decides how they degrade.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Resolve a player to an upstream id. `Ok(None)` means no match.
    async fn lookup_player(&self, key: &PlayerKey, display_name: &str) -> Result<Option<PlayerId>>;

    /// Season totals for the category's stat group, `Ok(None)` if the player
    /// has no line for it this season
    async fn season_stats(&self, player: PlayerId, category: PropCategory) -> Result<Option<SeasonStats>>;

    /// Per-game lines for the season, newest first
    async fn game_logs(&self, player: PlayerId) -> Result<GameLogs>;
}

/// Raw stat line as the MLB Stats API reports it (season or single game)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatLine {
    pub games_played: Option<f64>,
    pub home_runs: Option<f64>,
    pub hits: Option<f64>,
    pub total_bases: Option<f64>,
    pub rbi: Option<f64>,
    pub runs: Option<f64>,
    pub doubles: Option<f64>,
    pub triples: Option<f64>,
    pub strike_outs: Option<f64>,
    pub earned_runs: Option<f64>,
    pub outs: Option<f64>,
    /// Baseball notation, "6.2" is six and two-thirds innings
    pub innings_pitched: Option<String>,
}

impl StatLine {
    fn outs_recorded(&self) -> Option<f64> {
        self.outs.or_else(|| {
            let ip = self.innings_pitched.as_deref()?;
            let (whole, partial) = ip.split_once('.').unwrap_or((ip, "0"));
            let whole: f64 = whole.trim().parse().ok()?;
            let partial: f64 = partial.trim().parse().ok()?;
            Some(whole * 3.0 + partial)
        })
    }
}

impl PropCategory {
    /// The figure this category measures, read from a stat line of its group
    pub fn value_from(&self, line: &StatLine) -> Option<f64> {
        match self {
            PropCategory::BatterHomeRuns => line.home_runs,
            PropCategory::BatterHits | PropCategory::PitcherHitsAllowed => line.hits,
            PropCategory::BatterTotalBases => line.total_bases.or_else(|| {
                let hits = line.hits?;
                let doubles = line.doubles.unwrap_or(0.0);
                let triples = line.triples.unwrap_or(0.0);
                let home_runs = line.home_runs.unwrap_or(0.0);
                Some(hits + doubles + 2.0 * triples + 3.0 * home_runs)
            }),
            PropCategory::BatterRbis => line.rbi,
            PropCategory::BatterRunsScored => line.runs,
            PropCategory::BatterHitsRunsRbis => Some(line.hits? + line.runs? + line.rbi?),
            PropCategory::BatterSingles => {
                let hits = line.hits?;
                let extra = line.doubles.unwrap_or(0.0)
                    + line.triples.unwrap_or(0.0)
                    + line.home_runs.unwrap_or(0.0);
                Some((hits - extra).max(0.0))
            }
            PropCategory::BatterStrikeouts | PropCategory::PitcherStrikeouts => line.strike_outs,
            PropCategory::PitcherEarnedRuns => line.earned_runs,
            PropCategory::PitcherOuts => line.outs_recorded(),
        }
    }
}

/// Season totals for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonStats {
    pub season: i32,
    pub games_played: u32,
    pub total: f64,
    pub per_game: Option<f64>,
}

impl SeasonStats {
    /// Build from a season stat line; `None` when the line lacks the category
    pub fn from_line(season: i32, category: PropCategory, line: &StatLine) -> Option<Self> {
        let total = category.value_from(line)?;
        let games_played = line.games_played.unwrap_or(0.0).max(0.0) as u32;
        let per_game = (games_played > 0).then(|| total / games_played as f64);
        Some(Self {
            season,
            games_played,
            total,
            per_game,
        })
    }
}

/// One game's stat line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameLine {
    pub date: NaiveDate,
    pub stat: StatLine,
}

/// Season game logs, each group newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameLogs {
    pub hitting: Vec<GameLine>,
    pub pitching: Vec<GameLine>,
}

impl GameLogs {
    pub fn group(&self, group: StatGroup) -> &[GameLine] {
        match group {
            StatGroup::Hitting => &self.hitting,
            StatGroup::Pitching => &self.pitching,
        }
    }
}

/// A category's values over the most recent games
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecentForm {
    /// Newest first
    pub values: Vec<f64>,
    pub average: Option<f64>,
}

impl RecentForm {
    pub fn from_logs(logs: &GameLogs, category: PropCategory, games: usize) -> Self {
        let values: Vec<f64> = logs
            .group(category.stat_group())
            .iter()
            .filter_map(|g| category.value_from(&g.stat))
            .take(games)
            .collect();

        let average = (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64);

        Self { values, average }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStats {
    pub player_id: PlayerId,
    pub category: PropCategory,
    pub season: Option<SeasonStats>,
    pub recent: RecentForm,
}

/// Outcome of a stats lookup; a failure is never surfaced past this
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatsLookup {
    Found(PlayerStats),
    NotFound,
}

impl StatsLookup {
    pub fn is_found(&self) -> bool {
        matches!(self, StatsLookup::Found(_))
    }

    pub fn stats(&self) -> Option<&PlayerStats> {
        match self {
            StatsLookup::Found(stats) => Some(stats),
            StatsLookup::NotFound => None,
        }
    }
}

/// One (player, category) enrichment result for the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsEntry {
    pub player: String,
    pub category: PropCategory,
    pub result: StatsLookup,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hitting_line() -> StatLine {
        StatLine {
            games_played: Some(50.0),
            home_runs: Some(15.0),
            hits: Some(60.0),
            rbi: Some(40.0),
            runs: Some(45.0),
            doubles: Some(10.0),
            triples: Some(1.0),
            strike_outs: Some(55.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_derived_hitting_values() {
        let line = hitting_line();
        assert_eq!(PropCategory::BatterHitsRunsRbis.value_from(&line), Some(145.0));
        assert_eq!(PropCategory::BatterSingles.value_from(&line), Some(34.0));
        // 60 + 10 + 2 + 45
        assert_eq!(PropCategory::BatterTotalBases.value_from(&line), Some(117.0));
    }

    #[test]
    fn test_reported_total_bases_wins() {
        let line = StatLine {
            total_bases: Some(120.0),
            ..hitting_line()
        };
        assert_eq!(PropCategory::BatterTotalBases.value_from(&line), Some(120.0));
    }

    #[test]
    fn test_outs_from_innings_pitched() {
        let line = StatLine {
            innings_pitched: Some("6.2".to_string()),
            ..Default::default()
        };
        assert_eq!(PropCategory::PitcherOuts.value_from(&line), Some(20.0));

        let whole = StatLine {
            innings_pitched: Some("5".to_string()),
            ..Default::default()
        };
        assert_eq!(PropCategory::PitcherOuts.value_from(&whole), Some(15.0));
    }

    #[test]
    fn test_missing_component_is_none() {
        let line = StatLine {
            hits: Some(1.0),
            ..Default::default()
        };
        assert_eq!(PropCategory::BatterHitsRunsRbis.value_from(&line), None);
        assert_eq!(PropCategory::PitcherEarnedRuns.value_from(&line), None);
    }

    #[test]
    fn test_stat_line_deserializes_camel_case() {
        let line: StatLine = serde_json::from_value(serde_json::json!({
            "gamesPlayed": 12,
            "strikeOuts": 80,
            "inningsPitched": "70.1",
            "avg": ".250"
        }))
        .unwrap();
        assert_eq!(line.strike_outs, Some(80.0));
        assert_eq!(PropCategory::PitcherOuts.value_from(&line), Some(211.0));
    }

    #[test]
    fn test_season_per_game() {
        let season = SeasonStats::from_line(2025, PropCategory::BatterHomeRuns, &hitting_line()).unwrap();
        assert_eq!(season.games_played, 50);
        assert_eq!(season.per_game, Some(0.3));
    }

    #[test]
    fn test_recent_form_takes_newest_games() {
        let game = |day: u32, hits: f64| GameLine {
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            stat: StatLine {
                hits: Some(hits),
                ..Default::default()
            },
        };
        let logs = GameLogs {
            hitting: vec![game(5, 2.0), game(4, 0.0), game(3, 1.0), game(2, 3.0)],
            pitching: vec![],
        };

        let form = RecentForm::from_logs(&logs, PropCategory::BatterHits, 3);
        assert_eq!(form.values, vec![2.0, 0.0, 1.0]);
        assert_eq!(form.average, Some(1.0));

        let pitching = RecentForm::from_logs(&logs, PropCategory::PitcherHitsAllowed, 3);
        assert!(pitching.values.is_empty());
        assert_eq!(pitching.average, None);
    }
}
