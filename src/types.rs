//! Core types for the MLB props pipeline

use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of prop markets the pipeline tracks.
///
/// This is the only place the category list is declared; the normalizer,
/// the aggregator buckets and the stats enrichment all read from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropCategory {
    BatterHomeRuns,
    BatterHits,
    BatterTotalBases,
    BatterRbis,
    BatterRunsScored,
    BatterHitsRunsRbis,
    BatterSingles,
    BatterStrikeouts,
    PitcherStrikeouts,
    PitcherHitsAllowed,
    PitcherEarnedRuns,
    PitcherOuts,
}

/// Which stat group a category is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatGroup {
    Hitting,
    Pitching,
}

impl StatGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatGroup::Hitting => "hitting",
            StatGroup::Pitching => "pitching",
        }
    }
}

impl PropCategory {
    pub const ALL: [PropCategory; 12] = [
        PropCategory::BatterHomeRuns,
        PropCategory::BatterHits,
        PropCategory::BatterTotalBases,
        PropCategory::BatterRbis,
        PropCategory::BatterRunsScored,
        PropCategory::BatterHitsRunsRbis,
        PropCategory::BatterSingles,
        PropCategory::BatterStrikeouts,
        PropCategory::PitcherStrikeouts,
        PropCategory::PitcherHitsAllowed,
        PropCategory::PitcherEarnedRuns,
        PropCategory::PitcherOuts,
    ];

    /// Market key as used by the odds API
    pub fn market_key(&self) -> &'static str {
        match self {
            PropCategory::BatterHomeRuns => "batter_home_runs",
            PropCategory::BatterHits => "batter_hits",
            PropCategory::BatterTotalBases => "batter_total_bases",
            PropCategory::BatterRbis => "batter_rbis",
            PropCategory::BatterRunsScored => "batter_runs_scored",
            PropCategory::BatterHitsRunsRbis => "batter_hits_runs_rbis",
            PropCategory::BatterSingles => "batter_singles",
            PropCategory::BatterStrikeouts => "batter_strikeouts",
            PropCategory::PitcherStrikeouts => "pitcher_strikeouts",
            PropCategory::PitcherHitsAllowed => "pitcher_hits_allowed",
            PropCategory::PitcherEarnedRuns => "pitcher_earned_runs",
            PropCategory::PitcherOuts => "pitcher_outs",
        }
    }

    /// Look up a market key. Keys outside the fixed set return `None`.
    pub fn from_market_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.market_key() == key)
    }

    /// Human-readable name, e.g. "Batter Home Runs"
    pub fn display_name(&self) -> String {
        self.market_key()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn stat_group(&self) -> StatGroup {
        match self {
            PropCategory::PitcherStrikeouts
            | PropCategory::PitcherHitsAllowed
            | PropCategory::PitcherEarnedRuns
            | PropCategory::PitcherOuts => StatGroup::Pitching,
            _ => StatGroup::Hitting,
        }
    }

    /// Comma-separated `markets` query parameter
    pub fn markets_param(categories: &[PropCategory]) -> String {
        categories
            .iter()
            .map(|c| c.market_key())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for PropCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.market_key())
    }
}

impl FromStr for PropCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_market_key(s).ok_or_else(|| format!("unknown prop category: {}", s))
    }
}

/// Direction of a prop bet relative to its line.
///
/// Anything other than over/under is preserved verbatim so the prop can
/// still be tracked under its player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetSide {
    Over,
    Under,
    Other(String),
}

impl BetSide {
    /// Case-insensitive parse of a raw outcome name
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("over") {
            BetSide::Over
        } else if raw.eq_ignore_ascii_case("under") {
            BetSide::Under
        } else {
            BetSide::Other(raw.to_string())
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, BetSide::Other(_))
    }
}

impl fmt::Display for BetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetSide::Over => write!(f, "Over"),
            BetSide::Under => write!(f, "Under"),
            BetSide::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// Quoted line value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Line {
    Point(Decimal),
    NotAvailable,
}

impl Line {
    pub fn point(&self) -> Option<Decimal> {
        match self {
            Line::Point(p) => Some(*p),
            Line::NotAvailable => None,
        }
    }
}

impl From<Option<Decimal>> for Line {
    fn from(point: Option<Decimal>) -> Self {
        point.map(Line::Point).unwrap_or(Line::NotAvailable)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Point(p) => write!(f, "{}", p.normalize()),
            Line::NotAvailable => write!(f, "N/A"),
        }
    }
}

/// Price format requested from the odds API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddsFormat {
    American,
    Decimal,
}

impl OddsFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OddsFormat::American => "american",
            OddsFormat::Decimal => "decimal",
        }
    }

    /// Convert a quoted price in this format to signed American odds
    pub fn to_american(&self, price: f64) -> Option<i32> {
        if !price.is_finite() {
            return None;
        }
        match self {
            OddsFormat::American => Some(price.round() as i32),
            OddsFormat::Decimal => {
                if price <= 1.0 {
                    None
                } else if price >= 2.0 {
                    Some(((price - 1.0) * 100.0).round() as i32)
                } else {
                    Some((-100.0 / (price - 1.0)).round() as i32)
                }
            }
        }
    }
}

impl FromStr for OddsFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "american" => Ok(OddsFormat::American),
            "decimal" => Ok(OddsFormat::Decimal),
            other => Err(format!("unsupported odds format: {}", other)),
        }
    }
}

/// One scheduled game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
}

impl Event {
    /// Game label, "away @ home"
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }

    /// Start time in US Eastern, the zone MLB schedules are published in
    pub fn local_start(&self) -> DateTime<Tz> {
        self.commence_time.with_timezone(&New_York)
    }
}

/// One bookmaker's quoted line for one player, market and side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProp {
    pub event_id: String,
    pub game: String,
    pub game_time: DateTime<Utc>,
    /// Raw market key, kept even when it is not one of the fixed categories
    pub market_key: String,
    pub category: Option<PropCategory>,
    pub player: String,
    pub side: BetSide,
    pub line: Line,
    /// American odds
    pub odds: i32,
    pub bookmaker: String,
    pub last_update: Option<DateTime<Utc>>,
}

impl CanonicalProp {
    /// Whether this prop belongs in an Over/Under category bucket
    pub fn is_bucketed(&self) -> bool {
        self.category.is_some() && self.side.is_recognized()
    }

    /// Short description used in summaries, e.g. "batter_hits Over 1.5"
    pub fn short_label(&self) -> String {
        format!("{} {} {}", self.market_key, self.side, self.line)
    }
}
