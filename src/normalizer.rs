//! Prop normalizer: raw bookmaker outcomes into canonical prop records

use crate::error::PipelineError;
use crate::odds_client::{EventOdds, RawOutcome};
use crate::types::{BetSide, CanonicalProp, Event, Line, PropCategory};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::warn;

/// Player name used when an outcome carries no description
pub const UNKNOWN_PLAYER: &str = "Unknown";

/// Market-level context shared by every outcome in one bookmaker market
#[derive(Debug, Clone, Copy)]
pub struct MarketContext<'a> {
    pub bookmaker: &'a str,
    pub market_key: &'a str,
    pub last_update: Option<DateTime<Utc>>,
}

/// Convert one raw outcome into a canonical prop.
///
/// Pure: identical inputs always give an identical record. Market keys
/// outside the fixed categories still normalize, with `category: None`.
pub fn normalize(
    event: &Event,
    market: MarketContext<'_>,
    outcome: &RawOutcome,
) -> Result<CanonicalProp, PipelineError> {
    let malformed = |field| PipelineError::MalformedOutcome {
        event_id: event.id.clone(),
        bookmaker: market.bookmaker.to_string(),
        market_key: market.market_key.to_string(),
        field,
    };

    let side = outcome
        .name
        .as_deref()
        .map(BetSide::parse)
        .ok_or_else(|| malformed("name"))?;

    let odds = outcome
        .price
        .filter(|p| p.is_finite())
        .map(|p| p.round() as i32)
        .ok_or_else(|| malformed("price"))?;

    let player = outcome
        .description
        .clone()
        .unwrap_or_else(|| UNKNOWN_PLAYER.to_string());

    Ok(CanonicalProp {
        event_id: event.id.clone(),
        game: event.matchup(),
        game_time: event.commence_time,
        market_key: market.market_key.to_string(),
        category: PropCategory::from_market_key(market.market_key),
        player,
        side,
        line: Line::from(outcome.point),
        odds,
        bookmaker: market.bookmaker.to_string(),
        last_update: market.last_update,
    })
}

/// Everything normalized out of one event's odds response
#[derive(Debug, Clone, Default)]
pub struct NormalizedEvent {
    /// Props in bookmaker → market → outcome order
    pub props: Vec<CanonicalProp>,
    /// Outcomes skipped because a required field was missing
    pub malformed: Vec<PipelineError>,
    /// Every market key the response contained
    pub markets_seen: BTreeSet<String>,
}

impl NormalizedEvent {
    /// Market keys seen that belong to the fixed category set
    pub fn matching_categories(&self) -> BTreeSet<PropCategory> {
        self.markets_seen
            .iter()
            .filter_map(|k| PropCategory::from_market_key(k))
            .collect()
    }
}

/// Walk a whole response. A malformed outcome is logged and skipped;
/// its siblings in the same market are still processed.
pub fn normalize_event_odds(event: &Event, odds: &EventOdds) -> NormalizedEvent {
    let mut result = NormalizedEvent::default();

    for bookmaker in &odds.bookmakers {
        let bookmaker_update = parse_timestamp(bookmaker.last_update.as_deref());

        for market in &bookmaker.markets {
            result.markets_seen.insert(market.key.clone());

            let context = MarketContext {
                bookmaker: bookmaker.name(),
                market_key: &market.key,
                last_update: parse_timestamp(market.last_update.as_deref()).or(bookmaker_update),
            };

            for outcome in &market.outcomes {
                match normalize(event, context, outcome) {
                    Ok(prop) => result.props.push(prop),
                    Err(err) => {
                        warn!("{}", err);
                        result.malformed.push(err);
                    }
                }
            }
        }
    }

    result
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds_client::{RawBookmaker, RawMarket};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn event() -> Event {
        Event {
            id: "e1".to_string(),
            home_team: "B".to_string(),
            away_team: "A".to_string(),
            commence_time: Utc.with_ymd_and_hms(2025, 6, 1, 17, 5, 0).unwrap(),
        }
    }

    fn outcome(name: &str, player: &str, point: Option<rust_decimal::Decimal>, price: Option<f64>) -> RawOutcome {
        RawOutcome {
            name: Some(name.to_string()),
            description: Some(player.to_string()),
            point,
            price,
        }
    }

    fn context(market_key: &str) -> MarketContext<'_> {
        MarketContext {
            bookmaker: "DraftKings",
            market_key,
            last_update: None,
        }
    }

    #[test]
    fn test_normalize_maps_fields() {
        let prop = normalize(
            &event(),
            context("batter_hits"),
            &outcome("over", "Player X", Some(dec!(1.5)), Some(-120.0)),
        )
        .unwrap();

        assert_eq!(prop.player, "Player X");
        assert_eq!(prop.side, BetSide::Over);
        assert_eq!(prop.line, Line::Point(dec!(1.5)));
        assert_eq!(prop.odds, -120);
        assert_eq!(prop.game, "A @ B");
        assert_eq!(prop.category, Some(PropCategory::BatterHits));
        assert_eq!(prop.bookmaker, "DraftKings");
    }

    #[test]
    fn test_normalize_defaults() {
        let raw = RawOutcome {
            name: Some("Under".to_string()),
            description: None,
            point: None,
            price: Some(105.0),
        };
        let prop = normalize(&event(), context("batter_hits"), &raw).unwrap();
        assert_eq!(prop.player, UNKNOWN_PLAYER);
        assert_eq!(prop.line, Line::NotAvailable);
        assert_eq!(prop.line.to_string(), "N/A");
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let raw = outcome("Over", "Player X", Some(dec!(0.5)), Some(150.0));
        let a = normalize(&event(), context("batter_home_runs"), &raw).unwrap();
        let b = normalize(&event(), context("batter_home_runs"), &raw).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_market_still_normalizes() {
        let prop = normalize(
            &event(),
            context("batter_walks"),
            &outcome("Over", "Player X", Some(dec!(0.5)), Some(200.0)),
        )
        .unwrap();
        assert_eq!(prop.category, None);
        assert_eq!(prop.market_key, "batter_walks");
        assert!(!prop.is_bucketed());
    }

    #[test]
    fn test_missing_price_is_malformed() {
        let err = normalize(
            &event(),
            context("batter_hits"),
            &outcome("Over", "Player X", Some(dec!(1.5)), None),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedOutcome { field: "price", .. }));
    }

    #[test]
    fn test_malformed_outcome_does_not_drop_siblings() {
        let odds = EventOdds {
            id: Some("e1".to_string()),
            bookmakers: vec![RawBookmaker {
                key: "fanduel".to_string(),
                title: "FanDuel".to_string(),
                last_update: Some("2025-06-01T12:00:00Z".to_string()),
                markets: vec![RawMarket {
                    key: "pitcher_strikeouts".to_string(),
                    last_update: None,
                    outcomes: vec![
                        outcome("Over", "Pitcher P", Some(dec!(6.5)), Some(-110.0)),
                        outcome("Under", "Pitcher P", Some(dec!(6.5)), None),
                        outcome("Under", "Pitcher Q", Some(dec!(4.5)), Some(-105.0)),
                    ],
                }],
            }],
        };

        let normalized = normalize_event_odds(&event(), &odds);
        assert_eq!(normalized.props.len(), 2);
        assert_eq!(normalized.malformed.len(), 1);
        assert_eq!(
            normalized.matching_categories().into_iter().collect::<Vec<_>>(),
            vec![PropCategory::PitcherStrikeouts]
        );
        // market has no timestamp, so the bookmaker's is used
        assert_eq!(
            normalized.props[0].last_update,
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
        );
    }
}
