//! Odds source client for The Odds API
//!
//! Two calls matter to the pipeline: the event listing for the sport, and
//! the per-event odds for a set of player prop markets.

use crate::config::{OddsApi, OddsConfig};
use crate::services::odds_errors::UpstreamError;
use crate::types::{Event, OddsFormat, PropCategory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

/// Where events and prop markets come from.
///
/// The pipeline only talks to this trait so tests can substitute a
/// scripted source.
#[async_trait]
pub trait OddsSource: Send + Sync {
    /// List the scheduled events for the configured sport
    async fn list_events(&self) -> Result<Vec<Event>, UpstreamError>;

    /// Fetch the bookmaker odds for the given prop categories of one event
    async fn fetch_markets(
        &self,
        event_id: &str,
        categories: &[PropCategory],
    ) -> Result<EventOdds, UpstreamError>;
}

/// Event listing entry from the API
#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    home_team: String,
    away_team: String,
    commence_time: DateTime<Utc>,
}

/// Per-event odds response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventOdds {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub bookmakers: Vec<RawBookmaker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBookmaker {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub markets: Vec<RawMarket>,
}

impl RawBookmaker {
    /// Display title, or the bookmaker key when the title is missing
    pub fn name(&self) -> &str {
        if self.title.is_empty() {
            &self.key
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMarket {
    pub key: String,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub outcomes: Vec<RawOutcome>,
}

/// One quoted outcome. For player props `description` carries the player
/// and `name` the side.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawOutcome {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub point: Option<Decimal>,
    #[serde(default)]
    pub price: Option<f64>,
}

impl EventOdds {
    /// Rewrite every price into American odds.
    /// Prices that cannot be converted are dropped, which makes the outcome malformed.
    pub fn into_american(mut self, format: OddsFormat) -> Self {
        if format == OddsFormat::American {
            return self;
        }
        for bookmaker in &mut self.bookmakers {
            for market in &mut bookmaker.markets {
                for outcome in &mut market.outcomes {
                    outcome.price = outcome
                        .price
                        .and_then(|p| format.to_american(p))
                        .map(f64::from);
                }
            }
        }
        self
    }

    /// Total number of outcomes across bookmakers and markets
    pub fn outcome_count(&self) -> usize {
        self.bookmakers
            .iter()
            .flat_map(|b| b.markets.iter())
            .map(|m| m.outcomes.len())
            .sum()
    }
}

/// HTTP client for The Odds API
pub struct OddsApiClient {
    client: Client,
    api_key: String,
    config: OddsConfig,
}

impl OddsApiClient {
    pub fn new(api_key: String, config: OddsConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            config,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, UpstreamError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .query(&[("apiKey", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| UpstreamError::from_network_error(&e))?;

        log_quota(&response);

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_response(status.as_u16(), &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[async_trait]
impl OddsSource for OddsApiClient {
    async fn list_events(&self) -> Result<Vec<Event>, UpstreamError> {
        let url = OddsApi::events_url(&self.config.base_url, &self.config.sport_key);
        let raw: Vec<RawEvent> = self.get_json(&url, &[]).await?;

        info!("Found {} {} events", raw.len(), self.config.sport_key);

        Ok(raw
            .into_iter()
            .map(|e| Event {
                id: e.id,
                home_team: e.home_team,
                away_team: e.away_team,
                commence_time: e.commence_time,
            })
            .collect())
    }

    async fn fetch_markets(
        &self,
        event_id: &str,
        categories: &[PropCategory],
    ) -> Result<EventOdds, UpstreamError> {
        let url = OddsApi::event_odds_url(&self.config.base_url, &self.config.sport_key, event_id);
        let markets = PropCategory::markets_param(categories);

        let odds: EventOdds = self
            .get_json(
                &url,
                &[
                    ("regions", self.config.regions.as_str()),
                    ("markets", markets.as_str()),
                    ("oddsFormat", self.config.odds_format.as_str()),
                ],
            )
            .await?;

        debug!(
            "Event {}: {} bookmakers, {} outcomes",
            event_id,
            odds.bookmakers.len(),
            odds.outcome_count()
        );

        Ok(odds.into_american(self.config.odds_format))
    }
}

fn log_quota(response: &Response) {
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    if let Some(remaining) = header("x-requests-remaining") {
        debug!(
            "Odds API requests remaining: {} (used: {})",
            remaining,
            header("x-requests-used").unwrap_or_else(|| "?".to_string())
        );
    }
}
