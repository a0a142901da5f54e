//! Configuration management for the props pipeline

use crate::types::OddsFormat;
use anyhow::Result;
use chrono::{Datelike, Utc};
use std::env;
use std::str::FromStr;

/// Pipeline configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Odds API credential (required)
    pub odds_api_key: String,

    /// Odds source settings
    pub odds: OddsConfig,

    /// Stats enrichment settings
    pub enrichment: EnrichmentConfig,
}

#[derive(Debug, Clone)]
pub struct OddsConfig {
    /// API root, overridable for testing against a mock server
    pub base_url: String,
    /// Sport path segment (default: baseball_mlb)
    pub sport_key: String,
    /// Bookmaker regions (default: us)
    pub regions: String,
    /// Price format requested from the API (default: american)
    pub odds_format: OddsFormat,
    /// Pause between successive event fetches (default: 1500ms)
    pub request_delay_ms: u64,
    /// Only process the first N events (default: all)
    pub max_events: Option<usize>,
    /// Attempts per market fetch (default: 3)
    pub fetch_max_attempts: u32,
    /// Fixed delay between fetch attempts (default: 2000ms)
    pub fetch_retry_delay_ms: u64,
}

impl OddsConfig {
    /// Cap the run at `n` events; 0 means every event
    pub fn set_max_events(&mut self, n: usize) {
        self.max_events = (n > 0).then_some(n);
    }
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            base_url: OddsApi::BASE_URL.to_string(),
            sport_key: OddsApi::MLB_SPORT_KEY.to_string(),
            regions: "us".to_string(),
            odds_format: OddsFormat::American,
            request_delay_ms: 1500,
            max_events: None,
            fetch_max_attempts: 3,
            fetch_retry_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// Stats API root
    pub base_url: String,
    /// Concurrent lookup workers (default: 4)
    pub workers: usize,
    /// Season to pull stats for (default: current year)
    pub season: i32,
    /// Game-log window used for recent form (default: 10)
    pub recent_games: usize,
    /// Token bucket budget per 10 seconds (default: 40)
    pub max_requests_per_10s: u32,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            base_url: MlbStatsApi::BASE_URL.to_string(),
            workers: 4,
            season: Utc::now().year(),
            recent_games: 10,
            max_requests_per_10s: 40,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let odds_api_key = env::var("ODDS_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let Some(odds_api_key) = odds_api_key else {
            anyhow::bail!("ODDS_API_KEY environment variable not set");
        };

        let odds_defaults = OddsConfig::default();

        let odds_format = match env::var("ODDS_FORMAT") {
            Ok(v) if !v.trim().is_empty() => OddsFormat::from_str(&v).map_err(anyhow::Error::msg)?,
            _ => odds_defaults.odds_format,
        };

        let mut odds = OddsConfig {
            base_url: env::var("ODDS_API_BASE_URL").unwrap_or(odds_defaults.base_url),
            sport_key: env::var("ODDS_SPORT_KEY").unwrap_or(odds_defaults.sport_key),
            regions: env::var("ODDS_REGIONS").unwrap_or(odds_defaults.regions),
            odds_format,
            request_delay_ms: parse_env("REQUEST_DELAY_MS").unwrap_or(odds_defaults.request_delay_ms),
            max_events: None,
            fetch_max_attempts: parse_env("FETCH_MAX_ATTEMPTS")
                .unwrap_or(odds_defaults.fetch_max_attempts)
                .max(1),
            fetch_retry_delay_ms: parse_env("FETCH_RETRY_DELAY_MS")
                .unwrap_or(odds_defaults.fetch_retry_delay_ms),
        };

        if let Some(n) = parse_env("MAX_EVENTS") {
            odds.set_max_events(n);
        }

        let enrichment_defaults = EnrichmentConfig::default();

        let enrichment = EnrichmentConfig {
            base_url: env::var("STATS_API_BASE_URL").unwrap_or(enrichment_defaults.base_url),
            workers: parse_env("STATS_WORKERS")
                .unwrap_or(enrichment_defaults.workers)
                .max(1),
            season: parse_env("STATS_SEASON").unwrap_or(enrichment_defaults.season),
            recent_games: parse_env("STATS_RECENT_GAMES")
                .unwrap_or(enrichment_defaults.recent_games)
                .max(1),
            max_requests_per_10s: parse_env("STATS_MAX_REQUESTS_PER_10S")
                .unwrap_or(enrichment_defaults.max_requests_per_10s)
                .max(1),
        };

        Ok(Self {
            odds_api_key,
            odds,
            enrichment,
        })
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// The Odds API configuration
pub struct OddsApi;

impl OddsApi {
    pub const BASE_URL: &'static str = "https://api.the-odds-api.com/v4";
    pub const MLB_SPORT_KEY: &'static str = "baseball_mlb";

    pub fn events_url(base_url: &str, sport_key: &str) -> String {
        format!("{}/sports/{}/events", base_url.trim_end_matches('/'), sport_key)
    }

    pub fn event_odds_url(base_url: &str, sport_key: &str, event_id: &str) -> String {
        format!(
            "{}/sports/{}/events/{}/odds",
            base_url.trim_end_matches('/'),
            sport_key,
            event_id
        )
    }
}

/// MLB Stats API configuration
pub struct MlbStatsApi;

impl MlbStatsApi {
    pub const BASE_URL: &'static str = "https://statsapi.mlb.com/api/v1";

    pub fn people_search_url(base_url: &str) -> String {
        format!("{}/people/search", base_url.trim_end_matches('/'))
    }

    pub fn person_stats_url(base_url: &str, player_id: u64) -> String {
        format!("{}/people/{}/stats", base_url.trim_end_matches('/'), player_id)
    }
}
