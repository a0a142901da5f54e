//! MLB Stats API client
//!
//! Endpoints used:
//! - `GET /people/search?names=X` resolves a name to a person id
//! - `GET /people/{id}/stats?stats=season&group=G&season=Y` season totals
//! - `GET /people/{id}/stats?stats=gameLog&group=hitting,pitching&season=Y` game logs

use crate::config::{EnrichmentConfig, MlbStatsApi};
use crate::enrichment::source::{GameLine, GameLogs, PlayerId, SeasonStats, StatLine, StatsSource};
use crate::identity::PlayerKey;
use crate::services::metrics::Metrics;
use crate::services::rate_limiter::RateLimiter;
use crate::types::PropCategory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct PeopleResponse {
    #[serde(default)]
    people: Vec<RawPerson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPerson {
    id: u64,
    #[serde(default)]
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(default)]
    stats: Vec<RawStatBlock>,
}

#[derive(Debug, Deserialize)]
struct RawStatBlock {
    #[serde(default)]
    group: Option<RawGroup>,
    #[serde(default)]
    splits: Vec<RawSplit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGroup {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct RawSplit {
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    stat: StatLine,
}

/// HTTP client for the public MLB Stats API
pub struct MlbStatsClient {
    client: reqwest::Client,
    base_url: String,
    season: i32,
    limiter: RateLimiter,
    metrics: Metrics,
}

impl MlbStatsClient {
    pub fn new(config: &EnrichmentConfig, metrics: Metrics) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: config.base_url.clone(),
            season: config.season,
            limiter: RateLimiter::new(config.max_requests_per_10s, RATE_LIMIT_WINDOW),
            metrics,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        if self.limiter.acquire().await {
            self.metrics.inc_stats_rate_limited();
        }

        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to reach stats API at {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Stats API error {}: {}", status, body);
        }

        response
            .json::<T>()
            .await
            .context("Failed to parse stats response")
    }

    async fn person_stats(&self, player: PlayerId, kind: &str, group: &str) -> Result<Vec<RawStatBlock>> {
        let url = MlbStatsApi::person_stats_url(&self.base_url, player.0);
        let response: StatsResponse = self
            .get_json(
                &url,
                &[
                    ("stats", kind.to_string()),
                    ("group", group.to_string()),
                    ("season", self.season.to_string()),
                ],
            )
            .await?;
        Ok(response.stats)
    }
}

/// Pick the search hit for `key`: an exact canonical-name match, otherwise
/// the only hit if there is exactly one.
fn select_person(people: &[RawPerson], key: &PlayerKey) -> Option<PlayerId> {
    people
        .iter()
        .find(|p| PlayerKey::from_display_name(&p.full_name) == *key)
        .or(match people {
            [only] => Some(only),
            _ => None,
        })
        .map(|p| PlayerId(p.id))
}

/// Dated game lines; splits without a date are not games
fn game_lines(splits: Vec<RawSplit>) -> impl Iterator<Item = GameLine> {
    splits
        .into_iter()
        .filter_map(|s| s.date.map(|date| GameLine { date, stat: s.stat }))
}

#[async_trait]
impl StatsSource for MlbStatsClient {
    async fn lookup_player(&self, key: &PlayerKey, display_name: &str) -> Result<Option<PlayerId>> {
        let url = MlbStatsApi::people_search_url(&self.base_url);
        let response: PeopleResponse = self
            .get_json(&url, &[("names", display_name.to_string())])
            .await?;

        let id = select_person(&response.people, key);
        debug!(
            "Search '{}' returned {} people, resolved to {:?}",
            display_name,
            response.people.len(),
            id
        );
        Ok(id)
    }

    async fn season_stats(&self, player: PlayerId, category: PropCategory) -> Result<Option<SeasonStats>> {
        let group = category.stat_group().as_str();
        let blocks = self.person_stats(player, "season", group).await?;

        let line = blocks
            .into_iter()
            .flat_map(|b| b.splits)
            .map(|s| s.stat)
            .next();

        Ok(line.and_then(|l| SeasonStats::from_line(self.season, category, &l)))
    }

    async fn game_logs(&self, player: PlayerId) -> Result<GameLogs> {
        let blocks = self.person_stats(player, "gameLog", "hitting,pitching").await?;

        let mut logs = GameLogs::default();
        for block in blocks {
            let group = block.group.map(|g| g.display_name.to_lowercase());
            match group.as_deref() {
                Some("hitting") => logs.hitting.extend(game_lines(block.splits)),
                Some("pitching") => logs.pitching.extend(game_lines(block.splits)),
                other => debug!("Ignoring game log block for group {:?}", other),
            }
        }

        logs.hitting.sort_by(|a, b| b.date.cmp(&a.date));
        logs.pitching.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> MlbStatsClient {
        MlbStatsClient::new(
            &EnrichmentConfig {
                base_url: server.uri(),
                season: 2025,
                ..Default::default()
            },
            Metrics::new(),
        )
    }

    #[tokio::test]
    async fn test_lookup_prefers_canonical_match() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/people/search"))
            .and(query_param("names", "Ronald Acuna"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "people": [
                    {"id": 2, "fullName": "Ronald Torreyes"},
                    {"id": 660670, "fullName": "Ronald Acuña Jr."}
                ]
            })))
            .mount(&server)
            .await;

        let key = PlayerKey::from_display_name("Ronald Acuna");
        let id = client_for(&server)
            .lookup_player(&key, "Ronald Acuna")
            .await
            .unwrap();
        assert_eq!(id, Some(PlayerId(660670)));
    }

    #[tokio::test]
    async fn test_lookup_without_people_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/people/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let key = PlayerKey::from_display_name("Nobody Atall");
        let id = client_for(&server).lookup_player(&key, "Nobody Atall").await.unwrap();
        assert_eq!(id, None);
    }

    #[test]
    fn test_select_person_ambiguous() {
        let people = vec![
            RawPerson {
                id: 1,
                full_name: "Will Smith".to_string(),
            },
            RawPerson {
                id: 2,
                full_name: "Will Smith".to_string(),
            },
        ];
        let key = PlayerKey::from_display_name("Will Smith");
        assert_eq!(select_person(&people, &key), Some(PlayerId(1)));

        let other = PlayerKey::from_display_name("William Smith");
        assert_eq!(select_person(&people, &other), None);
        assert_eq!(select_person(&people[..1], &other), Some(PlayerId(1)));
    }

    #[tokio::test]
    async fn test_season_stats() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/people/592450/stats"))
            .and(query_param("stats", "season"))
            .and(query_param("group", "hitting"))
            .and(query_param("season", "2025"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stats": [{
                    "group": {"displayName": "hitting"},
                    "splits": [{
                        "season": "2025",
                        "stat": {"gamesPlayed": 100, "homeRuns": 40, "hits": 120, "avg": ".320"}
                    }]
                }]
            })))
            .mount(&server)
            .await;

        let season = client_for(&server)
            .season_stats(PlayerId(592450), PropCategory::BatterHomeRuns)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(season.total, 40.0);
        assert_eq!(season.games_played, 100);
        assert_eq!(season.per_game, Some(0.4));
    }

    #[tokio::test]
    async fn test_game_logs_split_by_group_newest_first() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/people/660271/stats"))
            .and(query_param("stats", "gameLog"))
            .and(query_param("group", "hitting,pitching"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stats": [
                    {
                        "group": {"displayName": "hitting"},
                        "splits": [
                            {"date": "2025-06-01", "stat": {"hits": 1}},
                            {"date": "2025-06-03", "stat": {"hits": 2}}
                        ]
                    },
                    {
                        "group": {"displayName": "pitching"},
                        "splits": [
                            {"date": "2025-06-02", "stat": {"strikeOuts": 9, "inningsPitched": "6.0"}}
                        ]
                    }
                ]
            })))
            .mount(&server)
            .await;

        let logs = client_for(&server).game_logs(PlayerId(660271)).await.unwrap();
        assert_eq!(logs.hitting.len(), 2);
        assert_eq!(logs.hitting[0].stat.hits, Some(2.0));
        assert_eq!(logs.pitching.len(), 1);
        assert_eq!(PropCategory::PitcherOuts.value_from(&logs.pitching[0].stat), Some(18.0));
    }

    #[tokio::test]
    async fn test_server_error_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/people/1/stats"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let result = client_for(&server).game_logs(PlayerId(1)).await;
        assert!(result.is_err());
    }
}
