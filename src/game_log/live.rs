use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use super::directory::PlayerDirectory;
use super::models::{GameRecord, StatKind, StatLine};
use super::provider::GameLogProvider;

/// Game-log provider backed by a box-score JSON API.
///
/// Endpoints (relative to `base_url`):
/// - `GET search?term={name}` → `[{"identifier": "...", "name": "..."}]`
/// - `GET players/{id}/game-logs?season={season}` → array of box scores
///
/// Requests are spaced at least `min_interval` apart to respect the source's
/// rate limit (20 requests/minute by default).
pub struct LiveProvider {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    directory: PlayerDirectory,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl LiveProvider {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
        min_interval: Duration,
        directory: PlayerDirectory,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        // Trailing slash so relative joins keep the full base path.
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base).with_context(|| format!("Invalid base URL: {base_url}"))?;
        Ok(LiveProvider {
            http,
            base_url,
            api_key,
            directory,
            min_interval,
            last_request: Mutex::new(None),
        })
    }

    /// Wait until `min_interval` has passed since the previous request.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if ready_at > Instant::now() {
                debug!("Rate limit: sleeping until next request slot");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get_json(&self, url: Url) -> Result<serde_json::Value> {
        self.throttle().await;
        debug!("GET {}", url);

        let mut req = self.http.get(url.clone());
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }
        let resp = req.send().await.context("Box-score API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Box-score API error {}: {}", status, body);
        }

        resp.json()
            .await
            .context("Failed to parse box-score API response")
    }

    /// Look up the provider identifier for a player name via the search endpoint.
    async fn search_player(&self, athlete: &str) -> Result<Option<String>> {
        let mut url = self.base_url.join("search").context("Invalid search URL")?;
        url.query_pairs_mut().append_pair("term", athlete);

        let raw = self.get_json(url).await?;
        let first = raw.as_array().and_then(|results| results.first());
        let Some(hit) = first else {
            return Ok(None);
        };
        let id = hit["identifier"].as_str().map(str::to_string);
        if let Some(id) = &id {
            info!(
                "Resolved '{}' to {} ({})",
                athlete,
                id,
                hit["name"].as_str().unwrap_or("?")
            );
        }
        Ok(id)
    }

    async fn resolve_id(&self, athlete: &str, provider_id: Option<&str>) -> Result<Option<String>> {
        if let Some(id) = provider_id {
            return Ok(Some(id.to_string()));
        }
        if let Some(id) = self.directory.resolve(athlete) {
            return Ok(Some(id.to_string()));
        }
        self.search_player(athlete).await
    }
}

#[async_trait]
impl GameLogProvider for LiveProvider {
    fn name(&self) -> &str {
        "Basketball Reference"
    }

    async fn fetch_game_log(
        &self,
        athlete: &str,
        season: i32,
        provider_id: Option<&str>,
    ) -> Result<Vec<GameRecord>> {
        let Some(id) = self.resolve_id(athlete, provider_id).await? else {
            warn!("Could not find a player ID for '{}'", athlete);
            return Ok(vec![]);
        };

        let mut url = self
            .base_url
            .join(&format!("players/{id}/game-logs"))
            .context("Invalid game-log URL")?;
        url.query_pairs_mut()
            .append_pair("season", &season.to_string());

        let raw = self.get_json(url).await?;
        let games = parse_game_logs(&raw);
        info!("Loaded {} games for {} ({})", games.len(), athlete, season);
        Ok(games)
    }
}

/// Normalize a box-score array into `GameRecord`s.
///
/// Rows without a `YYYY-MM-DD` date are skipped. Negative or unparsable
/// values are treated as missing.
pub fn parse_game_logs(raw: &serde_json::Value) -> Vec<GameRecord> {
    let rows = match raw.as_array() {
        Some(a) => a,
        None => return vec![],
    };

    rows.iter()
        .filter_map(|row| {
            let date = row["date"].as_str().and_then(parse_date)?;
            let opponent = clean_opponent(row["opponent"].as_str().unwrap_or("UNKNOWN"));

            let rebounds = number(&row["rebounds"]).or_else(|| {
                match (
                    number(&row["offensive_rebounds"]),
                    number(&row["defensive_rebounds"]),
                ) {
                    (Some(o), Some(d)) => Some(o + d),
                    _ => None,
                }
            });
            let three_pm = number(&row["made_three_point_field_goals"])
                .or_else(|| number(&row["3pm"]));
            let minutes = number(&row["minutes"])
                .or_else(|| number(&row["seconds_played"]).map(|s| s / 60.0));

            let mut stats = StatLine {
                minutes,
                ..Default::default()
            };
            stats.set(StatKind::Points, number(&row["points"]));
            stats.set(StatKind::Assists, number(&row["assists"]));
            stats.set(StatKind::Rebounds, rebounds);
            stats.set(StatKind::Steals, number(&row["steals"]));
            stats.set(StatKind::Blocks, number(&row["blocks"]));
            stats.set(StatKind::ThreePointersMade, three_pm);

            Some(GameRecord {
                date,
                opponent,
                stats,
            })
        })
        .collect()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    // Accept a full timestamp by taking the date prefix.
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Numeric value from a JSON number or numeric string; negatives are dropped.
fn number(v: &serde_json::Value) -> Option<f64> {
    let n = v
        .as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))?;
    (n.is_finite() && n >= 0.0).then_some(n)
}

/// "Team.GOLDEN_STATE_WARRIORS" → "GOLDEN STATE WARRIORS"
fn clean_opponent(raw: &str) -> String {
    raw.replace("Team.", "").replace('_', " ").to_uppercase()
}
