use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::GameLogCache;
use crate::game_log::{GameRecord, StatKind};

use super::filter::{apply_filters, chronological, filter_by_opponent};
use super::stats::{round1, summarize, window_summaries, HitRateLadder, Trend, WindowSummary};

pub const DEFAULT_WINDOWS: [usize; 4] = [5, 10, 15, 20];

/// Input contract for one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionQuery {
    pub player: String,
    /// Raw stat name; validated against the vocabulary during prediction.
    pub stat: String,
    pub threshold: f64,
    /// Case-insensitive substring of the opponent code or name.
    pub opponent: Option<String>,
    /// Most recent N games; `None` or `Some(0)` is the full season.
    pub last_n: Option<usize>,
    /// Defaults to the predictor's configured season.
    pub season: Option<i32>,
    /// Pre-resolved provider identifier, when the caller has one.
    pub provider_id: Option<String>,
}

impl PredictionQuery {
    pub fn new(player: impl Into<String>, stat: impl Into<String>, threshold: f64) -> Self {
        PredictionQuery {
            player: player.into(),
            stat: stat.into(),
            threshold,
            opponent: None,
            last_n: None,
            season: None,
            provider_id: None,
        }
    }

    pub fn opponent<S: Into<String>>(mut self, opponent: Option<S>) -> Self {
        self.opponent = opponent.map(Into::into);
        self
    }

    pub fn last_n(mut self, n: Option<usize>) -> Self {
        self.last_n = n;
        self
    }

    pub fn season(mut self, season: Option<i32>) -> Self {
        self.season = season;
        self
    }

    pub fn provider_id<S: Into<String>>(mut self, id: Option<S>) -> Self {
        self.provider_id = id.map(Into::into);
        self
    }

    fn recency(&self) -> Option<usize> {
        self.last_n.filter(|&n| n > 0)
    }
}

/// Conditions that abort a prediction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictionError {
    #[error("No data found for {player}")]
    NoData { player: String },

    #[error("No games found against {opponent}")]
    NoMatchingOpponentGames { opponent: String },

    #[error("Stat \"{stat}\" not available. Available stats: {}", .available.join(", "))]
    UnknownStat {
        stat: String,
        available: Vec<&'static str>,
    },

    #[error("No {stat} data available")]
    NoStatValues { stat: String },
}

/// Successful prediction. Percentages and averages are rounded to one decimal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub player: String,
    pub stat: StatKind,
    pub threshold: f64,
    pub season: i32,
    pub probability: f64,
    pub confidence: f64,
    /// Games that reported the stat.
    pub sample_size: usize,
    /// Games left after filtering, with or without the stat.
    pub games_analyzed: usize,
    pub average: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub trend: Trend,
    pub hit_rates: HitRateLadder,
    pub times_hit: usize,
    pub times_missed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_filter: Option<String>,
    pub data_source: String,
}

/// Wire form of a prediction: the full record, or only an error message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionResult {
    Success(Prediction),
    Failure { error: String },
}

impl PredictionResult {
    pub fn is_error(&self) -> bool {
        matches!(self, PredictionResult::Failure { .. })
    }
}

impl From<Result<Prediction, PredictionError>> for PredictionResult {
    fn from(r: Result<Prediction, PredictionError>) -> Self {
        match r {
            Ok(p) => PredictionResult::Success(p),
            Err(e) => PredictionResult::Failure {
                error: e.to_string(),
            },
        }
    }
}

/// One row of an opponent comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpponentComparison {
    pub opponent: String,
    pub probability: f64,
    pub games: usize,
    pub average: f64,
    pub trend: Trend,
}

/// Composes cache, filters and statistics into predictions.
#[derive(Clone)]
pub struct Predictor {
    cache: GameLogCache,
    default_season: i32,
}

impl Predictor {
    pub fn new(cache: GameLogCache, default_season: i32) -> Self {
        Predictor {
            cache,
            default_season,
        }
    }

    pub fn default_season(&self) -> i32 {
        self.default_season
    }

    pub fn data_source(&self) -> &str {
        self.cache.provider_name()
    }

    /// Number of game logs currently held in the cache.
    pub async fn cached_logs(&self) -> usize {
        self.cache.len().await
    }

    /// Run the full pipeline for one query.
    pub async fn predict(&self, query: &PredictionQuery) -> Result<Prediction, PredictionError> {
        let season = query.season.unwrap_or(self.default_season);
        let log = self
            .cache
            .get_or_fetch(&query.player, season, query.provider_id.as_deref())
            .await;
        self.predict_on(&log, season, query)
    }

    /// Steps after the fetch, over an already-resolved log.
    fn predict_on(
        &self,
        log: &[GameRecord],
        season: i32,
        query: &PredictionQuery,
    ) -> Result<Prediction, PredictionError> {
        let result = evaluate(log, query).map(|summary| Prediction {
            player: query.player.clone(),
            stat: summary.stat,
            threshold: query.threshold,
            season,
            probability: round1(summary.stats.probability),
            confidence: round1(summary.stats.confidence),
            sample_size: summary.stats.sample_size,
            games_analyzed: summary.games_analyzed,
            average: round1(summary.stats.mean),
            median: round1(summary.stats.median),
            std_dev: round1(summary.stats.std_dev),
            min: round1(summary.stats.min),
            max: round1(summary.stats.max),
            trend: summary.stats.trend,
            hit_rates: summary.stats.hit_rates,
            times_hit: summary.stats.times_hit,
            times_missed: summary.stats.times_missed,
            opponent_filter: query.opponent.clone(),
            time_filter: query.recency().map(|n| format!("Last {n} games")),
            data_source: self.data_source().to_string(),
        });

        match &result {
            Ok(p) => info!(
                "Prediction {} {} >= {}: {:.1}% (confidence {:.1}%, n={}, trend={})",
                p.player,
                p.stat,
                p.threshold,
                p.probability,
                p.confidence,
                p.sample_size,
                p.trend.as_str()
            ),
            Err(e) => debug!("Prediction for {} aborted: {}", query.player, e),
        }
        result
    }

    /// `predict`, flattened into the wire form.
    pub async fn predict_result(&self, query: &PredictionQuery) -> PredictionResult {
        self.predict(query).await.into()
    }

    /// Probability against each opponent, highest first. Opponents with no
    /// usable games are left out. The log is fetched once for all opponents.
    pub async fn compare_opponents(
        &self,
        player: &str,
        stat: &str,
        threshold: f64,
        opponents: &[String],
        season: Option<i32>,
    ) -> Vec<OpponentComparison> {
        let season = season.unwrap_or(self.default_season);
        let log = self.cache.get_or_fetch(player, season, None).await;

        let mut rows: Vec<OpponentComparison> = opponents
            .iter()
            .filter_map(|opp| {
                let query = PredictionQuery::new(player, stat, threshold)
                    .opponent(Some(opp.as_str()))
                    .season(Some(season));
                let p = self.predict_on(&log, season, &query).ok()?;
                Some(OpponentComparison {
                    opponent: opp.clone(),
                    probability: p.probability,
                    games: p.games_analyzed,
                    average: p.average,
                    trend: p.trend,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        rows
    }

    /// Descriptive stats over the last N games for several window sizes.
    pub async fn window_breakdown(
        &self,
        player: &str,
        stat: &str,
        season: Option<i32>,
        windows: &[usize],
    ) -> Result<Vec<WindowSummary>, PredictionError> {
        let season = season.unwrap_or(self.default_season);
        let log = self.cache.get_or_fetch(player, season, None).await;
        if log.is_empty() {
            return Err(PredictionError::NoData {
                player: player.to_string(),
            });
        }
        let kind = parse_stat(stat)?;
        let values = stat_values(&chronological(log.iter().collect()), kind);
        Ok(window_summaries(&values, windows))
    }
}

struct Evaluation {
    stat: StatKind,
    games_analyzed: usize,
    stats: super::stats::StatSummary,
}

/// Steps 1–5 of a prediction over an already-resolved game log.
fn evaluate(log: &[GameRecord], query: &PredictionQuery) -> Result<Evaluation, PredictionError> {
    if log.is_empty() {
        return Err(PredictionError::NoData {
            player: query.player.clone(),
        });
    }

    if let Some(opp) = &query.opponent {
        if filter_by_opponent(log, opp).is_empty() {
            return Err(PredictionError::NoMatchingOpponentGames {
                opponent: opp.clone(),
            });
        }
    }

    let view = chronological(apply_filters(
        log,
        query.opponent.as_deref(),
        query.recency(),
    ));

    let stat = parse_stat(&query.stat)?;
    let values = stat_values(&view, stat);

    let stats = summarize(&values, query.threshold).ok_or_else(|| PredictionError::NoStatValues {
        stat: stat.to_string(),
    })?;

    Ok(Evaluation {
        stat,
        games_analyzed: view.len(),
        stats,
    })
}

fn parse_stat(stat: &str) -> Result<StatKind, PredictionError> {
    stat.parse().map_err(|_| PredictionError::UnknownStat {
        stat: stat.to_string(),
        available: StatKind::available_keys(),
    })
}

/// Present values of `kind`, in view order.
fn stat_values(view: &[&GameRecord], kind: StatKind) -> Vec<f64> {
    view.iter().filter_map(|g| g.stat(kind)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EvictionPolicy;
    use crate::game_log::models::StatLine;
    use crate::game_log::{GameLogProvider, SyntheticProvider};
    use anyhow::Result;
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const SCENARIO: [f64; 10] = [20.0, 22.0, 18.0, 25.0, 30.0, 28.0, 24.0, 26.0, 19.0, 31.0];

    /// Serves a fixed log for every athlete, or fails.
    struct FixedProvider {
        games: Vec<GameRecord>,
        fail: bool,
    }

    #[async_trait]
    impl GameLogProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch_game_log(
            &self,
            _athlete: &str,
            _season: i32,
            _provider_id: Option<&str>,
        ) -> Result<Vec<GameRecord>> {
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(self.games.clone())
        }
    }

    fn game(day: i64, opponent: &str, points: Option<f64>) -> GameRecord {
        GameRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(day),
            opponent: opponent.to_string(),
            stats: StatLine {
                points,
                assists: Some(5.0),
                ..Default::default()
            },
        }
    }

    fn predictor_with(games: Vec<GameRecord>) -> Predictor {
        let provider = Arc::new(FixedProvider { games, fail: false });
        Predictor::new(GameLogCache::new(provider, EvictionPolicy::Unbounded), 2024)
    }

    /// SCENARIO values as games, stored newest first to show order does not matter.
    fn scenario_games() -> Vec<GameRecord> {
        let opps = ["LAL", "GSW", "BOS"];
        let mut games: Vec<GameRecord> = SCENARIO
            .iter()
            .enumerate()
            .map(|(i, v)| game(i as i64, opps[i % 3], Some(*v)))
            .collect();
        games.reverse();
        games
    }

    #[tokio::test]
    async fn test_full_prediction_fields() {
        let p = predictor_with(scenario_games());
        let r = p
            .predict(&PredictionQuery::new("Test Player", "points", 25.5))
            .await
            .unwrap();

        assert_eq!(r.stat, StatKind::Points);
        assert_relative_eq!(r.probability, 40.0);
        assert_eq!(r.times_hit, 4);
        assert_eq!(r.times_missed, 6);
        assert_eq!(r.sample_size, 10);
        assert_eq!(r.games_analyzed, 10);
        assert_relative_eq!(r.average, 24.3);
        assert_relative_eq!(r.median, 24.5);
        assert_relative_eq!(r.min, 18.0);
        assert_relative_eq!(r.max, 31.0);
        // Games were stored newest first; trend still sees chronological order.
        assert_eq!(r.trend, Trend::TrendingUp);
        assert_eq!(r.hit_rates.iter().count(), 5);
        assert_eq!(r.opponent_filter, None);
        assert_eq!(r.time_filter, None);
        assert_eq!(r.data_source, "fixed");
        assert_eq!(r.season, 2024);
    }

    #[tokio::test]
    async fn test_no_data_error() {
        let p = predictor_with(vec![]);
        let err = p
            .predict(&PredictionQuery::new("Nobody", "points", 10.0))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PredictionError::NoData {
                player: "Nobody".into()
            }
        );
        assert_eq!(err.to_string(), "No data found for Nobody");
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_no_data() {
        let provider = Arc::new(FixedProvider {
            games: vec![],
            fail: true,
        });
        let p = Predictor::new(GameLogCache::new(provider, EvictionPolicy::Unbounded), 2024);
        let err = p
            .predict(&PredictionQuery::new("X", "points", 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, PredictionError::NoData { .. }));
    }

    #[tokio::test]
    async fn test_opponent_no_match_error() {
        let p = predictor_with(scenario_games());
        let err = p
            .predict(&PredictionQuery::new("X", "points", 10.0).opponent(Some("NYK")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No games found against NYK");
    }

    #[tokio::test]
    async fn test_opponent_checked_before_stat_name() {
        let p = predictor_with(scenario_games());
        let err = p
            .predict(&PredictionQuery::new("X", "turnovers", 10.0).opponent(Some("NYK")))
            .await
            .unwrap_err();
        assert!(matches!(err, PredictionError::NoMatchingOpponentGames { .. }));
    }

    #[tokio::test]
    async fn test_unknown_stat_lists_available() {
        let p = predictor_with(scenario_games());
        let err = p
            .predict(&PredictionQuery::new("X", "turnovers", 10.0))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, PredictionError::UnknownStat { .. }));
        for key in ["points", "assists", "rebounds", "steals", "blocks", "3pm"] {
            assert!(msg.contains(key), "{msg} should list {key}");
        }
    }

    #[tokio::test]
    async fn test_stat_with_all_values_missing() {
        let p = predictor_with(scenario_games());
        let err = p
            .predict(&PredictionQuery::new("X", "steals", 1.0))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No steals data available");
    }

    #[tokio::test]
    async fn test_opponent_filter_echo_and_subset() {
        let p = predictor_with(scenario_games());
        let r = p
            .predict(&PredictionQuery::new("X", "points", 25.0).opponent(Some("gs")))
            .await
            .unwrap();
        // GSW games are indices 1, 4, 7 → 22, 30, 26
        assert_eq!(r.games_analyzed, 3);
        assert_eq!(r.times_hit, 2);
        assert_eq!(r.opponent_filter.as_deref(), Some("gs"));
        assert_eq!(r.trend, Trend::InsufficientData);
    }

    #[tokio::test]
    async fn test_last_n_uses_most_recent_games() {
        let games: Vec<GameRecord> = (0..30).map(|d| game(d, "LAL", Some(d as f64))).collect();
        let p = predictor_with(games);
        let r = p
            .predict(&PredictionQuery::new("X", "points", 27.0).last_n(Some(5)))
            .await
            .unwrap();
        assert_eq!(r.sample_size, 5);
        assert_relative_eq!(r.min, 25.0);
        assert_relative_eq!(r.max, 29.0);
        assert_eq!(r.times_hit, 3);
        assert_eq!(r.time_filter.as_deref(), Some("Last 5 games"));
        assert_eq!(r.trend, Trend::InsufficientData);
    }

    #[tokio::test]
    async fn test_last_n_trend_uses_chronological_order() {
        // 10 most recent games climb steeply; trend must read them oldest first.
        let games: Vec<GameRecord> = (0..30)
            .map(|d| game(d, "LAL", Some(if d >= 25 { 30.0 } else { 10.0 })))
            .collect();
        let p = predictor_with(games);
        let r = p
            .predict(&PredictionQuery::new("X", "points", 20.0).last_n(Some(10)))
            .await
            .unwrap();
        assert_eq!(r.trend, Trend::TrendingUp);
    }

    #[tokio::test]
    async fn test_games_analyzed_counts_games_without_stat() {
        let games = vec![
            game(0, "LAL", Some(10.0)),
            game(1, "LAL", None),
            game(2, "LAL", Some(20.0)),
        ];
        let p = predictor_with(games);
        let r = p
            .predict(&PredictionQuery::new("X", "points", 15.0))
            .await
            .unwrap();
        assert_eq!(r.games_analyzed, 3);
        assert_eq!(r.sample_size, 2);
        assert_eq!(r.times_hit + r.times_missed, r.sample_size);
    }

    #[tokio::test]
    async fn test_error_result_has_only_error_field() {
        let p = predictor_with(vec![]);
        let result = p
            .predict_result(&PredictionQuery::new("Nobody", "points", 1.0))
            .await;
        assert!(result.is_error());
        let json = serde_json::to_value(&result).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj["error"], "No data found for Nobody");
    }

    #[tokio::test]
    async fn test_success_result_serialization() {
        let p = predictor_with(scenario_games());
        let result = p
            .predict_result(&PredictionQuery::new("X", "points", 25.0).last_n(Some(10)))
            .await;
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["stat"], "points");
        assert_eq!(json["trend"], "trending_up");
        assert_eq!(json["time_filter"], "Last 10 games");
        assert!(json.get("opponent_filter").is_none());
        assert_eq!(json["hit_rates"]["24.3+"], 50.0);
    }

    #[tokio::test]
    async fn test_compare_opponents_sorted() {
        let p = predictor_with(scenario_games());
        let opps: Vec<String> = ["BOS", "GSW", "NYK", "LAL"].iter().map(|s| s.to_string()).collect();
        let rows = p.compare_opponents("X", "points", 25.0, &opps, None).await;
        // NYK has no games and is dropped.
        assert_eq!(rows.len(), 3);
        for pair in rows.windows(2) {
            assert!(pair[0].probability >= pair[1].probability);
        }
        assert!(rows.iter().all(|r| r.opponent != "NYK"));
    }

    /// Slow enough that concurrent callers would overlap on a cold cache.
    struct SlowCountingProvider {
        games: Vec<GameRecord>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GameLogProvider for SlowCountingProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn fetch_game_log(
            &self,
            _athlete: &str,
            _season: i32,
            _provider_id: Option<&str>,
        ) -> Result<Vec<GameRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(self.games.clone())
        }
    }

    #[tokio::test]
    async fn test_compare_opponents_fetches_log_once() {
        let provider = Arc::new(SlowCountingProvider {
            games: scenario_games(),
            calls: AtomicUsize::new(0),
        });
        let p = Predictor::new(
            GameLogCache::new(provider.clone(), EvictionPolicy::Unbounded),
            2024,
        );
        let opps: Vec<String> = ["LAL", "GSW", "BOS", "MIA", "DEN"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = p.compare_opponents("X", "points", 22.0, &opps, None).await;
        assert_eq!(rows.len(), 3);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_builder_accepts_optional_filters() {
        let q = PredictionQuery::new("X", "points", 20.0)
            .opponent(None::<String>)
            .last_n(Some(5))
            .season(Some(2023))
            .provider_id(Some("abc01"));
        assert_eq!(q.opponent, None);
        assert_eq!(q.last_n, Some(5));
        assert_eq!(q.season, Some(2023));
        assert_eq!(q.provider_id.as_deref(), Some("abc01"));

        let p = predictor_with(scenario_games());
        let r = p.predict(&q).await.unwrap();
        assert_eq!(r.season, 2023);
        assert_eq!(r.sample_size, 5);
    }

    #[tokio::test]
    async fn test_window_breakdown() {
        let p = predictor_with(scenario_games());
        let rows = p
            .window_breakdown("X", "points", None, &DEFAULT_WINDOWS)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_relative_eq!(rows[0].average, 25.6);

        let err = p
            .window_breakdown("X", "fouls", None, &DEFAULT_WINDOWS)
            .await
            .unwrap_err();
        assert!(matches!(err, PredictionError::UnknownStat { .. }));
    }

    #[tokio::test]
    async fn test_synthetic_end_to_end_is_deterministic() {
        let make = || {
            Predictor::new(
                GameLogCache::new(Arc::new(SyntheticProvider::new()), EvictionPolicy::Unbounded),
                2024,
            )
        };
        let q = PredictionQuery::new("LeBron James", "points", 25.0).last_n(Some(10));
        let a = make().predict(&q).await.unwrap();
        let b = make().predict(&q).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.sample_size, 10);
        assert!((0.0..=100.0).contains(&a.probability));
        assert!((0.0..=100.0).contains(&a.confidence));
        assert_eq!(a.data_source, "Sample Data");
    }
}
