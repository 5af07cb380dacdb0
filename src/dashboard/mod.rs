use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::engine::{PredictionQuery, PredictionResult, Predictor, DEFAULT_WINDOWS};
use crate::game_log::directory::DEFAULT_SEARCH_LIMIT;
use crate::game_log::{PlayerDirectory, StatKind};
use crate::report::{probability_class, Recommendation};

#[derive(Clone)]
pub struct AppState {
    pub predictor: Predictor,
    pub directory: PlayerDirectory,
    /// "real_data" or "sample_data", reported by /health.
    pub api_mode: &'static str,
}

/// Build the Axum router for the prediction API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/predict", post(predict_handler))
        .route("/compare", post(compare_handler))
        .route("/trend", get(trend_handler))
        .route("/search", get(search_handler))
        .route("/players", get(players_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// A form value that may arrive as a JSON number or as text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Loose {
    Number(f64),
    Text(String),
}

impl Loose {
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Loose::Number(n) => Some(*n),
            Loose::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value.filter(|n| n.is_finite())
    }

    fn is_blank(&self) -> bool {
        matches!(self, Loose::Text(s) if s.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    #[serde(default)]
    player: String,
    #[serde(default)]
    stat: String,
    threshold: Option<Loose>,
    /// Number of recent games, or "full"/empty for the whole season.
    games: Option<Loose>,
    #[serde(default)]
    opponent: Option<String>,
    season: Option<i32>,
}

fn bad_request(msg: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
}

const GAMES_ERROR: &str = "Games must be a whole number or \"full\"";

/// Recency window from the `games` field. Missing, empty, `"full"` and 0
/// mean the full season; fractional or negative counts are rejected.
fn parse_games(games: Option<&Loose>) -> Result<Option<usize>, &'static str> {
    let n = match games {
        None => return Ok(None),
        Some(Loose::Number(n)) => {
            if !n.is_finite() || *n < 0.0 || n.fract() != 0.0 {
                return Err(GAMES_ERROR);
            }
            *n as usize
        }
        Some(Loose::Text(s)) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("full") {
                return Ok(None);
            }
            s.parse::<usize>().map_err(|_| GAMES_ERROR)?
        }
    };
    Ok(Some(n).filter(|&n| n > 0))
}

/// Serve the HTML form.
async fn index_handler() -> impl IntoResponse {
    Html(INDEX_HTML)
}

/// POST /predict
async fn predict_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PredictRequest>,
) -> Response {
    let player = req.player.trim();
    let stat = req.stat.trim();
    if player.is_empty() {
        return bad_request("Player name is required");
    }
    if stat.is_empty() {
        return bad_request("Stat type is required");
    }
    let threshold = match &req.threshold {
        None => return bad_request("Threshold value is required"),
        Some(t) if t.is_blank() => return bad_request("Threshold value is required"),
        Some(t) => match t.as_f64() {
            Some(v) => v,
            None => return bad_request("Threshold must be a valid number"),
        },
    };

    let last_n = match parse_games(req.games.as_ref()) {
        Ok(n) => n,
        Err(msg) => return bad_request(msg),
    };
    let opponent = req
        .opponent
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let query = PredictionQuery::new(player, stat, threshold)
        .opponent(opponent)
        .last_n(last_n)
        .season(req.season)
        .provider_id(state.directory.resolve(player));

    info!(
        "POST /predict player={} stat={} threshold={} opponent={:?} last_n={:?}",
        query.player, query.stat, query.threshold, query.opponent, query.last_n
    );

    match state.predictor.predict_result(&query).await {
        PredictionResult::Success(p) => {
            let rec = Recommendation::from_probability(p.probability);
            let mut body = match serde_json::to_value(&p) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Failed to serialize prediction: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": e.to_string() })),
                    )
                        .into_response();
                }
            };
            if let Value::Object(map) = &mut body {
                map.insert("recommendation".into(), rec.as_str().into());
                map.insert("recommendation_class".into(), rec.css_class().into());
                map.insert("prob_class".into(), probability_class(p.probability).into());
            }
            Json(body).into_response()
        }
        failure @ PredictionResult::Failure { .. } => Json(failure).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct CompareRequest {
    player: String,
    stat: String,
    threshold: f64,
    opponents: Vec<String>,
    season: Option<i32>,
}

/// POST /compare
async fn compare_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompareRequest>,
) -> Response {
    if req.player.trim().is_empty() || req.opponents.is_empty() {
        return bad_request("player and at least one opponent are required");
    }
    if !req.threshold.is_finite() {
        return bad_request("Threshold must be a valid number");
    }
    let rows = state
        .predictor
        .compare_opponents(
            req.player.trim(),
            &req.stat,
            req.threshold,
            &req.opponents,
            req.season,
        )
        .await;
    Json(rows).into_response()
}

#[derive(Debug, Deserialize)]
struct TrendParams {
    player: String,
    stat: String,
    season: Option<i32>,
    /// Comma-separated window sizes, e.g. "5,10,20".
    windows: Option<String>,
}

/// GET /trend?player=..&stat=..&windows=5,10
async fn trend_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrendParams>,
) -> Response {
    let windows: Vec<usize> = match params.windows.as_deref() {
        Some(raw) if !raw.trim().is_empty() => {
            match raw
                .split(',')
                .map(|w| w.trim().parse::<usize>())
                .collect::<Result<Vec<_>, _>>()
            {
                Ok(w) => w,
                Err(_) => return bad_request("windows must be comma-separated integers"),
            }
        }
        _ => DEFAULT_WINDOWS.to_vec(),
    };

    match state
        .predictor
        .window_breakdown(params.player.trim(), &params.stat, params.season, &windows)
        .await
    {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => Json(json!({ "error": e.to_string() })).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

/// GET /search?q=..
async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    Json(state.directory.search(&params.q, DEFAULT_SEARCH_LIMIT))
}

/// GET /players
async fn players_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.directory.all_sorted())
}

/// GET /health
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "api_mode": state.api_mode,
        "data_source": state.predictor.data_source(),
        "default_season": state.predictor.default_season(),
        "cached_logs": state.predictor.cached_logs().await,
        "stats": StatKind::available_keys(),
    }))
}

/// Single-page form that posts to /predict.
const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Player Prop Predictor</title>
<style>
  body { background: #0f1117; color: #e0e0e0; font-family: 'Segoe UI', system-ui, sans-serif; margin: 0; }
  header { padding: 1rem 2rem; border-bottom: 1px solid #2a2d3a; font-size: 1.3rem; font-weight: 700; }
  main { padding: 1.5rem 2rem; display: grid; gap: 1.5rem; max-width: 760px; }
  form { display: grid; grid-template-columns: 1fr 1fr; gap: .8rem; }
  label { display: grid; gap: .3rem; font-size: .8rem; color: #8888aa; text-transform: uppercase; }
  input, select, button { padding: .5rem; background: #1a1d27; color: #e0e0e0; border: 1px solid #2a2d3a; border-radius: 6px; }
  button { grid-column: span 2; background: #6c63ff; border: none; font-weight: 700; cursor: pointer; }
  pre { background: #1a1d27; padding: 1rem; border-radius: 8px; white-space: pre-wrap; }
  .success { color: #00c896; } .warning { color: #ff9800; } .danger { color: #ff4f6a; }
</style>
</head>
<body>
<header>Player Prop Predictor</header>
<main>
  <form id="f">
    <label>Player <input name="player" list="players" required></label>
    <label>Stat
      <select name="stat">
        <option value="points">Points</option><option value="assists">Assists</option>
        <option value="rebounds">Rebounds</option><option value="steals">Steals</option>
        <option value="blocks">Blocks</option><option value="3pm">3-Pointers Made</option>
      </select>
    </label>
    <label>Threshold <input name="threshold" required></label>
    <label>Games
      <select name="games">
        <option value="full">Full season</option><option value="5">Last 5</option>
        <option value="10">Last 10</option><option value="20">Last 20</option>
      </select>
    </label>
    <label>Opponent <input name="opponent" placeholder="e.g. GSW"></label>
    <button type="submit">Predict</button>
  </form>
  <datalist id="players"></datalist>
  <h2 id="headline"></h2>
  <pre id="out"></pre>
</main>
<script>
fetch('/players').then(r => r.json()).then(names => {
  document.getElementById('players').innerHTML = names.map(n => `<option value="${n}">`).join('');
});
document.getElementById('f').addEventListener('submit', async (ev) => {
  ev.preventDefault();
  const body = Object.fromEntries(new FormData(ev.target).entries());
  const res = await fetch('/predict', { method: 'POST', headers: { 'Content-Type': 'application/json' }, body: JSON.stringify(body) });
  const data = await res.json();
  const h = document.getElementById('headline');
  if (data.error) { h.textContent = data.error; h.className = 'danger'; }
  else { h.textContent = `${data.probability}% · ${data.recommendation}`; h.className = data.prob_class; }
  document.getElementById('out').textContent = JSON.stringify(data, null, 2);
});
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{EvictionPolicy, GameLogCache};
    use crate::game_log::SyntheticProvider;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let cache = GameLogCache::new(Arc::new(SyntheticProvider::new()), EvictionPolicy::Unbounded);
        router(AppState {
            predictor: Predictor::new(cache, 2024),
            directory: PlayerDirectory::new(),
            api_mode: "sample_data",
        })
    }

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_parse_games() {
        assert_eq!(parse_games(None), Ok(None));
        assert_eq!(parse_games(Some(&Loose::Text("full".into()))), Ok(None));
        assert_eq!(parse_games(Some(&Loose::Text("10".into()))), Ok(Some(10)));
        assert_eq!(parse_games(Some(&Loose::Text("".into()))), Ok(None));
        assert_eq!(parse_games(Some(&Loose::Number(5.0))), Ok(Some(5)));
        assert_eq!(parse_games(Some(&Loose::Number(0.0))), Ok(None));
    }

    #[test]
    fn test_parse_games_rejects_fractional_and_negative() {
        assert!(parse_games(Some(&Loose::Number(5.7))).is_err());
        assert!(parse_games(Some(&Loose::Number(-3.0))).is_err());
        assert!(parse_games(Some(&Loose::Text("5.7".into()))).is_err());
        assert!(parse_games(Some(&Loose::Text("ten".into()))).is_err());
    }

    #[tokio::test]
    async fn test_predict_fractional_games_is_bad_request() {
        let (status, body) = call(
            app(),
            post_json(
                "/predict",
                json!({"player": "LeBron James", "stat": "points", "threshold": 25, "games": 5.7}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], GAMES_ERROR);
    }

    #[tokio::test]
    async fn test_predict_success_with_string_threshold() {
        let (status, body) = call(
            app(),
            post_json(
                "/predict",
                json!({"player": "LeBron James", "stat": "points", "threshold": "25", "games": "10"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("error").is_none());
        assert_eq!(body["sample_size"], 10);
        assert_eq!(body["time_filter"], "Last 10 games");
        assert!(body["recommendation"].is_string());
        assert!(body["prob_class"].is_string());
    }

    #[tokio::test]
    async fn test_predict_validation_errors() {
        let (status, body) = call(
            app(),
            post_json("/predict", json!({"player": "", "stat": "points", "threshold": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Player name is required");

        let (status, body) = call(
            app(),
            post_json("/predict", json!({"player": "X", "stat": "points", "threshold": "abc"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Threshold must be a valid number");

        let (status, _) = call(
            app(),
            post_json("/predict", json!({"player": "X", "stat": "points"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_predict_engine_error_is_error_only() {
        let (status, body) = call(
            app(),
            post_json(
                "/predict",
                json!({"player": "X", "stat": "points", "threshold": 10, "opponent": "ZZZ"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"error": "No games found against ZZZ"}));
    }

    #[tokio::test]
    async fn test_search_and_players() {
        let (status, body) = call(app(), get("/search?q=curry")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["Stephen Curry"]));

        let (_, body) = call(app(), get("/search")).await;
        assert_eq!(body, json!([]));

        let (_, body) = call(app(), get("/players")).await;
        assert!(body.as_array().unwrap().len() > 40);
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(app(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["api_mode"], "sample_data");
        assert_eq!(body["default_season"], 2024);
        assert_eq!(body["cached_logs"], 0);
    }

    #[tokio::test]
    async fn test_trend_endpoint() {
        let (status, body) = call(
            app(),
            get("/trend?player=Luka%20Doncic&stat=points&windows=5,10,50"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["label"], "Last 5 games");

        let (status, _) = call(app(), get("/trend?player=X&stat=points&windows=a,b")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_compare_endpoint() {
        let (status, body) = call(
            app(),
            post_json(
                "/compare",
                json!({"player": "LeBron James", "stat": "points", "threshold": 25,
                       "opponents": ["LAL", "GSW", "BOS", "MIA", "ZZZ"]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert!(rows.iter().all(|r| r["opponent"] != "ZZZ"));
        let probs: Vec<f64> = rows.iter().map(|r| r["probability"].as_f64().unwrap()).collect();
        for pair in probs.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }
}
