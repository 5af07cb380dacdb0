use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod cache;
mod config;
mod dashboard;
mod engine;
mod game_log;
mod report;

use cache::{EvictionPolicy, GameLogCache};
use config::{Config, ProviderKind};
use dashboard::AppState;
use engine::{PredictionQuery, Predictor};
use game_log::{GameLogProvider, LiveProvider, PlayerDirectory, SyntheticProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let directory = PlayerDirectory::new();

    let (provider, api_mode): (Arc<dyn GameLogProvider>, &'static str) = match config.provider {
        ProviderKind::Live => {
            info!("Using live box-score API at {}", config.live_api_url);
            let live = LiveProvider::new(
                &config.live_api_url,
                config.live_api_key.clone(),
                Duration::from_secs(config.request_timeout_secs),
                Duration::from_millis(config.min_request_interval_ms),
                directory.clone(),
            )?;
            (Arc::new(live), "real_data")
        }
        ProviderKind::Synthetic => {
            warn!("Using generated sample data – predictions are for demonstration only");
            (Arc::new(SyntheticProvider::new()), "sample_data")
        }
    };

    let policy = EvictionPolicy::from_capacity(config.cache_capacity);
    info!("Game-log cache policy: {:?}", policy);
    let cache = GameLogCache::new(provider, policy);
    let predictor = Predictor::new(cache, config.season);

    // One-shot report mode
    if let Some(player) = config.player.as_deref() {
        let stat = config.stat.as_deref().unwrap_or_default();
        let threshold = config.threshold.unwrap_or_default();
        let query = PredictionQuery::new(player, stat, threshold)
            .opponent(config.opponent.as_deref())
            .last_n(config.last_n)
            .provider_id(directory.resolve(player));

        let result = predictor.predict_result(&query).await;
        print!("{}", report::render_report(&result));
        if result.is_error() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let state = AppState {
        predictor,
        directory,
        api_mode,
    };
    let app = dashboard::router(state);
    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Prediction API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
