use clap::{Parser, ValueEnum};

/// Where game logs come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Deterministic generated logs (demo/testing only)
    Synthetic,
    /// Box-score HTTP API
    Live,
}

/// Player stat prop prediction service
#[derive(Parser, Debug, Clone)]
#[command(name = "prop-predictor", version, about)]
pub struct Config {
    /// Game-log source
    #[arg(long, env = "DATA_PROVIDER", value_enum, default_value = "synthetic")]
    pub provider: ProviderKind,

    /// Box-score API base URL (live provider)
    #[arg(long, env = "LIVE_API_URL", default_value = "http://localhost:8000/api")]
    pub live_api_url: String,

    /// Box-score API key (live provider)
    #[arg(long, env = "LIVE_API_KEY")]
    pub live_api_key: Option<String>,

    /// Per-request timeout against the box-score API, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "10")]
    pub request_timeout_secs: u64,

    /// Minimum spacing between box-score API requests, in milliseconds
    #[arg(long, env = "MIN_REQUEST_INTERVAL_MS", default_value = "3000")]
    pub min_request_interval_ms: u64,

    /// Season (end year) used when a request does not name one
    #[arg(long, env = "SEASON", default_value = "2024")]
    pub season: i32,

    /// Maximum cached game logs (LRU); unbounded when unset
    #[arg(long, env = "CACHE_CAPACITY")]
    pub cache_capacity: Option<usize>,

    /// HTTP listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:5000")]
    pub listen_addr: String,

    /// Print a single report for this player and exit instead of serving
    #[arg(long)]
    pub player: Option<String>,

    /// Stat for report mode (points, assists, rebounds, steals, blocks, 3pm)
    #[arg(long)]
    pub stat: Option<String>,

    /// Threshold for report mode
    #[arg(long, allow_hyphen_values = true)]
    pub threshold: Option<f64>,

    /// Opponent filter for report mode
    #[arg(long)]
    pub opponent: Option<String>,

    /// Most recent N games for report mode
    #[arg(long)]
    pub last_n: Option<usize>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.provider == ProviderKind::Live {
            url::Url::parse(&self.live_api_url).map_err(|e| {
                anyhow::anyhow!("LIVE_API_URL '{}' is not a valid URL: {}", self.live_api_url, e)
            })?;
        }
        if self.cache_capacity == Some(0) {
            anyhow::bail!("cache_capacity must be positive (omit it for an unbounded cache)");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be positive");
        }
        if self.player.is_some() {
            if self.stat.is_none() {
                anyhow::bail!("--stat is required with --player");
            }
            match self.threshold {
                None => anyhow::bail!("--threshold is required with --player"),
                Some(t) if !t.is_finite() => anyhow::bail!("--threshold must be a finite number"),
                Some(_) => {}
            }
        }
        Ok(())
    }
}
