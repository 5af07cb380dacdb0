use anyhow::Result;
use async_trait::async_trait;

use super::models::GameRecord;

/// Trait that every game-log source must implement.
#[async_trait]
pub trait GameLogProvider: Send + Sync {
    /// Fetch every game the athlete played in `season`.
    ///
    /// One attempt, no retries. `provider_id` is an already-resolved
    /// source-specific identifier, when the caller has one.
    async fn fetch_game_log(
        &self,
        athlete: &str,
        season: i32,
        provider_id: Option<&str>,
    ) -> Result<Vec<GameRecord>>;

    /// Human-readable name for logging and result labelling.
    fn name(&self) -> &str;
}
