//! Opponent and recency filters over a game log.
//!
//! Filters borrow the source log and return reduced views; the log itself
//! is never reordered or modified.

use crate::game_log::GameRecord;

/// Keep games whose opponent contains `opponent` (case-insensitive).
pub fn filter_by_opponent<'a, I>(games: I, opponent: &str) -> Vec<&'a GameRecord>
where
    I: IntoIterator<Item = &'a GameRecord>,
{
    let needle = opponent.to_lowercase();
    games
        .into_iter()
        .filter(|g| g.opponent.to_lowercase().contains(&needle))
        .collect()
}

/// The `n` most recent games, newest first. Keeps everything if `n` exceeds
/// the number of games.
pub fn take_most_recent<'a, I>(games: I, n: usize) -> Vec<&'a GameRecord>
where
    I: IntoIterator<Item = &'a GameRecord>,
{
    let mut view: Vec<&GameRecord> = games.into_iter().collect();
    view.sort_by(|a, b| b.date.cmp(&a.date));
    view.truncate(n);
    view
}

/// Opponent filter first, then recency. `last_n` of `None` or `Some(0)`
/// means the full season.
pub fn apply_filters<'a>(
    games: &'a [GameRecord],
    opponent: Option<&str>,
    last_n: Option<usize>,
) -> Vec<&'a GameRecord> {
    let view = match opponent {
        Some(opp) => filter_by_opponent(games, opp),
        None => games.iter().collect(),
    };
    match last_n {
        Some(n) if n > 0 => take_most_recent(view, n),
        _ => view,
    }
}

/// Order a view oldest → newest. Stable, so same-day games keep their order.
pub fn chronological<'a>(mut view: Vec<&'a GameRecord>) -> Vec<&'a GameRecord> {
    view.sort_by_key(|g| g.date);
    view
}
