use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Shared, read-only game log for one (athlete, season) pair.
pub type GameLog = Arc<Vec<GameRecord>>;

/// Stats that can be predicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    #[serde(rename = "points")]
    Points,
    #[serde(rename = "assists")]
    Assists,
    #[serde(rename = "rebounds")]
    Rebounds,
    #[serde(rename = "steals")]
    Steals,
    #[serde(rename = "blocks")]
    Blocks,
    #[serde(rename = "3pm")]
    ThreePointersMade,
}

impl StatKind {
    pub const ALL: [StatKind; 6] = [
        StatKind::Points,
        StatKind::Assists,
        StatKind::Rebounds,
        StatKind::Steals,
        StatKind::Blocks,
        StatKind::ThreePointersMade,
    ];

    /// Canonical key used on the wire and in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::Points => "points",
            StatKind::Assists => "assists",
            StatKind::Rebounds => "rebounds",
            StatKind::Steals => "steals",
            StatKind::Blocks => "blocks",
            StatKind::ThreePointersMade => "3pm",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatKind::Points => "Points",
            StatKind::Assists => "Assists",
            StatKind::Rebounds => "Rebounds",
            StatKind::Steals => "Steals",
            StatKind::Blocks => "Blocks",
            StatKind::ThreePointersMade => "3-Pointers Made",
        }
    }

    pub fn available_keys() -> Vec<&'static str> {
        StatKind::ALL.iter().map(StatKind::as_str).collect()
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stat name is outside the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown stat '{0}'")]
pub struct UnknownStatName(pub String);

impl FromStr for StatKind {
    type Err = UnknownStatName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "points" => Ok(StatKind::Points),
            "assists" => Ok(StatKind::Assists),
            "rebounds" => Ok(StatKind::Rebounds),
            "steals" => Ok(StatKind::Steals),
            "blocks" => Ok(StatKind::Blocks),
            "3pm" | "three_pointers_made" | "three-pointers-made" | "threes" => {
                Ok(StatKind::ThreePointersMade)
            }
            _ => Err(UnknownStatName(s.to_string())),
        }
    }
}

/// Per-game box score values. A stat the source did not report is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    pub points: Option<f64>,
    pub assists: Option<f64>,
    pub rebounds: Option<f64>,
    pub steals: Option<f64>,
    pub blocks: Option<f64>,
    #[serde(rename = "3pm")]
    pub three_pointers_made: Option<f64>,
    /// Minutes played; informational only.
    pub minutes: Option<f64>,
}

impl StatLine {
    pub fn get(&self, kind: StatKind) -> Option<f64> {
        match kind {
            StatKind::Points => self.points,
            StatKind::Assists => self.assists,
            StatKind::Rebounds => self.rebounds,
            StatKind::Steals => self.steals,
            StatKind::Blocks => self.blocks,
            StatKind::ThreePointersMade => self.three_pointers_made,
        }
    }

    pub fn set(&mut self, kind: StatKind, value: Option<f64>) {
        let slot = match kind {
            StatKind::Points => &mut self.points,
            StatKind::Assists => &mut self.assists,
            StatKind::Rebounds => &mut self.rebounds,
            StatKind::Steals => &mut self.steals,
            StatKind::Blocks => &mut self.blocks,
            StatKind::ThreePointersMade => &mut self.three_pointers_made,
        };
        *slot = value;
    }
}

/// One completed game for one athlete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub date: NaiveDate,
    /// Opponent team code or name, e.g. "GSW".
    pub opponent: String,
    #[serde(flatten)]
    pub stats: StatLine,
}

impl GameRecord {
    pub fn stat(&self, kind: StatKind) -> Option<f64> {
        self.stats.get(kind)
    }
}
