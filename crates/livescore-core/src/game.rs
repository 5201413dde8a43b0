//! Tracked games and goal scorers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::GameId;

/// Lifecycle of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Scheduled, not kicked off.
    Pending,
    /// In play; goals may be recorded.
    Active,
    /// Final whistle blown.
    Finished,
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Active => f.write_str("active"),
            Self::Finished => f.write_str("finished"),
        }
    }
}

/// Which team a goal counts for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The home team.
    Home,
    /// The away team.
    Away,
}

/// A goal scorer entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scorer {
    /// Player name as reported.
    pub player_name: String,
    /// Team name the goal counts for.
    pub team: String,
    /// Match minute.
    pub minute: u8,
}

/// One tracked football game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Game identifier.
    pub id: GameId,
    /// Home team name.
    pub home_team: String,
    /// Away team name.
    pub away_team: String,
    /// Home goals.
    pub home_score: u32,
    /// Away goals.
    pub away_score: u32,
    /// Goals in the order they were recorded.
    pub scorers: Vec<Scorer>,
    /// Current lifecycle state.
    pub status: GameStatus,
    /// Time of the last applied change.
    pub last_update: DateTime<Utc>,
}

impl Game {
    /// A pending fixture with a 0-0 score.
    pub fn fixture(
        id: impl Into<GameId>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_score: 0,
            away_score: 0,
            scorers: Vec::new(),
            status: GameStatus::Pending,
            last_update: now,
        }
    }

    /// Team name for a side.
    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }
}
