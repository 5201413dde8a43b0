//! Domain error types.

use thiserror::Error;

use crate::game::GameStatus;
use crate::ids::GameId;

/// A match event that cannot be applied to the scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreboardError {
    /// The event targets a game that is not tracked.
    #[error("unknown game: {0}")]
    UnknownGame(GameId),
    /// A fixture reused an existing id.
    #[error("game already exists: {0}")]
    GameExists(GameId),
    /// The event is not legal in the game's current state.
    #[error("cannot {action} game {game_id} while {status}")]
    InvalidTransition {
        /// Target game.
        game_id: GameId,
        /// Current state.
        status: GameStatus,
        /// What was attempted.
        action: &'static str,
    },
    /// The event carries a malformed field.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Result type for scoreboard operations.
pub type Result<T> = std::result::Result<T, ScoreboardError>;
