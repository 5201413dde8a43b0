//! # livescore-core
//!
//! Domain vocabulary for the livescore broadcast hub.
//!
//! - **IDs**: `GameId` and `ConnectionId` newtypes
//! - **Games**: `Game`, `Scorer`, `GameStatus`, `Side`
//! - **Events**: `MatchEvent` (producer input), `Event` (broadcast kinds),
//!   `InitialState` and the `ServerMessage` wire envelope
//! - **Scoreboard**: the in-memory domain state and its transition rules
//! - **Errors**: `ScoreboardError` via `thiserror`

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod game;
pub mod ids;
pub mod scoreboard;

pub use errors::ScoreboardError;
pub use events::{Event, InitialState, MatchEvent, ServerMessage};
pub use game::{Game, GameStatus, Scorer, Side};
pub use ids::{ConnectionId, GameId};
pub use scoreboard::Scoreboard;
