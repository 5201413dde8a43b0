//! Producer input, broadcast events and the client wire envelope.
//!
//! Everything pushed to a client is a `{"type": ..., "data": ...}` envelope.
//! Two kinds exist on the wire: `initialGames` (sent once, to a freshly
//! connected client) and `gameUpdate` (broadcast to everyone).

use serde::{Deserialize, Serialize};

use crate::game::{Game, Side};
use crate::ids::GameId;

/// A state change submitted by a producer (simulator or `POST /events`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MatchEvent {
    /// Schedule a new game.
    Fixture {
        /// Id of the new game; must not exist yet.
        game_id: GameId,
        /// Home team name.
        home_team: String,
        /// Away team name.
        away_team: String,
    },
    /// Move a pending game to active.
    Kickoff {
        /// Target game.
        game_id: GameId,
    },
    /// Record a goal in an active game.
    Goal {
        /// Target game.
        game_id: GameId,
        /// Side the goal counts for.
        side: Side,
        /// Scorer name.
        player_name: String,
        /// Match minute.
        minute: u8,
    },
    /// Finish an active game.
    FullTime {
        /// Target game.
        game_id: GameId,
    },
}

impl MatchEvent {
    /// The game this event targets.
    pub fn game_id(&self) -> &GameId {
        match self {
            Self::Fixture { game_id, .. }
            | Self::Kickoff { game_id }
            | Self::Goal { game_id, .. }
            | Self::FullTime { game_id } => game_id,
        }
    }

    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fixture { .. } => "fixture",
            Self::Kickoff { .. } => "kickoff",
            Self::Goal { .. } => "goal",
            Self::FullTime { .. } => "fullTime",
        }
    }
}

/// A broadcastable state change. Immutable once built.
///
/// Serializing an `Event` yields its wire envelope directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Event {
    /// Full current state of one game after a change.
    GameUpdate(Game),
}

impl Event {
    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GameUpdate(_) => "gameUpdate",
        }
    }

    /// Encode as a wire envelope.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Snapshot pushed to a newly connected client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InitialState {
    /// Every tracked game, ordered by id.
    pub games: Vec<Game>,
}

#[derive(Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
enum Greeting<'a> {
    InitialGames(&'a [Game]),
}

impl InitialState {
    /// Encode as an `initialGames` wire envelope.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(&Greeting::InitialGames(&self.games))
    }
}

/// Any frame a client may receive. Used by clients and tests to decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Full snapshot, first frame on every connection.
    InitialGames(Vec<Game>),
    /// One game changed.
    GameUpdate(Game),
}

impl From<Event> for ServerMessage {
    fn from(event: Event) -> Self {
        match event {
            Event::GameUpdate(game) => Self::GameUpdate(game),
        }
    }
}

impl From<InitialState> for ServerMessage {
    fn from(state: InitialState) -> Self {
        Self::InitialGames(state.games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn goal_decodes_from_camel_case() {
        let raw = json!({
            "type": "goal",
            "gameId": "game1",
            "side": "home",
            "playerName": "Player 1",
            "minute": 12
        });
        let event: MatchEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(
            event,
            MatchEvent::Goal {
                game_id: "game1".into(),
                side: Side::Home,
                player_name: "Player 1".into(),
                minute: 12,
            }
        );
        assert_eq!(event.kind(), "goal");
        assert_eq!(event.game_id().as_str(), "game1");
    }

    #[test]
    fn full_time_tag_is_camel_case() {
        let event: MatchEvent =
            serde_json::from_str(r#"{"type":"fullTime","gameId":"g9"}"#).unwrap();
        assert_eq!(event, MatchEvent::FullTime { game_id: "g9".into() });
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let result = serde_json::from_str::<MatchEvent>(r#"{"type":"redCard","gameId":"g1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn goal_without_minute_is_rejected() {
        let result = serde_json::from_str::<MatchEvent>(
            r#"{"type":"goal","gameId":"g1","side":"away","playerName":"X"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn game_update_envelope_shape() {
        let game = Game::fixture("g1", "A", "B", Utc::now());
        let encoded = Event::GameUpdate(game).encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["type"], "gameUpdate");
        assert_eq!(value["data"]["id"], "g1");
        assert_eq!(value["data"]["homeScore"], 0);
    }

    #[test]
    fn initial_state_envelope_shape() {
        let empty = InitialState::default().encode().unwrap();
        assert_eq!(empty, r#"{"type":"initialGames","data":[]}"#);

        let state = InitialState {
            games: vec![Game::fixture("g1", "A", "B", Utc::now())],
        };
        let value: serde_json::Value = serde_json::from_str(&state.encode().unwrap()).unwrap();
        assert_eq!(value["data"][0]["awayTeam"], "B");
    }

    #[test]
    fn server_message_decodes_both_kinds() {
        let game = Game::fixture("g1", "A", "B", Utc::now());
        let update = Event::GameUpdate(game.clone()).encode().unwrap();
        let initial = InitialState { games: vec![game.clone()] }.encode().unwrap();

        let update: ServerMessage = serde_json::from_str(&update).unwrap();
        let initial: ServerMessage = serde_json::from_str(&initial).unwrap();
        assert_eq!(update, ServerMessage::GameUpdate(game.clone()));
        assert_eq!(initial, ServerMessage::InitialGames(vec![game]));
    }
}
