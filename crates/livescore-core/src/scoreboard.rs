//! In-memory scoreboard and its transition rules.
//!
//! The scoreboard is plain data with no interior locking. The server gives
//! it a single owning task; everything else sees copies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::errors::{Result, ScoreboardError};
use crate::events::{InitialState, MatchEvent};
use crate::game::{Game, GameStatus, Scorer, Side};
use crate::ids::GameId;

/// Latest minute a goal may be recorded at (extra time plus stoppage).
pub const MAX_MINUTE: u8 = 130;

/// All tracked games, keyed and iterated by id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scoreboard {
    games: BTreeMap<GameId, Game>,
}

impl Scoreboard {
    /// An empty scoreboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// The three fixtures the service starts with when the simulator runs.
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let mut game1 = Game::fixture("game1", "Nyasa Big Bullets", "Mighty Wanderers", now);
        game1.status = GameStatus::Active;

        let game2 = Game::fixture("game2", "Silver Strikers", "Civil Service United", now);

        let mut game3 = Game::fixture("game3", "Blue Eagles", "Ekwendeni Hammers", now);
        game3.status = GameStatus::Active;
        game3.home_score = 1;
        game3.scorers.push(Scorer {
            player_name: "Chikondi Banda".into(),
            team: "Blue Eagles".into(),
            minute: 25,
        });

        let mut board = Self::new();
        for game in [game1, game2, game3] {
            let _ = board.games.insert(game.id.clone(), game);
        }
        board
    }

    /// Look up a game.
    pub fn get(&self, id: &GameId) -> Option<&Game> {
        self.games.get(id)
    }

    /// Number of tracked games.
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// Whether no games are tracked.
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Iterate games in id order.
    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.games.values()
    }

    /// Copy of every game, in id order.
    pub fn snapshot(&self) -> InitialState {
        InitialState {
            games: self.games.values().cloned().collect(),
        }
    }

    /// Apply one match event and return the updated game.
    ///
    /// On error the scoreboard is left untouched.
    pub fn apply(&mut self, event: &MatchEvent, now: DateTime<Utc>) -> Result<Game> {
        match event {
            MatchEvent::Fixture {
                game_id,
                home_team,
                away_team,
            } => self.add_fixture(game_id, home_team, away_team, now),
            MatchEvent::Kickoff { game_id } => {
                let game = self.game_mut(game_id)?;
                require_status(game, GameStatus::Pending, "kick off")?;
                game.status = GameStatus::Active;
                game.last_update = now;
                Ok(game.clone())
            }
            MatchEvent::Goal {
                game_id,
                side,
                player_name,
                minute,
            } => self.record_goal(game_id, *side, player_name, *minute, now),
            MatchEvent::FullTime { game_id } => {
                let game = self.game_mut(game_id)?;
                require_status(game, GameStatus::Active, "finish")?;
                game.status = GameStatus::Finished;
                game.last_update = now;
                Ok(game.clone())
            }
        }
    }

    fn add_fixture(
        &mut self,
        game_id: &GameId,
        home_team: &str,
        away_team: &str,
        now: DateTime<Utc>,
    ) -> Result<Game> {
        if game_id.as_str().trim().is_empty() {
            return Err(invalid("gameId", "must not be empty"));
        }
        let home_team = home_team.trim();
        let away_team = away_team.trim();
        if home_team.is_empty() || away_team.is_empty() {
            return Err(invalid("team", "team names must not be empty"));
        }
        if home_team.eq_ignore_ascii_case(away_team) {
            return Err(invalid("team", "home and away teams must differ"));
        }
        if self.games.contains_key(game_id) {
            return Err(ScoreboardError::GameExists(game_id.clone()));
        }

        let game = Game::fixture(game_id.clone(), home_team, away_team, now);
        let _ = self.games.insert(game_id.clone(), game.clone());
        Ok(game)
    }

    fn record_goal(
        &mut self,
        game_id: &GameId,
        side: Side,
        player_name: &str,
        minute: u8,
        now: DateTime<Utc>,
    ) -> Result<Game> {
        let player_name = player_name.trim();
        if player_name.is_empty() {
            return Err(invalid("playerName", "must not be empty"));
        }
        if !(1..=MAX_MINUTE).contains(&minute) {
            return Err(invalid(
                "minute",
                &format!("must be between 1 and {MAX_MINUTE}, got {minute}"),
            ));
        }

        let game = self.game_mut(game_id)?;
        require_status(game, GameStatus::Active, "score in")?;
        match side {
            Side::Home => game.home_score += 1,
            Side::Away => game.away_score += 1,
        }
        let team = game.team(side).to_owned();
        game.scorers.push(Scorer {
            player_name: player_name.to_owned(),
            team,
            minute,
        });
        game.last_update = now;
        Ok(game.clone())
    }

    fn game_mut(&mut self, id: &GameId) -> Result<&mut Game> {
        self.games
            .get_mut(id)
            .ok_or_else(|| ScoreboardError::UnknownGame(id.clone()))
    }
}

fn require_status(game: &Game, expected: GameStatus, action: &'static str) -> Result<()> {
    if game.status == expected {
        Ok(())
    } else {
        Err(ScoreboardError::InvalidTransition {
            game_id: game.id.clone(),
            status: game.status,
            action,
        })
    }
}

fn invalid(field: &'static str, reason: &str) -> ScoreboardError {
    ScoreboardError::InvalidField {
        field,
        reason: reason.to_owned(),
    }
}
