//! Built-in match simulator.
//!
//! Every tick: active games below the goal cap get a home goal, active games
//! at the cap get the final whistle, pending games kick off.

use std::time::Duration;

use chrono::{DateTime, Utc};
use livescore_core::{Game, GameStatus, MatchEvent, Side};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{FeedError, FeedHandle};

/// Events for one simulator tick, in game id order.
pub fn plan_tick(games: &[Game], max_home_goals: u32, minute: u8) -> Vec<MatchEvent> {
    games
        .iter()
        .filter_map(|game| {
            let game_id = game.id.clone();
            match game.status {
                GameStatus::Active if game.home_score < max_home_goals => Some(MatchEvent::Goal {
                    game_id,
                    side: Side::Home,
                    player_name: format!("Player {}", game.home_score + 1),
                    minute,
                }),
                GameStatus::Active => Some(MatchEvent::FullTime { game_id }),
                GameStatus::Pending => Some(MatchEvent::Kickoff { game_id }),
                GameStatus::Finished => None,
            }
        })
        .collect()
}

/// Match minute derived from wall-clock seconds: `1..=90`.
pub fn match_minute(now: DateTime<Utc>) -> u8 {
    let minute = now.timestamp().rem_euclid(90) + 1;
    u8::try_from(minute).unwrap_or(90)
}

/// Periodic producer feeding simulated events into the game feed.
pub struct Simulator {
    feed: FeedHandle,
    tick_interval: Duration,
    max_home_goals: u32,
}

impl Simulator {
    /// Create a simulator ticking every `tick_interval`.
    pub fn new(feed: FeedHandle, tick_interval: Duration, max_home_goals: u32) -> Self {
        Self {
            feed,
            tick_interval,
            max_home_goals,
        }
    }

    /// Run until `cancel` fires or the feed stops.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    async fn run(self, cancel: CancellationToken) {
        info!(
            tick_ms = u64::try_from(self.tick_interval.as_millis()).unwrap_or(u64::MAX),
            max_home_goals = self.max_home_goals,
            "simulator started"
        );
        let mut ticker = tokio::time::interval(self.tick_interval);
        let _ = ticker.tick().await;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if self.tick().await.is_err() {
                        break;
                    }
                }
            }
        }
        info!("simulator stopped");
    }

    /// Plan and submit one tick. Returns how many events were applied, or
    /// [`FeedError::Stopped`] once the feed is gone.
    pub async fn tick(&self) -> Result<usize, FeedError> {
        let events = plan_tick(&self.feed.games(), self.max_home_goals, match_minute(Utc::now()));
        let mut applied = 0;
        for event in events {
            match self.feed.submit(event).await {
                Ok(_) => applied += 1,
                Err(FeedError::Stopped) => return Err(FeedError::Stopped),
                Err(err) => debug!(error = %err, "simulated event rejected"),
            }
        }
        Ok(applied)
    }
}
