//! The game feed: the single task that owns the scoreboard.
//!
//! Producers (the simulator, `POST /events`) submit [`MatchEvent`]s through a
//! [`FeedHandle`]. The feed applies each one, publishes the resulting
//! `gameUpdate` through the hub and replies to the submitter. Readers get
//! copies of the scoreboard through a `watch` channel; the hub reads the same
//! channel for initial state.

pub mod simulator;

pub use simulator::{Simulator, match_minute, plan_tick};

use std::sync::Arc;

use chrono::Utc;
use livescore_core::{Event, Game, InitialState, MatchEvent, Scoreboard, ScoreboardError};
use metrics::counter;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::hub::{BroadcastHub, SnapshotSource};
use crate::metrics::FEED_EVENTS_TOTAL;

/// Pending commands buffered before submitters wait.
const COMMAND_QUEUE: usize = 64;

/// Errors returned to producers.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed task has stopped.
    #[error("game feed is not running")]
    Stopped,
    /// The event broke a scoreboard rule.
    #[error(transparent)]
    Rejected(#[from] ScoreboardError),
}

enum FeedCommand {
    Apply {
        event: MatchEvent,
        reply: oneshot::Sender<Result<Game, ScoreboardError>>,
    },
}

/// Cloneable producer/reader handle to a running feed.
#[derive(Clone)]
pub struct FeedHandle {
    tx: mpsc::Sender<FeedCommand>,
    snapshots: watch::Receiver<InitialState>,
}

impl FeedHandle {
    /// Apply `event` and return the updated game.
    ///
    /// Resolves after the update has been handed to every connected client's
    /// queue.
    pub async fn submit(&self, event: MatchEvent) -> Result<Game, FeedError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(FeedCommand::Apply { event, reply })
            .await
            .map_err(|_| FeedError::Stopped)?;
        let result = response.await.map_err(|_| FeedError::Stopped)?;
        Ok(result?)
    }

    /// Copy of every game, in id order.
    pub fn games(&self) -> Vec<Game> {
        self.snapshots.borrow().games.clone()
    }

    /// Number of tracked games.
    pub fn game_count(&self) -> usize {
        self.snapshots.borrow().games.len()
    }
}

/// Read side of the feed, used by the hub for initial state.
#[derive(Clone)]
pub struct FeedSnapshots(watch::Receiver<InitialState>);

impl SnapshotSource for FeedSnapshots {
    fn snapshot(&self) -> InitialState {
        self.0.borrow().clone()
    }
}

/// Owner of the scoreboard. Build with [`GameFeed::new`], then [`spawn`].
///
/// [`spawn`]: GameFeed::spawn
pub struct GameFeed {
    board: Scoreboard,
    commands: mpsc::Receiver<FeedCommand>,
    snapshot_tx: watch::Sender<InitialState>,
}

impl GameFeed {
    /// Take ownership of `board`.
    pub fn new(board: Scoreboard) -> (Self, FeedHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let (snapshot_tx, snapshots) = watch::channel(board.snapshot());
        let feed = Self {
            board,
            commands,
            snapshot_tx,
        };
        (feed, FeedHandle { tx, snapshots })
    }

    /// A snapshot reader for the hub.
    pub fn snapshots(&self) -> FeedSnapshots {
        FeedSnapshots(self.snapshot_tx.subscribe())
    }

    /// Run the feed until `cancel` fires or every [`FeedHandle`] is dropped.
    pub fn spawn(self, hub: Arc<BroadcastHub>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(hub, cancel))
    }

    async fn run(mut self, hub: Arc<BroadcastHub>, cancel: CancellationToken) {
        info!(games = self.board.len(), "game feed started");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                command = self.commands.recv() => {
                    let Some(FeedCommand::Apply { event, reply }) = command else { break };
                    let result = self.apply(&hub, &event).await;
                    let _ = reply.send(result);
                }
            }
        }
        info!("game feed stopped");
    }

    async fn apply(
        &mut self,
        hub: &BroadcastHub,
        event: &MatchEvent,
    ) -> Result<Game, ScoreboardError> {
        let kind = event.kind();
        let game = match self.board.apply(event, Utc::now()) {
            Ok(game) => game,
            Err(err) => {
                counter!(FEED_EVENTS_TOTAL, "kind" => kind, "outcome" => "rejected").increment(1);
                debug!(kind, game_id = %event.game_id(), error = %err, "match event rejected");
                return Err(err);
            }
        };
        counter!(FEED_EVENTS_TOTAL, "kind" => kind, "outcome" => "applied").increment(1);
        info!(
            kind,
            game_id = %game.id,
            home_score = game.home_score,
            away_score = game.away_score,
            status = %game.status,
            "match event applied"
        );

        let snapshot = self.board.snapshot();
        let snapshot_tx = &self.snapshot_tx;
        let update = Event::GameUpdate(game.clone());
        let published = hub
            .publish_with_commit(&update, move || {
                let _ = snapshot_tx.send_replace(snapshot);
            })
            .await;

        match published {
            Ok(report) => debug!(
                game_id = %game.id,
                recipients = report.recipients,
                evicted = report.evicted,
                "game update published"
            ),
            Err(err) => {
                error!(game_id = %game.id, error = %err, "failed to publish game update");
                let _ = self.snapshot_tx.send_replace(self.board.snapshot());
            }
        }
        Ok(game)
    }
}
