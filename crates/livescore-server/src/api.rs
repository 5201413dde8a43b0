//! Producer and read-only HTTP endpoints.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use livescore_core::{Game, MatchEvent, ScoreboardError};
use serde_json::json;
use tracing::debug;

use crate::feed::FeedError;
use crate::server::AppState;

/// Errors returned by the producer endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body is not a valid match event.
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    /// The event broke a scoreboard rule.
    #[error(transparent)]
    Rejected(#[from] ScoreboardError),
    /// The feed is not running.
    #[error("game feed is not running")]
    FeedStopped,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidEvent(_) => StatusCode::BAD_REQUEST,
            Self::Rejected(ScoreboardError::UnknownGame(_)) => StatusCode::NOT_FOUND,
            Self::Rejected(
                ScoreboardError::GameExists(_) | ScoreboardError::InvalidTransition { .. },
            ) => StatusCode::CONFLICT,
            Self::Rejected(ScoreboardError::InvalidField { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::FeedStopped => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEvent(_) => "invalid_event",
            Self::Rejected(ScoreboardError::UnknownGame(_)) => "unknown_game",
            Self::Rejected(ScoreboardError::GameExists(_)) => "game_exists",
            Self::Rejected(ScoreboardError::InvalidTransition { .. }) => "invalid_transition",
            Self::Rejected(ScoreboardError::InvalidField { .. }) => "invalid_field",
            Self::FeedStopped => "feed_stopped",
        }
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Stopped => Self::FeedStopped,
            FeedError::Rejected(rejection) => Self::Rejected(rejection),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidEvent(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

/// `POST /events`: apply a match event and broadcast the updated game.
///
/// Returns `202 Accepted` with the game once the update has been handed to
/// the hub.
pub async fn submit_event(
    State(state): State<AppState>,
    payload: Result<Json<MatchEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<Game>), ApiError> {
    let Json(event) = payload?;
    debug!(kind = event.kind(), game_id = %event.game_id(), "match event received");
    let game = state.feed.submit(event).await?;
    Ok((StatusCode::ACCEPTED, Json(game)))
}

/// `GET /games`: current scoreboard, in id order.
pub async fn list_games(State(state): State<AppState>) -> Json<Vec<Game>> {
    Json(state.feed.games())
}
