//! # Authentication Routes
//!
//! - `POST /v1/auth/login` — verify credentials, return the resolved
//!   identity (role + scope) for the UI to shape its navigation around.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use rtsm_service::Identity;

use crate::error::AppError;
use crate::extract::ActorCredentials;
use crate::state::AppState;

/// Router for authentication endpoints.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/auth/login", post(login))
}

async fn login(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
) -> Result<Json<Identity>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    Ok(Json(identity))
}
