//! # Participant Routes
//!
//! - `POST /v1/participants` — enroll at the caller's site
//! - `GET  /v1/participants` — list participants in scope
//! - `GET  /v1/participants/code-broken` — code-broken participants in scope
//! - `GET  /v1/participants/{id}/history` — one participant's ledger history
//! - `POST /v1/participants/{id}/screen-failure` — record screen failure
//! - `POST /v1/participants/{id}/randomize` — randomize via the allocator
//! - `POST /v1/participants/{id}/complete-treatment` — record completion
//! - `POST /v1/participants/{id}/code-break` — emergency unblinding

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use rtsm_core::{ParticipantId, TrialDate};
use rtsm_registry::HistoryEvent;
use rtsm_state::{EnrollmentForm, Participant};

use crate::error::AppError;
use crate::extract::ActorCredentials;
use crate::state::AppState;

/// Router for participant lifecycle endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/participants", post(enroll).get(list))
        .route("/v1/participants/code-broken", get(list_code_broken))
        .route("/v1/participants/{id}/history", get(history))
        .route("/v1/participants/{id}/screen-failure", post(screen_failure))
        .route("/v1/participants/{id}/randomize", post(randomize))
        .route(
            "/v1/participants/{id}/complete-treatment",
            post(complete_treatment),
        )
        .route("/v1/participants/{id}/code-break", post(code_break))
}

#[derive(Debug, Deserialize)]
struct DatedRequest {
    date: TrialDate,
}

#[derive(Debug, Deserialize)]
struct CodeBreakRequest {
    date: TrialDate,
    reason: String,
}

async fn enroll(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
    Json(form): Json<EnrollmentForm>,
) -> Result<Json<Participant>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    Ok(Json(state.service.enroll(&identity, form)?))
}

async fn list(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
) -> Result<Json<Vec<Participant>>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    Ok(Json(state.service.list_participants(&identity)?))
}

async fn list_code_broken(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
) -> Result<Json<Vec<Participant>>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    Ok(Json(state.service.list_code_broken(&identity)?))
}

async fn history(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
    Path(id): Path<String>,
) -> Result<Json<Vec<HistoryEvent>>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    let id = ParticipantId::new(id)?;
    Ok(Json(state.service.participant_history(&identity, &id)?))
}

async fn screen_failure(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
    Path(id): Path<String>,
    Json(request): Json<DatedRequest>,
) -> Result<Json<Participant>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    let id = ParticipantId::new(id)?;
    Ok(Json(state.service.record_screen_failure(
        &identity,
        &id,
        request.date,
    )?))
}

async fn randomize(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
    Path(id): Path<String>,
) -> Result<Json<Participant>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    let id = ParticipantId::new(id)?;
    Ok(Json(state.service.randomize(&identity, &id)?))
}

async fn complete_treatment(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
    Path(id): Path<String>,
    Json(request): Json<DatedRequest>,
) -> Result<Json<Participant>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    let id = ParticipantId::new(id)?;
    Ok(Json(state.service.complete_treatment(
        &identity,
        &id,
        request.date,
    )?))
}

async fn code_break(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
    Path(id): Path<String>,
    Json(request): Json<CodeBreakRequest>,
) -> Result<Json<Participant>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    let id = ParticipantId::new(id)?;
    Ok(Json(state.service.break_code(
        &identity,
        &id,
        request.date,
        request.reason,
    )?))
}
