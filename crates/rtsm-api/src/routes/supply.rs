//! # Supply Chain Routes
//!
//! - `POST /v1/consignments` — raise a depot→site consignment
//! - `GET  /v1/consignments` — depot-wide consignment list
//! - `GET  /v1/shipments/pending` — unarrived shipments for the caller's site
//! - `POST /v1/shipments/arrival` — record a shipment arrival

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use rtsm_core::{PackId, SiteCode, TrialDate};
use rtsm_registry::ArrivalOutcome;
use rtsm_state::{ArrivalStatus, Consignment};

use crate::error::AppError;
use crate::extract::ActorCredentials;
use crate::state::AppState;

/// Router for supply-chain endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/consignments", post(raise_consignment).get(list_consignments))
        .route("/v1/shipments/pending", get(pending_shipments))
        .route("/v1/shipments/arrival", post(record_arrival))
}

#[derive(Debug, Deserialize)]
struct RaiseConsignmentRequest {
    pack_id: String,
    destination: String,
    raise_date: TrialDate,
}

#[derive(Debug, Deserialize)]
struct ArrivalRequest {
    pack_id: String,
    status: String,
    arrival_date: TrialDate,
    #[serde(default)]
    notes: String,
}

/// Outcome of an arrival submission, flattened for the wire.
#[derive(Debug, Serialize)]
struct ArrivalResponse {
    pack_id: String,
    status: ArrivalStatus,
}

impl From<ArrivalOutcome> for ArrivalResponse {
    fn from(outcome: ArrivalOutcome) -> Self {
        let status = outcome.status();
        let pack_id = match outcome {
            ArrivalOutcome::Recorded(arrival) => arrival.pack.to_string(),
            ArrivalOutcome::Duplicate { pack } | ArrivalOutcome::Invalid { pack } => {
                pack.to_string()
            }
        };
        Self { pack_id, status }
    }
}

async fn raise_consignment(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
    Json(request): Json<RaiseConsignmentRequest>,
) -> Result<Json<Consignment>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    let pack = PackId::new(request.pack_id)?;
    let destination = SiteCode::new(request.destination)?;
    Ok(Json(state.service.raise_consignment(
        &identity,
        pack,
        destination,
        request.raise_date,
    )?))
}

async fn list_consignments(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
) -> Result<Json<Vec<Consignment>>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    Ok(Json(state.service.list_consignments(&identity)?))
}

async fn pending_shipments(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
) -> Result<Json<Vec<Consignment>>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    Ok(Json(state.service.list_pending_shipments(&identity)?))
}

async fn record_arrival(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
    Json(request): Json<ArrivalRequest>,
) -> Result<Json<ArrivalResponse>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    let pack = PackId::new(request.pack_id)?;
    let condition = ArrivalStatus::from_str(&request.status)?;
    let outcome = state.service.record_arrival(
        &identity,
        pack,
        condition,
        request.arrival_date,
        request.notes,
    )?;
    Ok(Json(outcome.into()))
}
