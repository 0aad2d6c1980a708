//! # Provisioning Routes
//!
//! - `POST /v1/sites` — create or update a site definition
//! - `GET  /v1/sites` — list site definitions
//! - `POST /v1/registration-codes` — issue single-use registration codes
//! - `POST /v1/actors` — register against a code (no identity required)
//! - `POST /v1/actors/site` — bind the calling actor to a site, once

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use std::str::FromStr;

use rtsm_core::{ActorProfile, RegistrationCode, Role, Site, SiteCode, SiteStatus, TrialDate};
use rtsm_registry::IssuedCode;

use crate::error::AppError;
use crate::extract::ActorCredentials;
use crate::state::AppState;

/// Router for provisioning endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/sites", post(define_site).get(list_sites))
        .route("/v1/registration-codes", post(generate_codes))
        .route("/v1/actors", post(register_actor))
        .route("/v1/actors/site", post(assign_site))
}

#[derive(Debug, Deserialize)]
struct SiteRequest {
    code: String,
    name: String,
    status: String,
    activation_date: TrialDate,
}

#[derive(Debug, Deserialize)]
struct RoleCount {
    role: Role,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateCodesRequest {
    counts: Vec<RoleCount>,
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
    secret_code: String,
    site: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssignSiteRequest {
    site: String,
}

async fn define_site(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
    Json(request): Json<SiteRequest>,
) -> Result<Json<Site>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    let site = Site {
        code: SiteCode::new(request.code)?,
        name: request.name,
        status: SiteStatus::from_str(&request.status)?,
        activation_date: request.activation_date,
    };
    Ok(Json(state.service.define_site(&identity, site)?))
}

async fn list_sites(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
) -> Result<Json<Vec<Site>>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    Ok(Json(state.service.list_sites(&identity)?))
}

async fn generate_codes(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
    Json(request): Json<GenerateCodesRequest>,
) -> Result<Json<Vec<IssuedCode>>, AppError> {
    let identity = state.service.authenticate(&credentials)?;
    let counts: Vec<(Role, u32)> = request.counts.iter().map(|c| (c.role, c.count)).collect();
    Ok(Json(
        state.service.generate_registration_codes(&identity, &counts)?,
    ))
}

async fn register_actor(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<ActorProfile>, AppError> {
    let code = RegistrationCode::new(request.secret_code)?;
    let site = request.site.map(SiteCode::new).transpose()?;
    Ok(Json(state.service.register_actor(
        &request.username,
        &request.password,
        &code,
        site,
    )?))
}

async fn assign_site(
    State(state): State<AppState>,
    ActorCredentials(credentials): ActorCredentials,
    Json(request): Json<AssignSiteRequest>,
) -> Result<Json<ActorProfile>, AppError> {
    let site = SiteCode::new(request.site)?;
    Ok(Json(state.service.assign_site(&credentials, site)?))
}
