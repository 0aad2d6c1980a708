//! # Application State
//!
//! Shared state for the Axum application: the trial service behind an
//! `Arc`, plus the Prometheus handle for the `/metrics` endpoint.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use rtsm_service::TrialService;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// The trial service facade. All business logic lives behind it.
    pub service: Arc<TrialService>,
    /// Render handle for the Prometheus exposition endpoint.
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Create a new application state.
    pub fn new(service: Arc<TrialService>, metrics: PrometheusHandle) -> Self {
        Self { service, metrics }
    }
}
