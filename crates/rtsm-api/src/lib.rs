//! # rtsm-api — Axum API Surface
//!
//! Assembles the route modules into a single application with shared
//! middleware for tracing and metrics.
//!
//! ## Routers
//!
//! - `/v1/auth/*` — credential verification
//! - `/v1/participants/*` — participant lifecycle
//! - `/v1/consignments`, `/v1/shipments/*` — supply chain
//! - `/v1/sites`, `/v1/registration-codes`, `/v1/actors` — provisioning
//! - `/health/*` — liveness/readiness probes (unauthenticated)
//! - `/metrics` — Prometheus exposition (unauthenticated)
//!
//! ## Crate Policy
//!
//! No business logic in route handlers — every handler resolves the
//! caller's identity and delegates to `rtsm-service`. All errors map to
//! structured HTTP responses via [`AppError`].

pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::AppState;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Build the application router over the given state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::auth::router())
        .merge(routes::participants::router())
        .merge(routes::supply::router())
        .merge(routes::provisioning::router())
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .route("/metrics", get(render_metrics))
        .layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the application on the given listener until shutdown.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, app(state)).await
}

async fn health_live() -> &'static str {
    "ok"
}

async fn health_ready() -> &'static str {
    "ok"
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

/// Count every request by method and status.
async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::counter!(
        "rtsm_http_requests_total",
        "method" => method,
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    response
}
