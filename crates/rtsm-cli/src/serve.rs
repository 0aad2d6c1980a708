//! # Serve Command
//!
//! Boots the API server from a YAML config: builds the seeded trial
//! service, installs the Prometheus recorder, and runs Axum on Tokio.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use metrics_exporter_prometheus::PrometheusBuilder;

use rtsm_api::AppState;

use crate::config::{build_service, AppConfig};

/// Arguments for `rtsm serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to the server configuration file.
    #[arg(long, short, default_value = "rtsm.yaml")]
    pub config: PathBuf,
}

/// Run the API server until interrupted.
pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    let config = AppConfig::load(&args.config)?;
    let service = build_service(&config)?;

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("installing metrics recorder")?;
    let state = AppState::new(service, metrics);

    let bind_addr = config.bind_addr().to_string();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("binding {bind_addr}"))?;
        tracing::info!(%bind_addr, "rtsm api listening");
        rtsm_api::serve(listener, state).await.context("serving api")
    })
}
