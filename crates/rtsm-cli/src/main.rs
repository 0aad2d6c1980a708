//! # rtsm CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;

/// RTSM Stack CLI — randomization and trial supply management toolchain.
///
/// Serves the trial API from a YAML configuration, validates
/// configuration files, and mints single-use registration codes.
#[derive(Parser, Debug)]
#[command(name = "rtsm", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the trial API server.
    Serve(rtsm_cli::serve::ServeArgs),
    /// Validate a configuration file without starting the server.
    CheckConfig(rtsm_cli::serve::ServeArgs),
    /// Mint registration codes offline.
    GenCodes(rtsm_cli::codes::GenCodesArgs),
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => rtsm_cli::serve::run(args),
        Commands::CheckConfig(args) => {
            let config = rtsm_cli::config::AppConfig::load(&args.config)?;
            rtsm_cli::config::build_service(&config)?;
            tracing::info!(config = %args.config.display(), "configuration is valid");
            Ok(())
        }
        Commands::GenCodes(args) => rtsm_cli::codes::run(args),
    }
}
