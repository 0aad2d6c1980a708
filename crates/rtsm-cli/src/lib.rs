//! # rtsm-cli — Command Handlers
//!
//! Handler modules for the `rtsm` binary. The binary assembles the clap
//! command tree in `main.rs` and dispatches here.

pub mod codes;
pub mod config;
pub mod serve;
