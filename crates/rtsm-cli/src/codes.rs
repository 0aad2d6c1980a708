//! # Gen-Codes Command
//!
//! Mints registration codes offline and prints them as JSON, for
//! distribution ahead of a deployment (the server can also mint codes at
//! startup from the seed config, or at runtime via the API).

use clap::Args;

use rtsm_core::Role;
use rtsm_registry::CodeVault;

/// Arguments for `rtsm gen-codes`.
#[derive(Args, Debug)]
pub struct GenCodesArgs {
    /// Number of investigator codes.
    #[arg(long, default_value_t = 0)]
    pub investigators: u32,
    /// Number of depot codes.
    #[arg(long, default_value_t = 0)]
    pub depots: u32,
    /// Number of monitor codes.
    #[arg(long, default_value_t = 0)]
    pub monitors: u32,
    /// Number of administrator codes.
    #[arg(long, default_value_t = 0)]
    pub administrators: u32,
}

/// Mint and print the requested codes.
pub fn run(args: GenCodesArgs) -> anyhow::Result<()> {
    let vault = CodeVault::new();
    let mut issued = Vec::new();
    for (role, count) in [
        (Role::Investigator, args.investigators),
        (Role::Depot, args.depots),
        (Role::Monitor, args.monitors),
        (Role::Administrator, args.administrators),
    ] {
        issued.extend(vault.mint(role, count));
    }
    println!("{}", serde_json::to_string_pretty(&issued)?);
    Ok(())
}
