//! # Server Configuration and Seed Fixtures
//!
//! The YAML config the server boots from: bind address, site-activation
//! policy, and seed fixtures (sites, depot packs, actors, registration
//! codes) so a fresh process starts in a usable state.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use rtsm_core::{PackId, Role, Site, SiteCode, SiteStatus, TrialDate};
use rtsm_service::{SitePolicy, TrialService};

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the API binds to.
    pub bind_addr: Option<String>,
    /// Site-activation gating policy.
    pub policy: SitePolicy,
    /// Startup fixtures.
    pub seed: SeedConfig,
}

impl AppConfig {
    /// The bind address, defaulting to localhost.
    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or("127.0.0.1:8080")
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Startup fixtures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Site definitions.
    pub sites: Vec<SiteSeed>,
    /// Packs placed on the depot shelf.
    pub depot_packs: Vec<String>,
    /// Actors registered directly (bypassing registration codes).
    pub actors: Vec<ActorSeed>,
    /// Registration codes minted at startup and written to the log.
    pub registration_codes: Vec<CodeSeed>,
}

/// A seeded site definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSeed {
    /// Site code.
    pub code: String,
    /// Site name.
    pub name: String,
    /// Activation status (`active`, `inactive`, `pending`).
    pub status: String,
    /// Activation date (`YYYY-MM-DD`).
    pub activation_date: String,
}

/// A seeded actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorSeed {
    /// Login name.
    pub username: String,
    /// Initial password.
    pub password: String,
    /// Role (`investigator`, `depot`, `monitor`, `administrator`).
    pub role: String,
    /// Site assignment for site-scoped roles.
    pub site: Option<String>,
}

/// Registration codes to mint at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSeed {
    /// Role the codes register.
    pub role: String,
    /// Number of codes.
    pub count: u32,
}

/// Build a trial service from the config, applying every seed fixture.
pub fn build_service(config: &AppConfig) -> anyhow::Result<Arc<TrialService>> {
    let service = Arc::new(TrialService::new(config.policy));

    for seed in &config.seed.sites {
        let site = Site {
            code: SiteCode::new(seed.code.clone())?,
            name: seed.name.clone(),
            status: SiteStatus::from_str(&seed.status)?,
            activation_date: TrialDate::parse(&seed.activation_date)?,
        };
        service.seed_site(site);
    }

    for pack in &config.seed.depot_packs {
        service
            .seed_depot_pack(PackId::new(pack.clone())?)
            .with_context(|| format!("seeding depot pack {pack}"))?;
    }

    for actor in &config.seed.actors {
        let role = Role::from_str(&actor.role)?;
        let site = actor.site.clone().map(SiteCode::new).transpose()?;
        service
            .seed_actor(&actor.username, &actor.password, role, site)
            .with_context(|| format!("seeding actor {}", actor.username))?;
    }

    let counts: Vec<(Role, u32)> = config
        .seed
        .registration_codes
        .iter()
        .map(|c| Role::from_str(&c.role).map(|role| (role, c.count)))
        .collect::<Result<_, _>>()?;
    for issued in service.issue_codes(&counts) {
        tracing::info!(role = %issued.role, code = %issued.code.as_str(), "registration code minted");
    }

    tracing::info!(
        sites = config.seed.sites.len(),
        packs = config.seed.depot_packs.len(),
        actors = config.seed.actors.len(),
        "seed fixtures applied"
    );
    Ok(service)
}
