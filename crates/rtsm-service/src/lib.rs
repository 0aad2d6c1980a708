//! # rtsm-service — Access-Scoped Orchestration
//!
//! The single enforcement point of the RTSM Stack. Every actor operation
//! enters here carrying resolved identity and scope; the service checks the
//! role's capability set once, filters reads and targets writes through the
//! scope, delegates to the registries, and appends to the event ledger on
//! every successful mutation.
//!
//! ## Control Flow
//!
//! ```text
//! credentials ──resolve()──▶ Identity{role, scope}
//!                               │
//!                               ▼
//! TrialService::operation ── capability check ── scope filter
//!                               │
//!                               ▼
//!                  ParticipantRegistry / SupplyRegistry / …
//!                               │
//!                               ▼
//!                      EventLedger::append
//! ```
//!
//! ## Design
//!
//! - Scope resolution is stateless and per-request: there is no
//!   process-wide session object, and exactly one lookup path (the actor
//!   directory) answers "which site is this actor bound to".
//! - Role-conditional behavior is a capability-set lookup in
//!   [`rtsm_core::Role::permits`], checked once here — handlers and
//!   registries never branch on roles.
//! - The allocator is a trait seam: randomization reads the participant,
//!   calls the allocator with no lock held, and commits with a version
//!   check, so an allocator stall never wedges a record and a crash
//!   mid-call leaves the participant in plain `Enrolled`.

pub mod allocator;
pub mod config;
pub mod resolver;
pub mod service;

// ─── Resolver re-exports ────────────────────────────────────────────

pub use resolver::{resolve, Credentials, CredentialVerifier, Identity};

// ─── Allocator re-exports ───────────────────────────────────────────

pub use allocator::{InventoryAllocator, PackAllocator};

// ─── Service re-exports ─────────────────────────────────────────────

pub use config::SitePolicy;
pub use service::TrialService;
