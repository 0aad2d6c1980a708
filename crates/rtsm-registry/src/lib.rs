//! # rtsm-registry — Record Ownership
//!
//! The registries own every record in the trial: participants, packs,
//! consignments, arrivals, actors, registration codes, sites, and the
//! event ledger. Each registry wraps its records in the versioned store,
//! which serializes per-record mutation and supports optimistic
//! compare-and-swap for operations (randomization) that must not hold a
//! lock across an external call.
//!
//! ## Invariants Owned Here
//!
//! - Participant and consignment identifiers are minted from dense
//!   sequences; a participant's site never changes after enrollment.
//! - A pack satisfies at most one consignment and at most one
//!   non-duplicate arrival.
//! - The ledger is append-only with a monotonic sequence; events are never
//!   edited or removed.
//! - Registration codes are single-use: consumption removes the code.
//!
//! ## Crate Policy
//!
//! Registries enforce record-level invariants only. Role and scope
//! enforcement lives one layer up, in `rtsm-service` — a registry never
//! inspects who is asking, with the single exception of scope-filtered
//! read helpers that take the already-resolved [`rtsm_core::Scope`].

pub mod actors;
pub mod codes;
pub mod ledger;
pub mod participants;
pub mod sites;
pub mod store;
pub mod supply;

// ─── Store re-exports ───────────────────────────────────────────────

pub use store::VersionedStore;

// ─── Registry re-exports ────────────────────────────────────────────

pub use actors::ActorDirectory;
pub use codes::{CodeVault, IssuedCode};
pub use ledger::{EventLedger, EventSubject, EventType, HistoryEvent};
pub use participants::ParticipantRegistry;
pub use sites::SiteRegistry;
pub use supply::{ArrivalOutcome, SupplyRegistry};
