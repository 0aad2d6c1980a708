//! # rtsm-core — Foundational Types for the RTSM Stack
//!
//! This crate is the bedrock of the RTSM (Randomization and Trial Supply
//! Management) Stack. It defines the type-system primitives every other
//! crate in the workspace builds on; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `ParticipantId`, `PackId`,
//!    `ConsignmentId`, `SiteCode`, `Username` — all newtypes with validated
//!    constructors. No bare strings for identifiers.
//!
//! 2. **Single `Role` and `Operation` enums.** One definition each,
//!    exhaustive `match` everywhere. Capability checks are a lookup against
//!    a role's permitted-operation set, never scattered string comparisons.
//!    Role parsing trims and case-folds so stored-value variance cannot
//!    open a privilege gap.
//!
//! 3. **UTC-only timestamps, explicit calendar dates.** `Timestamp` enforces
//!    UTC with seconds precision; `TrialDate` is a plain calendar date for
//!    enrollment, consent, and birth dates.
//!
//! 4. **Structured errors as values.** `RtsmError` carries the error kind,
//!    the offending record where applicable, and enough context for a
//!    caller to decide whether a retry makes sense. Nothing in this
//!    workspace panics on a domain failure.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `rtsm-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod error;
pub mod identity;
pub mod role;
pub mod site;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use error::RtsmError;
pub use identity::{
    ConsignmentId, EventId, PackId, ParticipantId, RegistrationCode, ScreeningNumber, SiteCode,
    Username,
};
pub use role::{ActorProfile, Operation, Role, Scope};
pub use site::{Site, SiteStatus};
pub use temporal::{Timestamp, TrialDate};
