//! # rtsm-state — Trial State Machines
//!
//! Implements the state machines of the RTSM Stack. Each state is an enum
//! variant and transitions are methods that validate the current state
//! before mutating; invalid transitions are rejected with structured
//! errors naming the current state and the attempted target.
//!
//! ## State Machines
//!
//! - **Participant** (`participant.rs`): the trial lifecycle
//!   `Enrolled → {ScreenFailed | Randomized}`,
//!   `Randomized → {TreatmentCompleted | CodeBroken}`. Three terminal
//!   states; a code break is only reachable from `Randomized`, never after
//!   completion.
//!
//! - **Pack custody** (`custody.rs`): where a drug pack physically is and
//!   whether it may be dispensed —
//!   `Available@Depot → InTransit@Site → {Available | Damaged | Quarantined}@Site`,
//!   with `Available@Site → Allocated` on randomization.
//!
//! ## Design
//!
//! Both machines are enum-state with validated transitions rather than
//! typestate types. The records flow through registries and serialize to
//! the wire, so the state must live in data; the invariants (each edge
//! checked against the current state, every transition logged) are
//! straightforward to validate at runtime and are covered by a property
//! test asserting that no operation sequence can traverse an edge outside
//! the lifecycle graph.

pub mod consignment;
pub mod custody;
pub mod participant;

// ─── Participant re-exports ─────────────────────────────────────────

pub use participant::{
    Demographics, EnrollmentForm, Gender, Participant, ParticipantError, ParticipantStatus,
    TransitionRecord,
};

// ─── Custody re-exports ─────────────────────────────────────────────

pub use custody::{CustodyError, CustodyStatus, Pack, PackLocation};

// ─── Consignment re-exports ─────────────────────────────────────────

pub use consignment::{Arrival, ArrivalStatus, Consignment, ConsignmentStatus};
