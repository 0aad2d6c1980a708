//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error taxonomy used throughout the RTSM Stack. All errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Errors are returned values, never uncaught failures — no operation in
//!   the workspace crashes the process on a domain error.
//! - Scope mismatches on existing records surface as `NotFound`, not
//!   `Forbidden`, so an out-of-scope caller cannot probe for record
//!   existence.
//! - Lifecycle rejections include the current state so a caller can render
//!   guidance without a second read.

use thiserror::Error;

/// Top-level error type for the RTSM Stack.
///
/// Retry semantics per variant:
///
/// | Variant | Retryable? |
/// |---------|------------|
/// | `Authentication` | only with new credentials |
/// | `Forbidden` | no |
/// | `NotFound` | no |
/// | `InvalidState` | no (a different action is required) |
/// | `Validation` | after correcting the input |
/// | `Allocation` | yes — no partial state was committed |
/// | `DepotInventory` | yes — no partial state was committed |
/// | `NotEligible` | no |
/// | `ConcurrentModification` | after re-reading current state |
/// | `Conflict` | no |
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RtsmError {
    /// Credential verification failed. Carries no detail about whether the
    /// username or the password was wrong.
    #[error("authentication failed")]
    Authentication,

    /// The actor's role does not permit the attempted operation.
    #[error("role {role} is not permitted to perform {operation}")]
    Forbidden {
        /// The caller's role.
        role: String,
        /// The rejected operation.
        operation: String,
    },

    /// Record absent — or present but outside the caller's scope. The two
    /// cases are indistinguishable by design.
    #[error("record not found: {record}")]
    NotFound {
        /// Identifier of the record that could not be resolved.
        record: String,
    },

    /// A lifecycle transition was attempted from a state that does not
    /// allow it.
    #[error("invalid transition for {record}: {current} does not allow {attempted}")]
    InvalidState {
        /// The record whose transition was rejected.
        record: String,
        /// The record's current state.
        current: String,
        /// The attempted target state or action.
        attempted: String,
    },

    /// Missing or malformed input, reported field-level.
    #[error("validation failed for {field}: {reason}")]
    Validation {
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The external allocator could not produce a pack assignment. The
    /// participant record is unchanged.
    #[error("allocation failed: {reason}")]
    Allocation {
        /// Allocator-reported reason.
        reason: String,
    },

    /// The referenced pack is not available in depot inventory. No
    /// consignment record was written.
    #[error("pack {pack} is not available in depot inventory")]
    DepotInventory {
        /// The pack that was requested.
        pack: String,
    },

    /// The pack has no pending consignment at the caller's site.
    #[error("pack {pack} is not pending arrival at site {site}")]
    NotEligible {
        /// The pack whose arrival was submitted.
        pack: String,
        /// The site the caller is scoped to.
        site: String,
    },

    /// A concurrent transition won the race on this record.
    #[error("concurrent modification of {record}; re-read and retry")]
    ConcurrentModification {
        /// The contested record.
        record: String,
    },

    /// A uniqueness constraint was violated.
    #[error("conflict on {record}: {reason}")]
    Conflict {
        /// The record that collided.
        record: String,
        /// Which constraint was violated.
        reason: String,
    },
}

impl RtsmError {
    /// Short stable kind string, used for metrics labels and HTTP mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Forbidden { .. } => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::InvalidState { .. } => "invalid_state",
            Self::Validation { .. } => "validation",
            Self::Allocation { .. } => "allocation",
            Self::DepotInventory { .. } => "depot_inventory",
            Self::NotEligible { .. } => "not_eligible",
            Self::ConcurrentModification { .. } => "concurrent_modification",
            Self::Conflict { .. } => "conflict",
        }
    }

    /// Whether re-invoking the same operation unchanged can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Allocation { .. }
                | Self::DepotInventory { .. }
                | Self::ConcurrentModification { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_stable() {
        let err = RtsmError::NotFound {
            record: "PAT001".into(),
        };
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_invalid_state_display_names_current_state() {
        let err = RtsmError::InvalidState {
            record: "PAT004".into(),
            current: "SCREEN_FAILED".into(),
            attempted: "RANDOMIZED".into(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("SCREEN_FAILED"));
        assert!(rendered.contains("RANDOMIZED"));
    }

    #[test]
    fn test_retryable_variants() {
        assert!(RtsmError::Allocation {
            reason: "timeout".into()
        }
        .is_retryable());
        assert!(RtsmError::ConcurrentModification {
            record: "PAT001".into()
        }
        .is_retryable());
        assert!(!RtsmError::Authentication.is_retryable());
        assert!(!RtsmError::Forbidden {
            role: "monitor".into(),
            operation: "enroll".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_authentication_reveals_nothing() {
        assert_eq!(RtsmError::Authentication.to_string(), "authentication failed");
    }
}
