//! # Roles, Operations, and Scopes — Single Source of Truth
//!
//! Defines the `Role` and `Operation` enums used across the entire stack.
//! These are the ONE definition each — every capability check is an
//! exhaustive `match` on these types, so adding a role or an operation
//! forces every consumer to handle it at compile time.
//!
//! ## Security Invariant
//!
//! Role values are normalized (trimmed, case-folded) before comparison.
//! A stored role of `" Investigator "` or `"INVESTIGATOR"` resolves to the
//! same capability set as `"investigator"` — casing variance in stored data
//! cannot open a privilege gap.
//!
//! Capability checks are a single lookup against a role's enumerated
//! permitted-operation set, performed once at the access layer. There is no
//! per-view conditional branching on role strings anywhere else.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::RtsmError;
use crate::identity::{SiteCode, Username};

/// The four actor roles in the trial.
///
/// | Role | Scope | Concern |
/// |------|-------|---------|
/// | Investigator | one site | participant lifecycle + shipment receipt |
/// | Depot | global | consignment dispatch |
/// | Monitor | one site | oversight, emergency unblinding |
/// | Administrator | global | sites and registration codes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Site clinician: enrolls, randomizes, and follows participants at
    /// exactly one site, and receives that site's shipments.
    Investigator,
    /// Central depot operator: raises consignments, no participant access.
    Depot,
    /// Site monitor: read-mostly oversight of one site, plus emergency
    /// code breaks.
    Monitor,
    /// Study administrator: provisions sites and registration codes, with
    /// no participant or consignment visibility (separation of duties).
    Administrator,
}

/// All four roles in canonical order.
pub const ALL_ROLES: [Role; 4] = [
    Role::Investigator,
    Role::Depot,
    Role::Monitor,
    Role::Administrator,
];

impl Role {
    /// The snake_case string identifier for this role.
    ///
    /// Matches the serde serialization format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Investigator => "investigator",
            Self::Depot => "depot",
            Self::Monitor => "monitor",
            Self::Administrator => "administrator",
        }
    }

    /// Whether this role is bound to a single site (as opposed to global).
    pub fn is_site_scoped(&self) -> bool {
        matches!(self, Self::Investigator | Self::Monitor)
    }

    /// The enumerated set of operations this role may perform.
    ///
    /// This is the capability table the access layer enforces. Monitor is
    /// read-mostly: listing plus the emergency code break, never the other
    /// lifecycle transitions. Administrator has no participant or
    /// consignment visibility at all.
    pub fn permitted_operations(&self) -> &'static [Operation] {
        match self {
            Self::Investigator => &[
                Operation::Enroll,
                Operation::RecordScreenFailure,
                Operation::Randomize,
                Operation::CompleteTreatment,
                Operation::BreakCode,
                Operation::RecordArrival,
                Operation::ListParticipants,
                Operation::ListPendingShipments,
                Operation::ListCodeBroken,
                Operation::AssignSite,
            ],
            Self::Depot => &[Operation::RaiseConsignment, Operation::ListConsignments],
            Self::Monitor => &[
                Operation::ListParticipants,
                Operation::ListCodeBroken,
                Operation::BreakCode,
                Operation::AssignSite,
            ],
            Self::Administrator => &[
                Operation::DefineSite,
                Operation::ListSites,
                Operation::GenerateRegistrationCodes,
            ],
        }
    }

    /// Whether this role may perform the given operation.
    pub fn permits(&self, operation: Operation) -> bool {
        self.permitted_operations().contains(&operation)
    }
}

impl FromStr for Role {
    type Err = RtsmError;

    /// Parse a role value, trimming and case-folding first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "investigator" => Ok(Self::Investigator),
            "depot" => Ok(Self::Depot),
            "monitor" => Ok(Self::Monitor),
            "administrator" | "admin" => Ok(Self::Administrator),
            other => Err(RtsmError::Validation {
                field: "role".to_string(),
                reason: format!("unknown role {other:?}"),
            }),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every operation the core exposes. One variant per exposed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Create a participant in `Enrolled` at the caller's site.
    Enroll,
    /// Transition `Enrolled` → `ScreenFailed`.
    RecordScreenFailure,
    /// Transition `Enrolled` → `Randomized` via the allocator.
    Randomize,
    /// Transition `Randomized` → `TreatmentCompleted`.
    CompleteTreatment,
    /// Transition `Randomized` → `CodeBroken` (emergency unblinding).
    BreakCode,
    /// Raise a depot→site consignment.
    RaiseConsignment,
    /// Record a shipment arrival at the caller's site.
    RecordArrival,
    /// List participants in scope.
    ListParticipants,
    /// List pending (unarrived) shipments for the caller's site.
    ListPendingShipments,
    /// List code-broken participants in scope.
    ListCodeBroken,
    /// List all consignments (depot supply view).
    ListConsignments,
    /// Issue single-use registration codes.
    GenerateRegistrationCodes,
    /// Create or update a site definition.
    DefineSite,
    /// List site definitions.
    ListSites,
    /// Bind the caller to a site, once.
    AssignSite,
}

impl Operation {
    /// The snake_case string identifier for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enroll => "enroll",
            Self::RecordScreenFailure => "record_screen_failure",
            Self::Randomize => "randomize",
            Self::CompleteTreatment => "complete_treatment",
            Self::BreakCode => "break_code",
            Self::RaiseConsignment => "raise_consignment",
            Self::RecordArrival => "record_arrival",
            Self::ListParticipants => "list_participants",
            Self::ListPendingShipments => "list_pending_shipments",
            Self::ListCodeBroken => "list_code_broken",
            Self::ListConsignments => "list_consignments",
            Self::GenerateRegistrationCodes => "generate_registration_codes",
            Self::DefineSite => "define_site",
            Self::ListSites => "list_sites",
            Self::AssignSite => "assign_site",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The boundary within which an actor may read and write records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// No site filter; Depot and Administrator operate globally.
    Global,
    /// Restricted to records whose site equals this code.
    Site(SiteCode),
}

impl Scope {
    /// Whether a record at `site` is visible within this scope.
    pub fn covers(&self, site: &SiteCode) -> bool {
        match self {
            Self::Global => true,
            Self::Site(own) => own == site,
        }
    }

    /// The scoped site, if this is a site scope.
    pub fn site(&self) -> Option<&SiteCode> {
        match self {
            Self::Global => None,
            Self::Site(code) => Some(code),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Site(code) => write!(f, "site:{code}"),
        }
    }
}

/// The stored profile of a registered actor, as returned by credential
/// verification: who they are, what role they hold, and the site they are
/// bound to (if any yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorProfile {
    /// Login name.
    pub username: Username,
    /// Role fixed at registration.
    pub role: Role,
    /// Assigned site; `None` until assigned for site-scoped roles, always
    /// `None` for global roles.
    pub site: Option<SiteCode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_and_whitespace_insensitive() {
        assert_eq!(Role::from_str("Investigator").unwrap(), Role::Investigator);
        assert_eq!(Role::from_str("  MONITOR ").unwrap(), Role::Monitor);
        assert_eq!(Role::from_str("depot").unwrap(), Role::Depot);
        assert_eq!(Role::from_str("Admin").unwrap(), Role::Administrator);
        assert_eq!(Role::from_str("administrator").unwrap(), Role::Administrator);
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(Role::from_str("superuser").is_err());
        assert!(Role::from_str("").is_err());
    }

    #[test]
    fn test_site_scoped_roles() {
        assert!(Role::Investigator.is_site_scoped());
        assert!(Role::Monitor.is_site_scoped());
        assert!(!Role::Depot.is_site_scoped());
        assert!(!Role::Administrator.is_site_scoped());
    }

    #[test]
    fn test_monitor_is_read_mostly() {
        assert!(Role::Monitor.permits(Operation::BreakCode));
        assert!(Role::Monitor.permits(Operation::ListParticipants));
        assert!(!Role::Monitor.permits(Operation::Enroll));
        assert!(!Role::Monitor.permits(Operation::RecordScreenFailure));
        assert!(!Role::Monitor.permits(Operation::Randomize));
        assert!(!Role::Monitor.permits(Operation::CompleteTreatment));
    }

    #[test]
    fn test_depot_never_touches_participants() {
        for op in [
            Operation::Enroll,
            Operation::RecordScreenFailure,
            Operation::Randomize,
            Operation::CompleteTreatment,
            Operation::BreakCode,
            Operation::ListParticipants,
        ] {
            assert!(!Role::Depot.permits(op), "depot must not permit {op}");
        }
        assert!(Role::Depot.permits(Operation::RaiseConsignment));
    }

    #[test]
    fn test_administrator_separation_of_duties() {
        assert!(Role::Administrator.permits(Operation::DefineSite));
        assert!(Role::Administrator.permits(Operation::GenerateRegistrationCodes));
        assert!(!Role::Administrator.permits(Operation::ListParticipants));
        assert!(!Role::Administrator.permits(Operation::ListConsignments));
        assert!(!Role::Administrator.permits(Operation::RaiseConsignment));
    }

    #[test]
    fn test_capability_table_shape() {
        for role in ALL_ROLES {
            assert!(!role.permitted_operations().is_empty());
            // Only site-scoped roles ever bind themselves to a site.
            assert_eq!(role.permits(Operation::AssignSite), role.is_site_scoped());
        }
    }

    #[test]
    fn test_scope_covers() {
        let a = SiteCode::new("SITEA").unwrap();
        let b = SiteCode::new("SITEB").unwrap();
        assert!(Scope::Global.covers(&a));
        assert!(Scope::Site(a.clone()).covers(&a));
        assert!(!Scope::Site(a).covers(&b));
    }

    #[test]
    fn test_role_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&Role::Investigator).unwrap(),
            "\"investigator\""
        );
        let parsed: Role = serde_json::from_str("\"monitor\"").unwrap();
        assert_eq!(parsed, Role::Monitor);
    }
}
