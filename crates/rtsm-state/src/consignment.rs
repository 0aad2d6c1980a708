//! # Consignment and Arrival Records
//!
//! A consignment is the depot's dispatch of one pack to one site; an
//! arrival is the site's confirmation of what showed up. One pack carries
//! at most one consignment and at most one non-duplicate arrival.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use rtsm_core::{ConsignmentId, PackId, RtsmError, SiteCode, Timestamp, TrialDate, Username};

/// Outcome status of a consignment raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsignmentStatus {
    /// Consignment created; the pack is in transit.
    Raised,
    /// The pack was not in depot inventory; nothing was persisted.
    Failed,
}

impl std::fmt::Display for ConsignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raised => f.write_str("RAISED"),
            Self::Failed => f.write_str("FAILED"),
        }
    }
}

/// A depot→site consignment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consignment {
    /// Consignment identifier.
    pub id: ConsignmentId,
    /// The pack being shipped.
    pub pack: PackId,
    /// Destination site.
    pub destination: SiteCode,
    /// Date the consignment was raised.
    pub raise_date: TrialDate,
    /// Depot actor who raised it.
    pub raised_by: Username,
    /// Status; persisted records are always `Raised`.
    pub status: ConsignmentStatus,
    /// When the record was created.
    pub created_at: Timestamp,
}

/// Status of a shipment arrival submission.
///
/// `Arrived`, `Damaged`, and `Quarantined` are observed pack conditions
/// and are the only values a persisted [`Arrival`] record carries.
/// `Duplicate` (the pack already has an arrival) and `Invalid` (no
/// consignment exists for the pack) are benign submission outcomes that
/// persist nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalStatus {
    /// Shipment arrived intact.
    Arrived,
    /// Shipment arrived damaged.
    Damaged,
    /// Shipment placed in quarantine on arrival.
    Quarantined,
    /// An arrival was already recorded for this pack.
    Duplicate,
    /// No consignment exists for this pack.
    Invalid,
}

impl ArrivalStatus {
    /// Whether this is an observable condition a site can submit
    /// (as opposed to a computed outcome).
    pub fn is_observable(&self) -> bool {
        matches!(self, Self::Arrived | Self::Damaged | Self::Quarantined)
    }

    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arrived => "ARRIVED",
            Self::Damaged => "DAMAGED",
            Self::Quarantined => "QUARANTINED",
            Self::Duplicate => "DUPLICATE",
            Self::Invalid => "INVALID",
        }
    }
}

impl FromStr for ArrivalStatus {
    type Err = RtsmError;

    /// Parse an observed condition. Only the three observable conditions
    /// are accepted; `Duplicate` and `Invalid` are computed, never
    /// submitted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arrived" => Ok(Self::Arrived),
            "damaged" => Ok(Self::Damaged),
            "quarantined" => Ok(Self::Quarantined),
            other => Err(RtsmError::Validation {
                field: "status".to_string(),
                reason: format!(
                    "unknown arrival status {other:?} (expected arrived, damaged, or quarantined)"
                ),
            }),
        }
    }
}

impl std::fmt::Display for ArrivalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded shipment arrival.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arrival {
    /// The pack that arrived.
    pub pack: PackId,
    /// The consignment it satisfies.
    pub consignment: ConsignmentId,
    /// Observed condition (always one of the observable statuses).
    pub status: ArrivalStatus,
    /// Date of arrival.
    pub arrival_date: TrialDate,
    /// Free-text notes from the receiving site.
    pub notes: String,
    /// Site actor who recorded the arrival.
    pub recorded_by: Username,
    /// The receiving site.
    pub site: SiteCode,
    /// When the record was created.
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrival_status_parse_accepts_observable_only() {
        assert_eq!(ArrivalStatus::from_str("Arrived").unwrap(), ArrivalStatus::Arrived);
        assert_eq!(
            ArrivalStatus::from_str(" DAMAGED ").unwrap(),
            ArrivalStatus::Damaged
        );
        assert_eq!(
            ArrivalStatus::from_str("quarantined").unwrap(),
            ArrivalStatus::Quarantined
        );
        assert!(ArrivalStatus::from_str("duplicate").is_err());
        assert!(ArrivalStatus::from_str("invalid").is_err());
        assert!(ArrivalStatus::from_str("lost").is_err());
    }

    #[test]
    fn test_observable_partition() {
        assert!(ArrivalStatus::Arrived.is_observable());
        assert!(ArrivalStatus::Damaged.is_observable());
        assert!(ArrivalStatus::Quarantined.is_observable());
        assert!(!ArrivalStatus::Duplicate.is_observable());
        assert!(!ArrivalStatus::Invalid.is_observable());
    }

    #[test]
    fn test_consignment_status_labels() {
        assert_eq!(ConsignmentStatus::Raised.to_string(), "RAISED");
        assert_eq!(ConsignmentStatus::Failed.to_string(), "FAILED");
        assert_eq!(
            serde_json::to_string(&ConsignmentStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn test_consignment_serde_roundtrip() {
        let consignment = Consignment {
            id: ConsignmentId::from_sequence(1),
            pack: PackId::new("PK050").unwrap(),
            destination: SiteCode::new("SITEA").unwrap(),
            raise_date: TrialDate::parse("2026-02-01").unwrap(),
            raised_by: Username::new("depot_ops").unwrap(),
            status: ConsignmentStatus::Raised,
            created_at: Timestamp::parse("2026-02-01T09:00:00Z").unwrap(),
        };
        let json = serde_json::to_string(&consignment).unwrap();
        let parsed: Consignment = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, consignment.id);
        assert_eq!(parsed.status, ConsignmentStatus::Raised);
    }
}
