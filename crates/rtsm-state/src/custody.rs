//! # Pack Custody State Machine
//!
//! Tracks where a drug pack physically is and whether it may be dispensed.
//!
//! ## States
//!
//! ```text
//! Available@Depot ──dispatch──▶ InTransit@Site ──receive──▶ Available@Site
//!                                    │                          │
//!                                    ├──receive(damaged)──▶ Damaged@Site
//!                                    └──receive(quarantined)─▶ Quarantined@Site
//!
//! Available@Site ──allocate──▶ Allocated@Site
//! ```
//!
//! A pack satisfies at most one consignment: `dispatch` requires
//! `Available` at the depot, so a second raise against the same pack fails
//! before any consignment is written. `allocate` requires `Available` at a
//! site, so a pack still in transit, damaged, or quarantined can never be
//! dispensed to a participant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rtsm_core::{PackId, ParticipantId, RtsmError, SiteCode};

use crate::consignment::ArrivalStatus;

// ─── Location and Status ─────────────────────────────────────────────

/// Where a pack currently is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackLocation {
    /// At the central depot.
    Depot,
    /// At (or in transit to) the named site.
    Site(SiteCode),
}

impl std::fmt::Display for PackLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Depot => f.write_str("DEPOT"),
            Self::Site(code) => write!(f, "{code}"),
        }
    }
}

/// Custody status of a pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustodyStatus {
    /// On a shelf, dispensable (depot or site per location).
    Available,
    /// Consigned to a site, not yet arrived.
    InTransit,
    /// Assigned to a participant by randomization (terminal).
    Allocated,
    /// Arrived damaged; unusable.
    Damaged,
    /// Arrived and placed in quarantine pending disposition.
    Quarantined,
}

impl CustodyStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::InTransit => "IN_TRANSIT",
            Self::Allocated => "ALLOCATED",
            Self::Damaged => "DAMAGED",
            Self::Quarantined => "QUARANTINED",
        }
    }
}

impl std::fmt::Display for CustodyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors that can occur during pack custody transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    /// The pack is not available at the depot.
    #[error("pack {pack} is not available at the depot (status {status} at {location})")]
    NotInDepotInventory {
        /// The pack.
        pack: PackId,
        /// Its current status.
        status: CustodyStatus,
        /// Its current location.
        location: PackLocation,
    },

    /// The pack is not in transit, so an arrival cannot be received.
    #[error("pack {pack} is not in transit (status {status})")]
    NotInTransit {
        /// The pack.
        pack: PackId,
        /// Its current status.
        status: CustodyStatus,
    },

    /// The pack cannot be allocated from its current status/location.
    #[error("pack {pack} cannot be allocated (status {status} at {location})")]
    NotDispensable {
        /// The pack.
        pack: PackId,
        /// Its current status.
        status: CustodyStatus,
        /// Its current location.
        location: PackLocation,
    },
}

impl From<CustodyError> for RtsmError {
    fn from(err: CustodyError) -> Self {
        match err {
            CustodyError::NotInDepotInventory { pack, .. } => RtsmError::DepotInventory {
                pack: pack.to_string(),
            },
            CustodyError::NotInTransit { pack, status } => RtsmError::InvalidState {
                record: pack.to_string(),
                current: status.to_string(),
                attempted: "receive arrival".to_string(),
            },
            CustodyError::NotDispensable { pack, status, .. } => RtsmError::InvalidState {
                record: pack.to_string(),
                current: status.to_string(),
                attempted: "allocate".to_string(),
            },
        }
    }
}

// ─── Pack ────────────────────────────────────────────────────────────

/// A physically distinct drug-supply unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pack {
    /// Pack identifier.
    pub id: PackId,
    /// Current location.
    pub location: PackLocation,
    /// Current custody status.
    pub status: CustodyStatus,
    /// The participant this pack was dispensed to, once allocated.
    pub allocated_to: Option<ParticipantId>,
}

impl Pack {
    /// Register a pack on the depot shelf.
    pub fn new_in_depot(id: PackId) -> Self {
        Self {
            id,
            location: PackLocation::Depot,
            status: CustodyStatus::Available,
            allocated_to: None,
        }
    }

    /// Consign the pack to a site (AVAILABLE@DEPOT → IN_TRANSIT@site).
    pub fn dispatch(&mut self, destination: SiteCode) -> Result<(), CustodyError> {
        if self.location != PackLocation::Depot || self.status != CustodyStatus::Available {
            return Err(CustodyError::NotInDepotInventory {
                pack: self.id.clone(),
                status: self.status,
                location: self.location.clone(),
            });
        }
        self.location = PackLocation::Site(destination);
        self.status = CustodyStatus::InTransit;
        Ok(())
    }

    /// Record the observed arrival condition (IN_TRANSIT → per condition).
    ///
    /// `Arrived` puts the pack on the site shelf; `Damaged` and
    /// `Quarantined` park it in that status.
    pub fn receive(&mut self, condition: ArrivalStatus) -> Result<(), CustodyError> {
        if self.status != CustodyStatus::InTransit {
            return Err(CustodyError::NotInTransit {
                pack: self.id.clone(),
                status: self.status,
            });
        }
        self.status = match condition {
            ArrivalStatus::Arrived => CustodyStatus::Available,
            ArrivalStatus::Damaged => CustodyStatus::Damaged,
            ArrivalStatus::Quarantined => CustodyStatus::Quarantined,
            // Duplicate and Invalid are submission outcomes, not pack
            // conditions; the registry never routes them here.
            ArrivalStatus::Duplicate | ArrivalStatus::Invalid => {
                return Err(CustodyError::NotInTransit {
                    pack: self.id.clone(),
                    status: self.status,
                })
            }
        };
        Ok(())
    }

    /// Dispense the pack to a participant (AVAILABLE@site → ALLOCATED).
    pub fn allocate(&mut self, participant: ParticipantId) -> Result<(), CustodyError> {
        let at_site = matches!(self.location, PackLocation::Site(_));
        if !at_site || self.status != CustodyStatus::Available {
            return Err(CustodyError::NotDispensable {
                pack: self.id.clone(),
                status: self.status,
                location: self.location.clone(),
            });
        }
        self.status = CustodyStatus::Allocated;
        self.allocated_to = Some(participant);
        Ok(())
    }

    /// Return an allocated pack to the site shelf.
    ///
    /// Compensation path only: used when the participant-side commit of a
    /// randomization loses its race after the pack was already reserved.
    pub fn release(&mut self) -> Result<(), CustodyError> {
        if self.status != CustodyStatus::Allocated {
            return Err(CustodyError::NotDispensable {
                pack: self.id.clone(),
                status: self.status,
                location: self.location.clone(),
            });
        }
        self.status = CustodyStatus::Available;
        self.allocated_to = None;
        Ok(())
    }

    /// Whether the pack is on a shelf at the given site.
    pub fn is_available_at(&self, site: &SiteCode) -> bool {
        self.status == CustodyStatus::Available && self.location == PackLocation::Site(site.clone())
    }

    /// Whether the pack is on the depot shelf.
    pub fn is_available_in_depot(&self) -> bool {
        self.status == CustodyStatus::Available && self.location == PackLocation::Depot
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
