//! # Supply Registry
//!
//! Owns depot inventory, consignments, and shipment arrivals. The pack
//! custody state machine does the heavy lifting: a consignment can only be
//! raised against a pack that is `Available` at the depot, so a failed
//! raise writes nothing, and an arrival can only be received once per
//! pack, so the duplicate check cannot be raced past.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use rtsm_core::{ConsignmentId, PackId, ParticipantId, RtsmError, SiteCode, Timestamp, TrialDate, Username};
use rtsm_state::{Arrival, ArrivalStatus, Consignment, ConsignmentStatus, Pack};

use crate::store::VersionedStore;

/// Outcome of an arrival submission.
///
/// `Duplicate` and `Invalid` are benign — the original submission already
/// did (or never could do) the work, and nothing is persisted.
#[derive(Debug, Clone)]
pub enum ArrivalOutcome {
    /// The arrival was persisted and the pack's custody updated.
    Recorded(Arrival),
    /// An arrival was already recorded for this pack.
    Duplicate {
        /// The pack whose arrival was resubmitted.
        pack: PackId,
    },
    /// No consignment exists for this pack.
    Invalid {
        /// The unknown pack.
        pack: PackId,
    },
}

impl ArrivalOutcome {
    /// The status label of this outcome.
    pub fn status(&self) -> ArrivalStatus {
        match self {
            Self::Recorded(arrival) => arrival.status,
            Self::Duplicate { .. } => ArrivalStatus::Duplicate,
            Self::Invalid { .. } => ArrivalStatus::Invalid,
        }
    }
}

/// The supply registry: packs, consignments, arrivals.
#[derive(Debug, Default)]
pub struct SupplyRegistry {
    packs: VersionedStore<PackId, Pack>,
    consignments: RwLock<Vec<Consignment>>,
    arrivals: RwLock<HashMap<PackId, Arrival>>,
    next_consignment: Mutex<u32>,
}

impl SupplyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pack on the depot shelf.
    ///
    /// # Errors
    ///
    /// Conflict if the pack identifier is already registered.
    pub fn register_pack(&self, id: PackId) -> Result<Pack, RtsmError> {
        let pack = Pack::new_in_depot(id.clone());
        self.packs.insert(id, pack.clone())?;
        Ok(pack)
    }

    /// Read a pack record.
    pub fn pack(&self, id: &PackId) -> Option<Pack> {
        self.packs.get(id).map(|(pack, _)| pack)
    }

    /// Raise a consignment for `pack` to `destination`.
    ///
    /// The custody transition is validated first; only after the pack is
    /// in transit is the consignment record written, so a rejected raise
    /// leaves no dangling consignment.
    ///
    /// # Errors
    ///
    /// `DepotInventory` if the pack is unknown or not available at the
    /// depot.
    pub fn raise_consignment(
        &self,
        pack: PackId,
        destination: SiteCode,
        raise_date: TrialDate,
        raised_by: Username,
    ) -> Result<Consignment, RtsmError> {
        let dispatch_to = destination.clone();
        self.packs
            .update(&pack, |record| record.dispatch(dispatch_to.clone()).map_err(Into::into))
            .map_err(|err| match err {
                // An unknown pack is simply not in inventory.
                RtsmError::NotFound { .. } => RtsmError::DepotInventory {
                    pack: pack.to_string(),
                },
                other => other,
            })?;

        let seq = {
            let mut next = self.next_consignment.lock().unwrap_or_else(|e| e.into_inner());
            *next += 1;
            *next
        };
        let consignment = Consignment {
            id: ConsignmentId::from_sequence(seq),
            pack,
            destination,
            raise_date,
            raised_by,
            status: ConsignmentStatus::Raised,
            created_at: Timestamp::now(),
        };
        let mut consignments = self.consignments.write().unwrap_or_else(|e| e.into_inner());
        consignments.push(consignment.clone());
        Ok(consignment)
    }

    /// Record a shipment arrival for `pack` at `site`.
    ///
    /// # Errors
    ///
    /// `NotEligible` when the pack's consignment is destined for a
    /// different site. Unknown packs and resubmissions are the benign
    /// `Invalid` / `Duplicate` outcomes, not errors.
    pub fn record_arrival(
        &self,
        pack: PackId,
        site: SiteCode,
        condition: ArrivalStatus,
        arrival_date: TrialDate,
        notes: String,
        recorded_by: Username,
    ) -> Result<ArrivalOutcome, RtsmError> {
        if !condition.is_observable() {
            return Err(RtsmError::Validation {
                field: "status".to_string(),
                reason: format!("{condition} is a computed outcome, not an observable condition"),
            });
        }

        let consignment = {
            let consignments = self.consignments.read().unwrap_or_else(|e| e.into_inner());
            consignments.iter().find(|c| c.pack == pack).cloned()
        };
        let Some(consignment) = consignment else {
            return Ok(ArrivalOutcome::Invalid { pack });
        };
        if consignment.destination != site {
            return Err(RtsmError::NotEligible {
                pack: pack.to_string(),
                site: site.to_string(),
            });
        }

        {
            let arrivals = self.arrivals.read().unwrap_or_else(|e| e.into_inner());
            if arrivals.contains_key(&pack) {
                return Ok(ArrivalOutcome::Duplicate { pack });
            }
        }

        // The custody transition is the serialization point: `receive`
        // requires IN_TRANSIT, so if a concurrent submission slipped past
        // the read above, exactly one of them lands here first and the
        // other resolves as a duplicate.
        match self.packs.update(&pack, |record| record.receive(condition).map_err(Into::into)) {
            Ok(()) => {}
            Err(RtsmError::InvalidState { .. }) => {
                return Ok(ArrivalOutcome::Duplicate { pack });
            }
            Err(other) => return Err(other),
        }

        let arrival = Arrival {
            pack: pack.clone(),
            consignment: consignment.id,
            status: condition,
            arrival_date,
            notes,
            recorded_by,
            site,
            created_at: Timestamp::now(),
        };
        let mut arrivals = self.arrivals.write().unwrap_or_else(|e| e.into_inner());
        arrivals.insert(pack, arrival.clone());
        Ok(ArrivalOutcome::Recorded(arrival))
    }

    /// Consignments destined for `site` with no recorded arrival.
    pub fn pending_for_site(&self, site: &SiteCode) -> Vec<Consignment> {
        let pending: Vec<Consignment> = {
            let consignments = self.consignments.read().unwrap_or_else(|e| e.into_inner());
            consignments
                .iter()
                .filter(|c| &c.destination == site)
                .cloned()
                .collect()
        };
        let arrivals = self.arrivals.read().unwrap_or_else(|e| e.into_inner());
        pending
            .into_iter()
            .filter(|c| !arrivals.contains_key(&c.pack))
            .collect()
    }

    /// Every consignment ever raised (depot supply view).
    pub fn all_consignments(&self) -> Vec<Consignment> {
        let consignments = self.consignments.read().unwrap_or_else(|e| e.into_inner());
        consignments.clone()
    }

    /// The arrival recorded for a pack, if any.
    pub fn arrival_for(&self, pack: &PackId) -> Option<Arrival> {
        let arrivals = self.arrivals.read().unwrap_or_else(|e| e.into_inner());
        arrivals.get(pack).cloned()
    }

    /// Packs currently available on the shelf at `site`, sorted.
    pub fn available_at(&self, site: &SiteCode) -> Vec<PackId> {
        let mut packs: Vec<PackId> = self
            .packs
            .snapshot()
            .into_iter()
            .filter(|p| p.is_available_at(site))
            .map(|p| p.id)
            .collect();
        packs.sort();
        packs
    }

    /// Reserve a pack for a participant (AVAILABLE@site → ALLOCATED).
    pub fn allocate_pack(
        &self,
        pack: &PackId,
        participant: ParticipantId,
    ) -> Result<Pack, RtsmError> {
        self.packs.update(pack, |record| {
            record.allocate(participant.clone())?;
            Ok(record.clone())
        })
    }

    /// Return a reserved pack to the shelf.
    ///
    /// Compensation path for a randomization whose participant-side commit
    /// lost its race.
    pub fn release_pack(&self, pack: &PackId) -> Result<(), RtsmError> {
        self.packs.update(pack, |record| record.release().map_err(Into::into))
    }

    /// Number of registered packs.
    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }
}
