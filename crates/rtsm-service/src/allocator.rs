//! # Pack Allocator Seam
//!
//! Randomization treats the allocator as a black box: given a participant
//! and their site, it returns a pack identifier or fails. The call may
//! block on an external service; the service layer holds no lock while it
//! waits, and an allocator failure surfaces as a retryable allocation
//! error with no state committed.

use std::sync::Arc;

use rand::seq::SliceRandom;

use rtsm_core::{PackId, ParticipantId, RtsmError, SiteCode};
use rtsm_registry::SupplyRegistry;

/// The allocator contract.
pub trait PackAllocator: Send + Sync {
    /// Choose a pack for the participant at the given site.
    ///
    /// # Errors
    ///
    /// `Allocation` when no assignment can be produced; the caller may
    /// safely retry while the participant remains `Enrolled`.
    fn allocate(&self, participant: &ParticipantId, site: &SiteCode) -> Result<PackId, RtsmError>;
}

/// The default allocator: a uniformly random choice among the packs
/// currently available on the shelf at the participant's site.
#[derive(Debug, Clone)]
pub struct InventoryAllocator {
    supply: Arc<SupplyRegistry>,
}

impl InventoryAllocator {
    /// Create an allocator over the given supply registry.
    pub fn new(supply: Arc<SupplyRegistry>) -> Self {
        Self { supply }
    }
}

impl PackAllocator for InventoryAllocator {
    fn allocate(&self, _participant: &ParticipantId, site: &SiteCode) -> Result<PackId, RtsmError> {
        let available = self.supply.available_at(site);
        available
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| RtsmError::Allocation {
                reason: format!("no packs available at site {site}"),
            })
    }
}
