//! # Participant Registry
//!
//! Owns participant records: mints identifiers, answers scope-filtered
//! queries, and funnels every lifecycle mutation through the versioned
//! store so concurrent transitions against one participant are serialized.
//!
//! Identifier minting matches the site worksheets: a global `PAT###`
//! sequence plus a per-site screening sequence (`SITEA001`, `SITEA002`, …)
//! that restarts for each site.

use std::collections::HashMap;
use std::sync::Mutex;

use rtsm_core::{ParticipantId, RtsmError, Scope, ScreeningNumber, SiteCode};
use rtsm_state::{Demographics, Participant, ParticipantStatus};

use crate::store::VersionedStore;

#[derive(Debug, Default)]
struct Sequences {
    next_participant: u32,
    per_site: HashMap<SiteCode, u32>,
}

/// The participant registry.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    store: VersionedStore<ParticipantId, Participant>,
    sequences: Mutex<Sequences>,
}

impl ParticipantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a participant in `Enrolled` at the given site.
    ///
    /// Identifiers are minted under the sequence lock so they stay dense
    /// even under concurrent enrollment.
    pub fn enroll(
        &self,
        site: SiteCode,
        demographics: Demographics,
    ) -> Result<Participant, RtsmError> {
        let mut sequences = self.sequences.lock().unwrap_or_else(|e| e.into_inner());
        let participant_seq = sequences.next_participant + 1;
        let site_seq = sequences.per_site.get(&site).copied().unwrap_or(0) + 1;

        let id = ParticipantId::from_sequence(participant_seq);
        let screening_number = ScreeningNumber::from_sequence(&site, site_seq);
        let participant = Participant::new(id.clone(), screening_number, site.clone(), demographics);
        self.store.insert(id, participant.clone())?;

        sequences.next_participant = participant_seq;
        sequences.per_site.insert(site, site_seq);
        Ok(participant)
    }

    /// Read a participant visible within `scope`, with its version.
    ///
    /// Absent records and records outside the scope are both `NotFound` —
    /// a guessed identifier must not reveal that the record exists.
    pub fn get_scoped(
        &self,
        id: &ParticipantId,
        scope: &Scope,
    ) -> Result<(Participant, u64), RtsmError> {
        match self.store.get(id) {
            Some((participant, version)) if scope.covers(&participant.site) => {
                Ok((participant, version))
            }
            _ => Err(RtsmError::NotFound {
                record: id.to_string(),
            }),
        }
    }

    /// All participants visible within `scope`, ordered by identifier.
    pub fn list_scoped(&self, scope: &Scope) -> Vec<Participant> {
        let mut participants: Vec<Participant> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|p| scope.covers(&p.site))
            .collect();
        participants.sort_by(|a, b| a.id.cmp(&b.id));
        participants
    }

    /// Code-broken participants visible within `scope`, ordered by id.
    pub fn list_code_broken_scoped(&self, scope: &Scope) -> Vec<Participant> {
        let mut participants: Vec<Participant> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|p| scope.covers(&p.site) && p.status == ParticipantStatus::CodeBroken)
            .collect();
        participants.sort_by(|a, b| a.id.cmp(&b.id));
        participants
    }

    /// Apply a lifecycle mutation to a participant within `scope`.
    ///
    /// The scope is checked before the write lock is taken; since a
    /// participant's site never changes, the check cannot go stale. The
    /// closure runs serialized against all other writers of this record,
    /// and the updated record is returned on success.
    pub fn transition_scoped(
        &self,
        id: &ParticipantId,
        scope: &Scope,
        f: impl FnOnce(&mut Participant) -> Result<(), RtsmError>,
    ) -> Result<Participant, RtsmError> {
        self.get_scoped(id, scope)?;
        self.store.update(id, |participant| {
            f(participant)?;
            Ok(participant.clone())
        })
    }

    /// Commit a mutation only if the record version still matches.
    ///
    /// Used by randomization, which reads the record, waits on the
    /// allocator with no lock held, and commits here; a concurrent winner
    /// surfaces as `ConcurrentModification`.
    pub fn transition_if_version(
        &self,
        id: &ParticipantId,
        expected_version: u64,
        f: impl FnOnce(&mut Participant) -> Result<(), RtsmError>,
    ) -> Result<Participant, RtsmError> {
        self.store.update_if_version(id, expected_version, |participant| {
            f(participant)?;
            Ok(participant.clone())
        })
    }

    /// Number of participants ever enrolled.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no participant has been enrolled.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
