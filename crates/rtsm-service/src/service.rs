//! # Trial Service Facade
//!
//! Every exposed operation lives here. The shape of each method is the
//! same: capability check, scope filter, registry delegation, ledger
//! append. Route handlers and the CLI carry no business logic — they
//! resolve an [`Identity`] and call in.

use std::sync::Arc;

use rtsm_core::{
    Operation, PackId, ParticipantId, Role, RtsmError, Scope, Site, SiteCode, TrialDate, Username,
};
use rtsm_core::{ActorProfile, RegistrationCode};
use rtsm_registry::{
    ActorDirectory, ArrivalOutcome, CodeVault, EventLedger, EventSubject, EventType, IssuedCode,
    ParticipantRegistry, SiteRegistry, SupplyRegistry,
};
use rtsm_state::{
    Arrival, ArrivalStatus, Consignment, EnrollmentForm, Participant, ParticipantStatus,
};

use crate::allocator::{InventoryAllocator, PackAllocator};
use crate::config::SitePolicy;
use crate::resolver::{resolve, Credentials, Identity};

use rtsm_registry::HistoryEvent;

/// The orchestration facade over all registries.
pub struct TrialService {
    directory: Arc<ActorDirectory>,
    participants: ParticipantRegistry,
    supply: Arc<SupplyRegistry>,
    sites: SiteRegistry,
    codes: CodeVault,
    ledger: EventLedger,
    allocator: Box<dyn PackAllocator>,
    policy: SitePolicy,
}

impl TrialService {
    /// Create a service with the default inventory allocator.
    pub fn new(policy: SitePolicy) -> Self {
        let supply = Arc::new(SupplyRegistry::new());
        let allocator = Box::new(InventoryAllocator::new(Arc::clone(&supply)));
        Self::with_allocator(policy, supply, allocator)
    }

    /// Create a service with a caller-supplied allocator (used to wire an
    /// external allocation service, and by tests to inject failures).
    pub fn with_allocator(
        policy: SitePolicy,
        supply: Arc<SupplyRegistry>,
        allocator: Box<dyn PackAllocator>,
    ) -> Self {
        Self {
            directory: Arc::new(ActorDirectory::new()),
            participants: ParticipantRegistry::new(),
            supply,
            sites: SiteRegistry::new(),
            codes: CodeVault::new(),
            ledger: EventLedger::new(),
            allocator,
            policy,
        }
    }

    // ─── Identity ────────────────────────────────────────────────────

    /// Resolve credentials to an identity. Read-only.
    pub fn authenticate(&self, credentials: &Credentials) -> Result<Identity, RtsmError> {
        resolve(self.directory.as_ref(), credentials)
    }

    /// Register a new actor against a single-use registration code.
    ///
    /// No identity is required here; the registration code is the
    /// credential. The username is checked for availability before the
    /// code is consumed so a name collision does not burn the code.
    pub fn register_actor(
        &self,
        username: &str,
        password: &str,
        code: &RegistrationCode,
        site: Option<SiteCode>,
    ) -> Result<ActorProfile, RtsmError> {
        let username = Username::new(username)?;
        if self.directory.profile(&username).is_some() {
            return Err(RtsmError::Conflict {
                record: username.to_string(),
                reason: "username already exists".to_string(),
            });
        }
        if let Some(site) = &site {
            if !self.sites.exists(site) {
                return Err(RtsmError::Validation {
                    field: "site".to_string(),
                    reason: format!("unknown site {site}"),
                });
            }
        }
        let role = self.codes.consume(code)?;
        if site.is_some() && !role.is_site_scoped() {
            return Err(RtsmError::Validation {
                field: "site".to_string(),
                reason: format!("role {role} is global and takes no site assignment"),
            });
        }
        let profile = self.directory.register(username, password, role, site)?;
        tracing::info!(actor = %profile.username, role = %profile.role, "actor registered");
        Ok(profile)
    }

    /// Bind the calling actor to a site, once.
    ///
    /// Takes raw credentials rather than a resolved [`Identity`]: an actor
    /// who registered without a site cannot resolve a site scope yet —
    /// this is the one operation that bootstraps it.
    pub fn assign_site(
        &self,
        credentials: &Credentials,
        site: SiteCode,
    ) -> Result<ActorProfile, RtsmError> {
        let profile = self
            .directory
            .verify(&credentials.username, &credentials.password)?;
        if !profile.role.permits(Operation::AssignSite) {
            return Err(RtsmError::Forbidden {
                role: profile.role.to_string(),
                operation: Operation::AssignSite.to_string(),
            });
        }
        if !self.sites.exists(&site) {
            return Err(RtsmError::Validation {
                field: "site".to_string(),
                reason: format!("unknown site {site}"),
            });
        }
        let profile = self.directory.assign_site(&profile.username, site)?;
        tracing::info!(actor = %profile.username, site = ?profile.site, "site assigned");
        Ok(profile)
    }

    // ─── Participant lifecycle ───────────────────────────────────────

    /// Enroll a participant at the caller's site.
    pub fn enroll(&self, identity: &Identity, form: EnrollmentForm) -> Result<Participant, RtsmError> {
        self.authorize(identity, Operation::Enroll)?;
        let site = self.site_scope(identity)?.clone();
        if self.policy.require_active_site_for_enrollment && !self.sites.is_active(&site) {
            return Err(RtsmError::Validation {
                field: "site".to_string(),
                reason: format!("site {site} is not active"),
            });
        }
        let demographics = form.validate()?;
        let participant = self.participants.enroll(site.clone(), demographics)?;
        self.ledger.append(
            EventSubject::Participant(participant.id.clone()),
            EventType::Enrollment,
            format!(
                "enrolled at {site} with screening number {}",
                participant.screening_number
            ),
            None,
            identity.username.clone(),
        );
        tracing::info!(
            participant = %participant.id,
            site = %site,
            by = %identity.username,
            "participant enrolled"
        );
        Ok(participant)
    }

    /// Record a screen failure for a participant in scope.
    pub fn record_screen_failure(
        &self,
        identity: &Identity,
        id: &ParticipantId,
        date: TrialDate,
    ) -> Result<Participant, RtsmError> {
        self.authorize(identity, Operation::RecordScreenFailure)?;
        let by = identity.username.clone();
        let updated = self
            .participants
            .transition_scoped(id, &identity.scope, |participant| {
                participant.record_screen_failure(date, &by).map_err(Into::into)
            })?;
        self.ledger.append(
            EventSubject::Participant(updated.id.clone()),
            EventType::ScreenFailure,
            format!("screen failure recorded for {date}"),
            None,
            identity.username.clone(),
        );
        tracing::info!(participant = %updated.id, by = %identity.username, "screen failure recorded");
        Ok(updated)
    }

    /// Randomize a participant in scope via the allocator.
    ///
    /// The allocator call happens with no lock held and the participant
    /// still in `Enrolled`; commit is a compare-and-swap against the
    /// version read beforehand. An allocator failure commits nothing; a
    /// lost race surfaces as `ConcurrentModification` and the reserved
    /// pack is returned to the shelf.
    pub fn randomize(&self, identity: &Identity, id: &ParticipantId) -> Result<Participant, RtsmError> {
        self.authorize(identity, Operation::Randomize)?;
        let site = self.site_scope(identity)?.clone();
        let (participant, version) = self.participants.get_scoped(id, &identity.scope)?;
        if participant.status != ParticipantStatus::Enrolled {
            return Err(RtsmError::InvalidState {
                record: id.to_string(),
                current: participant.status.to_string(),
                attempted: ParticipantStatus::Randomized.to_string(),
            });
        }

        let pack = self.allocator.allocate(id, &site)?;
        // Reserve the pack before committing the participant so two racing
        // randomizations can never share one pack.
        self.supply
            .allocate_pack(&pack, id.clone())
            .map_err(|err| RtsmError::Allocation {
                reason: format!("pack {pack} was taken during allocation: {err}"),
            })?;

        let by = identity.username.clone();
        let assigned = pack.clone();
        let updated = match self.participants.transition_if_version(id, version, |participant| {
            participant.assign_pack(assigned.clone(), &by).map_err(Into::into)
        }) {
            Ok(updated) => updated,
            Err(err) => {
                if let Err(release_err) = self.supply.release_pack(&pack) {
                    tracing::warn!(pack = %pack, error = %release_err, "failed to release reserved pack");
                }
                return Err(err);
            }
        };

        self.ledger.append(
            EventSubject::Participant(updated.id.clone()),
            EventType::Randomization,
            format!("randomized to pack {pack}"),
            serde_json::to_value(&pack).ok(),
            identity.username.clone(),
        );
        tracing::info!(
            participant = %updated.id,
            pack = %pack,
            by = %identity.username,
            "participant randomized"
        );
        Ok(updated)
    }

    /// Record treatment completion for a participant in scope.
    pub fn complete_treatment(
        &self,
        identity: &Identity,
        id: &ParticipantId,
        date: TrialDate,
    ) -> Result<Participant, RtsmError> {
        self.authorize(identity, Operation::CompleteTreatment)?;
        let by = identity.username.clone();
        let updated = self
            .participants
            .transition_scoped(id, &identity.scope, |participant| {
                participant.complete_treatment(date, &by).map_err(Into::into)
            })?;
        self.ledger.append(
            EventSubject::Participant(updated.id.clone()),
            EventType::TreatmentCompletion,
            format!("treatment completed on {date}"),
            None,
            identity.username.clone(),
        );
        tracing::info!(participant = %updated.id, by = %identity.username, "treatment completed");
        Ok(updated)
    }

    /// Record an emergency code break for a participant in scope.
    ///
    /// One-way. The ledger entry carries the full prior-state snapshot of
    /// the record as structured details.
    pub fn break_code(
        &self,
        identity: &Identity,
        id: &ParticipantId,
        date: TrialDate,
        reason: String,
    ) -> Result<Participant, RtsmError> {
        self.authorize(identity, Operation::BreakCode)?;
        let by = identity.username.clone();
        let mut prior: Option<Participant> = None;
        let updated = self
            .participants
            .transition_scoped(id, &identity.scope, |participant| {
                prior = Some(participant.clone());
                participant
                    .break_code(date, reason.clone(), &by)
                    .map_err(Into::into)
            })?;
        let prior_status = prior
            .as_ref()
            .map(|p| p.status.to_string())
            .unwrap_or_default();
        self.ledger.append(
            EventSubject::Participant(updated.id.clone()),
            EventType::CodeBreak,
            format!("emergency code break ({reason}); prior status {prior_status}"),
            prior.as_ref().and_then(|p| serde_json::to_value(p).ok()),
            identity.username.clone(),
        );
        tracing::warn!(
            participant = %updated.id,
            by = %identity.username,
            %reason,
            "emergency code break recorded"
        );
        Ok(updated)
    }

    // ─── Participant queries ─────────────────────────────────────────

    /// Participants visible in the caller's scope.
    pub fn list_participants(&self, identity: &Identity) -> Result<Vec<Participant>, RtsmError> {
        self.authorize(identity, Operation::ListParticipants)?;
        Ok(self.participants.list_scoped(&identity.scope))
    }

    /// Code-broken participants visible in the caller's scope.
    pub fn list_code_broken(&self, identity: &Identity) -> Result<Vec<Participant>, RtsmError> {
        self.authorize(identity, Operation::ListCodeBroken)?;
        Ok(self.participants.list_code_broken_scoped(&identity.scope))
    }

    /// One participant's ledger history, in recorded order.
    pub fn participant_history(
        &self,
        identity: &Identity,
        id: &ParticipantId,
    ) -> Result<Vec<HistoryEvent>, RtsmError> {
        self.authorize(identity, Operation::ListParticipants)?;
        self.participants.get_scoped(id, &identity.scope)?;
        Ok(self.ledger.for_participant(id))
    }

    // ─── Supply chain ────────────────────────────────────────────────

    /// Raise a consignment for a pack to a destination site.
    pub fn raise_consignment(
        &self,
        identity: &Identity,
        pack: PackId,
        destination: SiteCode,
        raise_date: TrialDate,
    ) -> Result<Consignment, RtsmError> {
        self.authorize(identity, Operation::RaiseConsignment)?;
        if !self.sites.exists(&destination) {
            return Err(RtsmError::Validation {
                field: "destination".to_string(),
                reason: format!("unknown site {destination}"),
            });
        }
        if self.policy.require_active_site_for_consignment && !self.sites.is_active(&destination) {
            return Err(RtsmError::Validation {
                field: "destination".to_string(),
                reason: format!("site {destination} is not active"),
            });
        }
        let consignment = self.supply.raise_consignment(
            pack,
            destination,
            raise_date,
            identity.username.clone(),
        )?;
        self.ledger.append(
            EventSubject::Pack(consignment.pack.clone()),
            EventType::ConsignmentRaised,
            format!(
                "consignment {} raised to {}",
                consignment.id, consignment.destination
            ),
            None,
            identity.username.clone(),
        );
        tracing::info!(
            consignment = %consignment.id,
            pack = %consignment.pack,
            destination = %consignment.destination,
            by = %identity.username,
            "consignment raised"
        );
        Ok(consignment)
    }

    /// Record a shipment arrival at the caller's site.
    pub fn record_arrival(
        &self,
        identity: &Identity,
        pack: PackId,
        condition: ArrivalStatus,
        arrival_date: TrialDate,
        notes: String,
    ) -> Result<ArrivalOutcome, RtsmError> {
        self.authorize(identity, Operation::RecordArrival)?;
        let site = self.site_scope(identity)?.clone();
        let outcome = self.supply.record_arrival(
            pack,
            site,
            condition,
            arrival_date,
            notes,
            identity.username.clone(),
        )?;
        if let ArrivalOutcome::Recorded(arrival) = &outcome {
            self.ledger.append(
                EventSubject::Pack(arrival.pack.clone()),
                EventType::ShipmentArrival,
                format!("arrival recorded as {} at {}", arrival.status, arrival.site),
                None,
                identity.username.clone(),
            );
            tracing::info!(
                pack = %arrival.pack,
                status = %arrival.status,
                site = %arrival.site,
                by = %identity.username,
                "shipment arrival recorded"
            );
        }
        Ok(outcome)
    }

    /// Pending (unarrived) consignments for the caller's site.
    pub fn list_pending_shipments(&self, identity: &Identity) -> Result<Vec<Consignment>, RtsmError> {
        self.authorize(identity, Operation::ListPendingShipments)?;
        let site = self.site_scope(identity)?;
        Ok(self.supply.pending_for_site(site))
    }

    /// Every consignment ever raised (depot supply view).
    pub fn list_consignments(&self, identity: &Identity) -> Result<Vec<Consignment>, RtsmError> {
        self.authorize(identity, Operation::ListConsignments)?;
        Ok(self.supply.all_consignments())
    }

    /// The arrival recorded for a pack, if any.
    pub fn arrival_for(&self, pack: &PackId) -> Option<Arrival> {
        self.supply.arrival_for(pack)
    }

    // ─── Provisioning ────────────────────────────────────────────────

    /// Create or update a site definition.
    pub fn define_site(&self, identity: &Identity, site: Site) -> Result<Site, RtsmError> {
        self.authorize(identity, Operation::DefineSite)?;
        let stored = self.sites.define(site);
        tracing::info!(site = %stored.code, status = %stored.status, by = %identity.username, "site defined");
        Ok(stored)
    }

    /// All site definitions.
    pub fn list_sites(&self, identity: &Identity) -> Result<Vec<Site>, RtsmError> {
        self.authorize(identity, Operation::ListSites)?;
        Ok(self.sites.list())
    }

    /// Issue single-use registration codes, N per role.
    pub fn generate_registration_codes(
        &self,
        identity: &Identity,
        counts: &[(Role, u32)],
    ) -> Result<Vec<IssuedCode>, RtsmError> {
        self.authorize(identity, Operation::GenerateRegistrationCodes)?;
        let issued = self.issue_codes(counts);
        tracing::info!(count = issued.len(), by = %identity.username, "registration codes issued");
        Ok(issued)
    }

    // ─── Bootstrap (seed fixtures, no identity) ──────────────────────

    /// Seed a site definition at startup.
    pub fn seed_site(&self, site: Site) -> Site {
        self.sites.define(site)
    }

    /// Seed a pack onto the depot shelf at startup.
    pub fn seed_depot_pack(&self, pack: PackId) -> Result<(), RtsmError> {
        self.supply.register_pack(pack).map(|_| ())
    }

    /// Seed an actor directly (bypassing registration codes) at startup.
    pub fn seed_actor(
        &self,
        username: &str,
        password: &str,
        role: Role,
        site: Option<SiteCode>,
    ) -> Result<ActorProfile, RtsmError> {
        self.directory.register(Username::new(username)?, password, role, site)
    }

    /// Mint registration codes without an identity (startup seeding).
    pub fn issue_codes(&self, counts: &[(Role, u32)]) -> Vec<IssuedCode> {
        let mut issued = Vec::new();
        for (role, count) in counts {
            issued.extend(self.codes.mint(*role, *count));
        }
        issued
    }

    // ─── Accessors ───────────────────────────────────────────────────

    /// The event ledger (read-side access for dashboards and tests).
    pub fn ledger(&self) -> &EventLedger {
        &self.ledger
    }

    /// The supply registry (read-side access for dashboards and tests).
    pub fn supply(&self) -> &SupplyRegistry {
        &self.supply
    }

    // ─── Enforcement helpers ─────────────────────────────────────────

    /// The single capability check.
    fn authorize(&self, identity: &Identity, operation: Operation) -> Result<(), RtsmError> {
        if identity.role.permits(operation) {
            Ok(())
        } else {
            tracing::warn!(
                actor = %identity.username,
                role = %identity.role,
                operation = %operation,
                "operation forbidden"
            );
            Err(RtsmError::Forbidden {
                role: identity.role.to_string(),
                operation: operation.to_string(),
            })
        }
    }

    /// The caller's site, for operations that only make sense site-scoped.
    fn site_scope<'a>(&self, identity: &'a Identity) -> Result<&'a SiteCode, RtsmError> {
        match &identity.scope {
            Scope::Site(site) => Ok(site),
            Scope::Global => Err(RtsmError::Validation {
                field: "site".to_string(),
                reason: format!("{} requires a site-scoped actor", identity.role),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtsm_core::SiteStatus;
    use rtsm_state::Gender;

    fn date(s: &str) -> TrialDate {
        TrialDate::parse(s).unwrap()
    }

    fn site_code(s: &str) -> SiteCode {
        SiteCode::new(s).unwrap()
    }

    fn site(code: &str, status: SiteStatus) -> Site {
        Site {
            code: site_code(code),
            name: format!("{code} Hospital"),
            status,
            activation_date: date("2026-01-01"),
        }
    }

    fn form() -> EnrollmentForm {
        EnrollmentForm {
            enrollment_date: Some(date("2026-01-12")),
            consent_date: Some(date("2026-01-10")),
            date_of_birth: Some(date("1984-07-01")),
            gender: Some(Gender::Female),
        }
    }

    /// A service seeded with two active sites and the standard cast.
    fn seeded_service(policy: SitePolicy) -> TrialService {
        let service = TrialService::new(policy);
        service.seed_site(site("SITEA", SiteStatus::Active));
        service.seed_site(site("SITEB", SiteStatus::Active));
        service
            .seed_actor("inv_a", "pw", Role::Investigator, Some(site_code("SITEA")))
            .unwrap();
        service
            .seed_actor("inv_b", "pw", Role::Investigator, Some(site_code("SITEB")))
            .unwrap();
        service
            .seed_actor("mon_a", "pw", Role::Monitor, Some(site_code("SITEA")))
            .unwrap();
        service.seed_actor("depot_ops", "pw", Role::Depot, None).unwrap();
        service.seed_actor("study_admin", "pw", Role::Administrator, None).unwrap();
        service
    }

    fn identity(service: &TrialService, username: &str) -> Identity {
        service
            .authenticate(&Credentials {
                username: username.to_string(),
                password: "pw".to_string(),
            })
            .unwrap()
    }

    fn stock_site_a(service: &TrialService, pack: &str) {
        service.seed_depot_pack(PackId::new(pack).unwrap()).unwrap();
        let depot = identity(service, "depot_ops");
        service
            .raise_consignment(
                &depot,
                PackId::new(pack).unwrap(),
                site_code("SITEA"),
                date("2026-02-01"),
            )
            .unwrap();
        let inv = identity(service, "inv_a");
        service
            .record_arrival(
                &inv,
                PackId::new(pack).unwrap(),
                ArrivalStatus::Arrived,
                date("2026-02-05"),
                String::new(),
            )
            .unwrap();
    }

    // ── Capability enforcement ───────────────────────────────────────

    #[test]
    fn test_monitor_cannot_enroll() {
        let service = seeded_service(SitePolicy::default());
        let monitor = identity(&service, "mon_a");
        let err = service.enroll(&monitor, form()).unwrap_err();
        assert_eq!(err.kind(), "forbidden");
    }

    #[test]
    fn test_depot_cannot_touch_participants() {
        let service = seeded_service(SitePolicy::default());
        let depot = identity(&service, "depot_ops");
        assert_eq!(service.enroll(&depot, form()).unwrap_err().kind(), "forbidden");
        assert_eq!(
            service.list_participants(&depot).unwrap_err().kind(),
            "forbidden"
        );
    }

    #[test]
    fn test_administrator_has_no_participant_visibility() {
        let service = seeded_service(SitePolicy::default());
        let admin = identity(&service, "study_admin");
        assert_eq!(
            service.list_participants(&admin).unwrap_err().kind(),
            "forbidden"
        );
        assert_eq!(
            service.list_consignments(&admin).unwrap_err().kind(),
            "forbidden"
        );
    }

    #[test]
    fn test_investigator_cannot_provision() {
        let service = seeded_service(SitePolicy::default());
        let inv = identity(&service, "inv_a");
        let err = service
            .define_site(&inv, site("SITEC", SiteStatus::Pending))
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");
        assert_eq!(
            service
                .generate_registration_codes(&inv, &[(Role::Monitor, 1)])
                .unwrap_err()
                .kind(),
            "forbidden"
        );
    }

    // ── Scope isolation ──────────────────────────────────────────────

    #[test]
    fn test_cross_site_lookup_is_not_found() {
        let service = seeded_service(SitePolicy::default());
        let inv_a = identity(&service, "inv_a");
        let inv_b = identity(&service, "inv_b");
        let participant = service.enroll(&inv_a, form()).unwrap();

        // Targeted lookup of a guessed id from another site leaks nothing.
        let err = service
            .record_screen_failure(&inv_b, &participant.id, date("2026-01-20"))
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert!(service.list_participants(&inv_b).unwrap().is_empty());
    }

    #[test]
    fn test_listing_never_crosses_sites() {
        let service = seeded_service(SitePolicy::default());
        let inv_a = identity(&service, "inv_a");
        let inv_b = identity(&service, "inv_b");
        service.enroll(&inv_a, form()).unwrap();
        service.enroll(&inv_b, form()).unwrap();

        let listed = service.list_participants(&inv_a).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].site, site_code("SITEA"));
    }

    // ── Randomization ────────────────────────────────────────────────

    #[test]
    fn test_randomize_assigns_available_pack() {
        let service = seeded_service(SitePolicy::default());
        stock_site_a(&service, "PK001");
        let inv = identity(&service, "inv_a");
        let participant = service.enroll(&inv, form()).unwrap();

        let updated = service.randomize(&inv, &participant.id).unwrap();
        assert_eq!(updated.status, ParticipantStatus::Randomized);
        assert_eq!(updated.pack, Some(PackId::new("PK001").unwrap()));
    }

    #[test]
    fn test_randomize_without_stock_fails_and_is_retryable() {
        let service = seeded_service(SitePolicy::default());
        let inv = identity(&service, "inv_a");
        let participant = service.enroll(&inv, form()).unwrap();

        let err = service.randomize(&inv, &participant.id).unwrap_err();
        assert_eq!(err.kind(), "allocation");
        assert!(err.is_retryable());

        // State unchanged; retry succeeds once stock lands, with exactly
        // one pack assigned.
        stock_site_a(&service, "PK002");
        let updated = service.randomize(&inv, &participant.id).unwrap();
        assert_eq!(updated.pack, Some(PackId::new("PK002").unwrap()));
        let err = service.randomize(&inv, &participant.id).unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }

    #[test]
    fn test_concurrent_transition_during_allocator_call_loses_cleanly() {
        use std::sync::Mutex;

        type Hook = Box<dyn FnOnce() + Send>;

        /// Allocator that fires a one-shot hook mid-call, simulating a
        /// competing transition landing while the allocator is out.
        struct RacingAllocator {
            pack: PackId,
            hook: Mutex<Option<Hook>>,
        }
        impl PackAllocator for Arc<RacingAllocator> {
            fn allocate(&self, _: &ParticipantId, _: &SiteCode) -> Result<PackId, RtsmError> {
                if let Some(hook) = self.hook.lock().unwrap().take() {
                    hook();
                }
                Ok(self.pack.clone())
            }
        }

        let racing = Arc::new(RacingAllocator {
            pack: PackId::new("PK001").unwrap(),
            hook: Mutex::new(None),
        });
        let supply = Arc::new(SupplyRegistry::new());
        let service = Arc::new(TrialService::with_allocator(
            SitePolicy::default(),
            Arc::clone(&supply),
            Box::new(Arc::clone(&racing)),
        ));
        service.seed_site(site("SITEA", SiteStatus::Active));
        service
            .seed_actor("inv_a", "pw", Role::Investigator, Some(site_code("SITEA")))
            .unwrap();
        service.seed_actor("depot_ops", "pw", Role::Depot, None).unwrap();
        service.seed_depot_pack(PackId::new("PK001").unwrap()).unwrap();
        let depot = identity(&service, "depot_ops");
        service
            .raise_consignment(&depot, PackId::new("PK001").unwrap(), site_code("SITEA"), date("2026-02-01"))
            .unwrap();
        let inv = identity(&service, "inv_a");
        service
            .record_arrival(&inv, PackId::new("PK001").unwrap(), ArrivalStatus::Arrived, date("2026-02-05"), String::new())
            .unwrap();
        let participant = service.enroll(&inv, form()).unwrap();

        // While randomize waits on the allocator, a screen failure wins
        // the race on the same record.
        {
            let service = Arc::clone(&service);
            let inv = inv.clone();
            let id = participant.id.clone();
            *racing.hook.lock().unwrap() = Some(Box::new(move || {
                service
                    .record_screen_failure(&inv, &id, date("2026-01-20"))
                    .unwrap();
            }));
        }

        let err = service.randomize(&inv, &participant.id).unwrap_err();
        assert_eq!(err.kind(), "concurrent_modification");
        assert!(err.is_retryable());

        // The loser committed nothing: still screen-failed, no pack
        // assigned, and the reserved pack is back on the shelf.
        let listed = service.list_participants(&inv).unwrap();
        assert_eq!(listed[0].status, ParticipantStatus::ScreenFailed);
        assert!(listed[0].pack.is_none());
        assert_eq!(
            service.supply().available_at(&site_code("SITEA")),
            vec![PackId::new("PK001").unwrap()]
        );
    }

    // ── Policy gating ────────────────────────────────────────────────

    #[test]
    fn test_enrollment_gate_blocks_pending_site() {
        let policy = SitePolicy {
            require_active_site_for_enrollment: true,
            require_active_site_for_consignment: false,
        };
        let service = TrialService::new(policy);
        service.seed_site(site("SITEA", SiteStatus::Pending));
        service
            .seed_actor("inv_a", "pw", Role::Investigator, Some(site_code("SITEA")))
            .unwrap();
        let inv = identity(&service, "inv_a");
        let err = service.enroll(&inv, form()).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_consignment_gate_blocks_inactive_site() {
        let policy = SitePolicy {
            require_active_site_for_enrollment: false,
            require_active_site_for_consignment: true,
        };
        let service = TrialService::new(policy);
        service.seed_site(site("SITEA", SiteStatus::Inactive));
        service.seed_actor("depot_ops", "pw", Role::Depot, None).unwrap();
        service.seed_depot_pack(PackId::new("PK001").unwrap()).unwrap();
        let depot = identity(&service, "depot_ops");
        let err = service
            .raise_consignment(&depot, PackId::new("PK001").unwrap(), site_code("SITEA"), date("2026-02-01"))
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_default_policy_permits_pending_site() {
        let service = TrialService::new(SitePolicy::default());
        service.seed_site(site("SITEA", SiteStatus::Pending));
        service
            .seed_actor("inv_a", "pw", Role::Investigator, Some(site_code("SITEA")))
            .unwrap();
        let inv = identity(&service, "inv_a");
        assert!(service.enroll(&inv, form()).is_ok());
    }

    // ── Registration ─────────────────────────────────────────────────

    #[test]
    fn test_registration_code_is_single_use() {
        let service = seeded_service(SitePolicy::default());
        let admin = identity(&service, "study_admin");
        let issued = service
            .generate_registration_codes(&admin, &[(Role::Monitor, 1)])
            .unwrap();
        let code = issued[0].code.clone();

        let profile = service
            .register_actor("mon_new", "pw", &code, Some(site_code("SITEB")))
            .unwrap();
        assert_eq!(profile.role, Role::Monitor);

        let err = service
            .register_actor("mon_other", "pw", &code, Some(site_code("SITEB")))
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_username_collision_does_not_burn_code() {
        let service = seeded_service(SitePolicy::default());
        let admin = identity(&service, "study_admin");
        let issued = service
            .generate_registration_codes(&admin, &[(Role::Monitor, 1)])
            .unwrap();
        let code = issued[0].code.clone();

        let err = service
            .register_actor("inv_a", "pw", &code, Some(site_code("SITEA")))
            .unwrap_err();
        assert_eq!(err.kind(), "conflict");

        // The code still admits a registration.
        assert!(service
            .register_actor("mon_new", "pw", &code, Some(site_code("SITEA")))
            .is_ok());
    }

    #[test]
    fn test_registered_actor_can_authenticate() {
        let service = seeded_service(SitePolicy::default());
        let admin = identity(&service, "study_admin");
        let issued = service
            .generate_registration_codes(&admin, &[(Role::Investigator, 1)])
            .unwrap();
        service
            .register_actor("inv_new", "s3cret", &issued[0].code, Some(site_code("SITEB")))
            .unwrap();

        let resolved = service
            .authenticate(&Credentials {
                username: "inv_new".to_string(),
                password: "s3cret".to_string(),
            })
            .unwrap();
        assert_eq!(resolved.role, Role::Investigator);
        assert_eq!(resolved.scope, Scope::Site(site_code("SITEB")));
    }

    // ── Site assignment ──────────────────────────────────────────────

    #[test]
    fn test_assign_site_bootstraps_an_unassigned_actor() {
        let service = seeded_service(SitePolicy::default());
        service.seed_actor("mon_b", "pw", Role::Monitor, None).unwrap();
        let credentials = Credentials {
            username: "mon_b".to_string(),
            password: "pw".to_string(),
        };

        // No site yet: authentication cannot resolve a scope.
        assert_eq!(
            service.authenticate(&credentials).unwrap_err().kind(),
            "validation"
        );

        service.assign_site(&credentials, site_code("SITEB")).unwrap();
        let resolved = service.authenticate(&credentials).unwrap();
        assert_eq!(resolved.scope, Scope::Site(site_code("SITEB")));

        // Single assignment: a second bind is rejected and the first stands.
        let err = service
            .assign_site(&credentials, site_code("SITEA"))
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(
            service.authenticate(&credentials).unwrap().scope,
            Scope::Site(site_code("SITEB"))
        );
    }

    #[test]
    fn test_assign_site_validates_site_and_role() {
        let service = seeded_service(SitePolicy::default());
        let monitor_credentials = Credentials {
            username: "mon_a".to_string(),
            password: "pw".to_string(),
        };
        let err = service
            .assign_site(&monitor_credentials, site_code("GHOST"))
            .unwrap_err();
        assert_eq!(err.kind(), "validation");

        // Global roles have no site to assign.
        let depot_credentials = Credentials {
            username: "depot_ops".to_string(),
            password: "pw".to_string(),
        };
        let err = service
            .assign_site(&depot_credentials, site_code("SITEA"))
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");
    }

    // ── History ──────────────────────────────────────────────────────

    #[test]
    fn test_history_is_scope_checked() {
        let service = seeded_service(SitePolicy::default());
        let inv_a = identity(&service, "inv_a");
        let inv_b = identity(&service, "inv_b");
        let participant = service.enroll(&inv_a, form()).unwrap();

        assert_eq!(
            service.participant_history(&inv_a, &participant.id).unwrap().len(),
            1
        );
        let err = service
            .participant_history(&inv_b, &participant.id)
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_code_break_event_carries_prior_snapshot() {
        let service = seeded_service(SitePolicy::default());
        stock_site_a(&service, "PK001");
        let inv = identity(&service, "inv_a");
        let monitor = identity(&service, "mon_a");
        let participant = service.enroll(&inv, form()).unwrap();
        service.randomize(&inv, &participant.id).unwrap();
        service
            .break_code(&monitor, &participant.id, date("2026-03-02"), "SAE".to_string())
            .unwrap();

        let history = service.participant_history(&inv, &participant.id).unwrap();
        let break_event = history.last().unwrap();
        let details = break_event.details.as_ref().unwrap();
        assert_eq!(details["status"], "randomized");
        assert_eq!(details["pack"], "PK001");
    }
}
