//! # Participant Lifecycle State Machine
//!
//! Models the lifecycle of an enrolled trial participant.
//!
//! ## States
//!
//! ```text
//! Enrolled ──▶ ScreenFailed (terminal)
//!    │
//!    ▼
//! Randomized ──▶ TreatmentCompleted (terminal)
//!    │
//!    └──▶ CodeBroken (terminal)
//! ```
//!
//! A code break is valid only from `Randomized` — emergency unblinding
//! after treatment completion is not a lifecycle transition. Participants
//! are never hard-deleted; every transition is appended to the record's
//! ordered transition log.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use rtsm_core::{PackId, ParticipantId, RtsmError, ScreeningNumber, SiteCode, Timestamp, TrialDate, Username};

// ─── Lifecycle Status ────────────────────────────────────────────────

/// The lifecycle status of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// Enrolled and awaiting screening outcome or randomization.
    Enrolled,
    /// Failed screening (terminal).
    ScreenFailed,
    /// Randomized to a treatment pack.
    Randomized,
    /// Completed treatment (terminal).
    TreatmentCompleted,
    /// Emergency unblinding performed (terminal).
    CodeBroken,
}

impl ParticipantStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ScreenFailed | Self::TreatmentCompleted | Self::CodeBroken
        )
    }

    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enrolled => "ENROLLED",
            Self::ScreenFailed => "SCREEN_FAILED",
            Self::Randomized => "RANDOMIZED",
            Self::TreatmentCompleted => "TREATMENT_COMPLETED",
            Self::CodeBroken => "CODE_BROKEN",
        }
    }
}

impl std::fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Demographics ────────────────────────────────────────────────────

/// Participant gender as captured at enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    Other,
}

impl FromStr for Gender {
    type Err = RtsmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "female" | "f" => Ok(Self::Female),
            "male" | "m" => Ok(Self::Male),
            "other" => Ok(Self::Other),
            other => Err(RtsmError::Validation {
                field: "gender".to_string(),
                reason: format!("unknown gender {other:?}"),
            }),
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Female => "female",
            Self::Male => "male",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Validated demographics, all fields present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    /// Date of enrollment.
    pub enrollment_date: TrialDate,
    /// Date informed consent was given.
    pub consent_date: TrialDate,
    /// Date of birth.
    pub date_of_birth: TrialDate,
    /// Gender.
    pub gender: Gender,
}

/// Enrollment input as submitted, before presence validation.
///
/// Each required field is optional here so that a missing field surfaces
/// as a field-level validation error rather than a deserialization
/// failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentForm {
    /// Date of enrollment.
    pub enrollment_date: Option<TrialDate>,
    /// Date informed consent was given.
    pub consent_date: Option<TrialDate>,
    /// Date of birth.
    pub date_of_birth: Option<TrialDate>,
    /// Gender.
    pub gender: Option<Gender>,
}

impl EnrollmentForm {
    /// Check all required fields are present.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first absent field.
    pub fn validate(self) -> Result<Demographics, RtsmError> {
        let missing = |field: &str| RtsmError::Validation {
            field: field.to_string(),
            reason: "required field is absent".to_string(),
        };
        Ok(Demographics {
            enrollment_date: self.enrollment_date.ok_or_else(|| missing("enrollment_date"))?,
            consent_date: self.consent_date.ok_or_else(|| missing("consent_date"))?,
            date_of_birth: self.date_of_birth.ok_or_else(|| missing("date_of_birth"))?,
            gender: self.gender.ok_or_else(|| missing("gender"))?,
        })
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors that can occur during participant lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParticipantError {
    /// Attempted transition is not valid from the current status.
    #[error("invalid participant transition for {id}: {from} -> {to}")]
    InvalidTransition {
        /// The participant.
        id: ParticipantId,
        /// Current status.
        from: ParticipantStatus,
        /// Attempted target status.
        to: ParticipantStatus,
    },

    /// Participant is in a terminal status.
    #[error("participant {id} is in terminal status {status}")]
    Terminal {
        /// The participant.
        id: ParticipantId,
        /// The terminal status.
        status: ParticipantStatus,
    },

    /// A pack is already assigned; a participant never holds two packs.
    #[error("participant {id} already holds pack {pack}")]
    PackAlreadyAssigned {
        /// The participant.
        id: ParticipantId,
        /// The pack already held.
        pack: PackId,
    },
}

impl From<ParticipantError> for RtsmError {
    fn from(err: ParticipantError) -> Self {
        match err {
            ParticipantError::InvalidTransition { id, from, to } => RtsmError::InvalidState {
                record: id.to_string(),
                current: from.to_string(),
                attempted: to.to_string(),
            },
            ParticipantError::Terminal { id, status } => RtsmError::InvalidState {
                record: id.to_string(),
                current: status.to_string(),
                attempted: "any transition".to_string(),
            },
            ParticipantError::PackAlreadyAssigned { id, pack } => RtsmError::InvalidState {
                record: id.to_string(),
                current: format!("holding pack {pack}"),
                attempted: "second pack assignment".to_string(),
            },
        }
    }
}

// ─── Transition Record ───────────────────────────────────────────────

/// Record of a participant status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Status before the transition.
    pub from_status: ParticipantStatus,
    /// Status after the transition.
    pub to_status: ParticipantStatus,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Actor who performed the transition.
    pub recorded_by: Username,
}

// ─── Participant ─────────────────────────────────────────────────────

/// An enrolled participant with lifecycle status and transition history.
///
/// The site never changes after creation. Mutation happens only through
/// the transition methods below, each of which validates the current
/// status first and logs the transition on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Global participant identifier.
    pub id: ParticipantId,
    /// Site-scoped screening label.
    pub screening_number: ScreeningNumber,
    /// The enrolling site. Immutable.
    pub site: SiteCode,
    /// Current lifecycle status.
    pub status: ParticipantStatus,
    /// Demographics captured at enrollment.
    pub demographics: Demographics,
    /// Assigned treatment pack, set by randomization.
    pub pack: Option<PackId>,
    /// Date of screen failure, if any.
    pub screen_failure_date: Option<TrialDate>,
    /// Date of treatment completion, if any.
    pub completion_date: Option<TrialDate>,
    /// Date of emergency code break, if any.
    pub code_break_date: Option<TrialDate>,
    /// Reason given for the code break, if any.
    pub code_break_reason: Option<String>,
    /// When the record was created.
    pub created_at: Timestamp,
    /// Ordered log of all status transitions.
    pub transitions: Vec<TransitionRecord>,
}

impl Participant {
    /// Create a participant in `Enrolled`.
    pub fn new(
        id: ParticipantId,
        screening_number: ScreeningNumber,
        site: SiteCode,
        demographics: Demographics,
    ) -> Self {
        Self {
            id,
            screening_number,
            site,
            status: ParticipantStatus::Enrolled,
            demographics,
            pack: None,
            screen_failure_date: None,
            completion_date: None,
            code_break_date: None,
            code_break_reason: None,
            created_at: Timestamp::now(),
            transitions: Vec::new(),
        }
    }

    /// Record a screen failure (ENROLLED → SCREEN_FAILED).
    pub fn record_screen_failure(
        &mut self,
        date: TrialDate,
        recorded_by: &Username,
    ) -> Result<(), ParticipantError> {
        self.require_state(ParticipantStatus::Enrolled, ParticipantStatus::ScreenFailed)?;
        self.screen_failure_date = Some(date);
        self.do_transition(ParticipantStatus::ScreenFailed, recorded_by);
        Ok(())
    }

    /// Store the allocator's pack assignment (ENROLLED → RANDOMIZED).
    ///
    /// Rejects a second assignment even if the status check were to pass —
    /// one participant, one pack, ever.
    pub fn assign_pack(
        &mut self,
        pack: PackId,
        recorded_by: &Username,
    ) -> Result<(), ParticipantError> {
        if let Some(existing) = &self.pack {
            return Err(ParticipantError::PackAlreadyAssigned {
                id: self.id.clone(),
                pack: existing.clone(),
            });
        }
        self.require_state(ParticipantStatus::Enrolled, ParticipantStatus::Randomized)?;
        self.pack = Some(pack);
        self.do_transition(ParticipantStatus::Randomized, recorded_by);
        Ok(())
    }

    /// Record treatment completion (RANDOMIZED → TREATMENT_COMPLETED).
    pub fn complete_treatment(
        &mut self,
        date: TrialDate,
        recorded_by: &Username,
    ) -> Result<(), ParticipantError> {
        self.require_state(
            ParticipantStatus::Randomized,
            ParticipantStatus::TreatmentCompleted,
        )?;
        self.completion_date = Some(date);
        self.do_transition(ParticipantStatus::TreatmentCompleted, recorded_by);
        Ok(())
    }

    /// Record an emergency code break (RANDOMIZED → CODE_BROKEN).
    ///
    /// One-way and non-reversible. Only valid from `Randomized` — a
    /// participant whose treatment is already completed cannot be unblinded
    /// through the lifecycle.
    pub fn break_code(
        &mut self,
        date: TrialDate,
        reason: String,
        recorded_by: &Username,
    ) -> Result<(), ParticipantError> {
        self.require_state(ParticipantStatus::Randomized, ParticipantStatus::CodeBroken)?;
        self.code_break_date = Some(date);
        self.code_break_reason = Some(reason);
        self.do_transition(ParticipantStatus::CodeBroken, recorded_by);
        Ok(())
    }

    /// Whether the participant is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Validate that the participant is in the expected status.
    fn require_state(
        &self,
        expected: ParticipantStatus,
        target: ParticipantStatus,
    ) -> Result<(), ParticipantError> {
        if self.status.is_terminal() {
            return Err(ParticipantError::Terminal {
                id: self.id.clone(),
                status: self.status,
            });
        }
        if self.status != expected {
            return Err(ParticipantError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    /// Record a status transition.
    fn do_transition(&mut self, to: ParticipantStatus, recorded_by: &Username) {
        self.transitions.push(TransitionRecord {
            from_status: self.status,
            to_status: to,
            timestamp: Timestamp::now(),
            recorded_by: recorded_by.clone(),
        });
        self.status = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn demographics() -> Demographics {
        Demographics {
            enrollment_date: TrialDate::parse("2026-01-12").unwrap(),
            consent_date: TrialDate::parse("2026-01-10").unwrap(),
            date_of_birth: TrialDate::parse("1984-07-01").unwrap(),
            gender: Gender::Female,
        }
    }

    fn investigator() -> Username {
        Username::new("inv_a").unwrap()
    }

    fn date(s: &str) -> TrialDate {
        TrialDate::parse(s).unwrap()
    }

    fn make_participant() -> Participant {
        let site = SiteCode::new("SITEA").unwrap();
        Participant::new(
            ParticipantId::from_sequence(1),
            ScreeningNumber::from_sequence(&site, 1),
            site,
            demographics(),
        )
    }

    fn make_randomized() -> Participant {
        let mut p = make_participant();
        p.assign_pack(PackId::new("PK001").unwrap(), &investigator())
            .unwrap();
        p
    }

    // ── Happy-path lifecycle tests ───────────────────────────────────

    #[test]
    fn test_new_participant_is_enrolled() {
        let p = make_participant();
        assert_eq!(p.status, ParticipantStatus::Enrolled);
        assert!(p.pack.is_none());
        assert!(!p.is_terminal());
        assert!(p.transitions.is_empty());
    }

    #[test]
    fn test_enrolled_to_screen_failed() {
        let mut p = make_participant();
        p.record_screen_failure(date("2026-01-20"), &investigator())
            .unwrap();
        assert_eq!(p.status, ParticipantStatus::ScreenFailed);
        assert_eq!(p.screen_failure_date, Some(date("2026-01-20")));
        assert!(p.is_terminal());
    }

    #[test]
    fn test_enrolled_to_randomized() {
        let p = make_randomized();
        assert_eq!(p.status, ParticipantStatus::Randomized);
        assert_eq!(p.pack, Some(PackId::new("PK001").unwrap()));
    }

    #[test]
    fn test_randomized_to_completed() {
        let mut p = make_randomized();
        p.complete_treatment(date("2026-05-01"), &investigator())
            .unwrap();
        assert_eq!(p.status, ParticipantStatus::TreatmentCompleted);
        assert_eq!(p.completion_date, Some(date("2026-05-01")));
        assert!(p.is_terminal());
    }

    #[test]
    fn test_randomized_to_code_broken() {
        let mut p = make_randomized();
        p.break_code(date("2026-03-02"), "anaphylaxis in ER".to_string(), &investigator())
            .unwrap();
        assert_eq!(p.status, ParticipantStatus::CodeBroken);
        assert_eq!(p.code_break_date, Some(date("2026-03-02")));
        assert_eq!(p.code_break_reason.as_deref(), Some("anaphylaxis in ER"));
        assert!(p.is_terminal());
    }

    // ── Invalid transition tests ─────────────────────────────────────

    #[test]
    fn test_cannot_break_code_from_enrolled() {
        let mut p = make_participant();
        let result = p.break_code(date("2026-03-02"), "reason".to_string(), &investigator());
        assert!(matches!(
            result,
            Err(ParticipantError::InvalidTransition { .. })
        ));
        assert_eq!(p.status, ParticipantStatus::Enrolled);
    }

    #[test]
    fn test_cannot_complete_from_enrolled() {
        let mut p = make_participant();
        assert!(p
            .complete_treatment(date("2026-05-01"), &investigator())
            .is_err());
    }

    #[test]
    fn test_cannot_break_code_after_completion() {
        let mut p = make_randomized();
        p.complete_treatment(date("2026-05-01"), &investigator())
            .unwrap();
        let result = p.break_code(date("2026-05-02"), "too late".to_string(), &investigator());
        assert!(matches!(result, Err(ParticipantError::Terminal { .. })));
    }

    #[test]
    fn test_cannot_screen_fail_after_randomization() {
        let mut p = make_randomized();
        let result = p.record_screen_failure(date("2026-02-01"), &investigator());
        assert!(matches!(
            result,
            Err(ParticipantError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_screen_failed_is_terminal() {
        let mut p = make_participant();
        p.record_screen_failure(date("2026-01-20"), &investigator())
            .unwrap();
        assert!(p
            .assign_pack(PackId::new("PK001").unwrap(), &investigator())
            .is_err());
        assert!(p
            .complete_treatment(date("2026-05-01"), &investigator())
            .is_err());
    }

    #[test]
    fn test_repeat_transition_rejected() {
        let mut p = make_participant();
        p.record_screen_failure(date("2026-01-20"), &investigator())
            .unwrap();
        let result = p.record_screen_failure(date("2026-01-21"), &investigator());
        assert!(matches!(result, Err(ParticipantError::Terminal { .. })));
        assert_eq!(p.screen_failure_date, Some(date("2026-01-20")));
    }

    #[test]
    fn test_never_two_packs() {
        let mut p = make_randomized();
        let result = p.assign_pack(PackId::new("PK002").unwrap(), &investigator());
        assert!(matches!(
            result,
            Err(ParticipantError::PackAlreadyAssigned { .. })
        ));
        assert_eq!(p.pack, Some(PackId::new("PK001").unwrap()));
    }

    // ── Transition log tests ─────────────────────────────────────────

    #[test]
    fn test_transition_log_records_full_path() {
        let mut p = make_randomized();
        p.break_code(date("2026-03-02"), "reason".to_string(), &investigator())
            .unwrap();

        assert_eq!(p.transitions.len(), 2);
        assert_eq!(p.transitions[0].from_status, ParticipantStatus::Enrolled);
        assert_eq!(p.transitions[0].to_status, ParticipantStatus::Randomized);
        assert_eq!(p.transitions[1].from_status, ParticipantStatus::Randomized);
        assert_eq!(p.transitions[1].to_status, ParticipantStatus::CodeBroken);
    }

    #[test]
    fn test_failed_transition_leaves_no_log_entry() {
        let mut p = make_participant();
        let _ = p.complete_treatment(date("2026-05-01"), &investigator());
        assert!(p.transitions.is_empty());
    }

    // ── Form validation tests ────────────────────────────────────────

    #[test]
    fn test_enrollment_form_validates_complete_input() {
        let form = EnrollmentForm {
            enrollment_date: Some(date("2026-01-12")),
            consent_date: Some(date("2026-01-10")),
            date_of_birth: Some(date("1984-07-01")),
            gender: Some(Gender::Male),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_enrollment_form_names_missing_field() {
        let form = EnrollmentForm {
            enrollment_date: Some(date("2026-01-12")),
            consent_date: None,
            date_of_birth: Some(date("1984-07-01")),
            gender: Some(Gender::Male),
        };
        match form.validate() {
            Err(RtsmError::Validation { field, .. }) => assert_eq!(field, "consent_date"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!(Gender::from_str("Female").unwrap(), Gender::Female);
        assert_eq!(Gender::from_str("m").unwrap(), Gender::Male);
        assert!(Gender::from_str("unknown").is_err());
    }

    // ── Serialization tests ──────────────────────────────────────────

    #[test]
    fn test_participant_serialization() {
        let p = make_randomized();
        let json = serde_json::to_string(&p).unwrap();
        let parsed: Participant = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, p.status);
        assert_eq!(parsed.id, p.id);
        assert_eq!(parsed.pack, p.pack);
    }

    // ── Lifecycle graph property ─────────────────────────────────────

    #[derive(Debug, Clone)]
    enum Op {
        ScreenFail,
        AssignPack,
        Complete,
        Break,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::ScreenFail),
            Just(Op::AssignPack),
            Just(Op::Complete),
            Just(Op::Break),
        ]
    }

    /// Edges of the lifecycle graph. Any observed transition outside this
    /// set is a defect.
    fn is_legal_edge(from: ParticipantStatus, to: ParticipantStatus) -> bool {
        use ParticipantStatus::*;
        matches!(
            (from, to),
            (Enrolled, ScreenFailed)
                | (Enrolled, Randomized)
                | (Randomized, TreatmentCompleted)
                | (Randomized, CodeBroken)
        )
    }

    proptest! {
        #[test]
        fn prop_no_sequence_escapes_the_lifecycle_graph(ops in prop::collection::vec(op_strategy(), 0..24)) {
            let mut p = make_participant();
            let by = investigator();
            for (i, op) in ops.into_iter().enumerate() {
                let before = p.status;
                let result = match op {
                    Op::ScreenFail => p.record_screen_failure(date("2026-01-20"), &by).map(|_| ()),
                    Op::AssignPack => p
                        .assign_pack(PackId::new(format!("PK{i:03}")).unwrap(), &by)
                        .map(|_| ()),
                    Op::Complete => p.complete_treatment(date("2026-05-01"), &by).map(|_| ()),
                    Op::Break => p
                        .break_code(date("2026-03-02"), "property".to_string(), &by)
                        .map(|_| ()),
                };
                if result.is_ok() {
                    prop_assert!(
                        is_legal_edge(before, p.status),
                        "illegal edge {} -> {}",
                        before,
                        p.status
                    );
                } else {
                    prop_assert_eq!(before, p.status, "failed transition mutated status");
                }
            }
            // The transition log must itself trace a path through the graph.
            for record in &p.transitions {
                prop_assert!(is_legal_edge(record.from_status, record.to_status));
            }
        }
    }
}
