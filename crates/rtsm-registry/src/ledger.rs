//! # Event Ledger
//!
//! Append-only record of lifecycle and shipment events, used for audit
//! trails and dashboards. Events carry a global monotonic sequence number,
//! so the per-participant ordering required of the history is implied by
//! the total order; recorded-at timestamps are clamped to never run
//! backwards even if the wall clock does.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use rtsm_core::{EventId, PackId, ParticipantId, Timestamp, Username};

/// The type of a recorded event, one per mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Participant created in `Enrolled`.
    Enrollment,
    /// Participant screen-failed.
    ScreenFailure,
    /// Participant randomized to a pack.
    Randomization,
    /// Participant completed treatment.
    TreatmentCompletion,
    /// Participant emergency-unblinded.
    CodeBreak,
    /// Consignment raised at the depot.
    ConsignmentRaised,
    /// Shipment arrival recorded at a site.
    ShipmentArrival,
}

impl EventType {
    /// The snake_case string identifier for this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enrollment => "enrollment",
            Self::ScreenFailure => "screen_failure",
            Self::Randomization => "randomization",
            Self::TreatmentCompletion => "treatment_completion",
            Self::CodeBreak => "code_break",
            Self::ConsignmentRaised => "consignment_raised",
            Self::ShipmentArrival => "shipment_arrival",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a ledger event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSubject {
    /// A participant lifecycle event.
    Participant(ParticipantId),
    /// A supply-chain event on a pack.
    Pack(PackId),
}

/// A single append-only history entry. Never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// Unique event identifier.
    pub event_id: EventId,
    /// Global monotonic sequence number.
    pub seq: u64,
    /// The record the event concerns.
    pub subject: EventSubject,
    /// The event type.
    pub event_type: EventType,
    /// Human-readable description.
    pub description: String,
    /// Structured payload; for a code break this is the full prior-state
    /// snapshot of the participant record.
    pub details: Option<serde_json::Value>,
    /// Actor who triggered the event.
    pub recorded_by: Username,
    /// When the event was recorded (monotonic per ledger).
    pub recorded_at: Timestamp,
}

#[derive(Debug, Default)]
struct LedgerInner {
    next_seq: u64,
    last_at: Option<Timestamp>,
    events: Vec<HistoryEvent>,
}

/// The append-only event ledger.
#[derive(Debug, Default)]
pub struct EventLedger {
    inner: Mutex<LedgerInner>,
}

impl EventLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event and return it.
    ///
    /// Assigns the next sequence number and a recorded-at timestamp that
    /// is clamped to be ≥ the previous event's.
    pub fn append(
        &self,
        subject: EventSubject,
        event_type: EventType,
        description: String,
        details: Option<serde_json::Value>,
        recorded_by: Username,
    ) -> HistoryEvent {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let now = Timestamp::now();
        let recorded_at = match inner.last_at {
            Some(last) if last > now => last,
            _ => now,
        };
        let event = HistoryEvent {
            event_id: EventId::new(),
            seq: inner.next_seq,
            subject,
            event_type,
            description,
            details,
            recorded_by,
            recorded_at,
        };
        inner.next_seq += 1;
        inner.last_at = Some(recorded_at);
        inner.events.push(event.clone());
        event
    }

    /// All events for one participant, in recorded order.
    pub fn for_participant(&self, id: &ParticipantId) -> Vec<HistoryEvent> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .events
            .iter()
            .filter(|e| matches!(&e.subject, EventSubject::Participant(p) if p == id))
            .cloned()
            .collect()
    }

    /// All events for one pack, in recorded order.
    pub fn for_pack(&self, id: &PackId) -> Vec<HistoryEvent> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .events
            .iter()
            .filter(|e| matches!(&e.subject, EventSubject::Pack(p) if p == id))
            .cloned()
            .collect()
    }

    /// The most recent `n` events, oldest first.
    pub fn recent(&self, n: usize) -> Vec<HistoryEvent> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let skip = inner.events.len().saturating_sub(n);
        inner.events[skip..].to_vec()
    }

    /// Total number of events recorded.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.events.len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Username {
        Username::new("inv_a").unwrap()
    }

    fn participant_subject(seq: u32) -> EventSubject {
        EventSubject::Participant(ParticipantId::from_sequence(seq))
    }

    #[test]
    fn test_append_assigns_dense_sequence() {
        let ledger = EventLedger::new();
        let a = ledger.append(
            participant_subject(1),
            EventType::Enrollment,
            "enrolled".to_string(),
            None,
            actor(),
        );
        let b = ledger.append(
            participant_subject(1),
            EventType::Randomization,
            "randomized".to_string(),
            None,
            actor(),
        );
        assert_eq!(a.seq, 0);
        assert_eq!(b.seq, 1);
        assert!(a.recorded_at <= b.recorded_at);
    }

    #[test]
    fn test_for_participant_filters_and_preserves_order() {
        let ledger = EventLedger::new();
        ledger.append(
            participant_subject(1),
            EventType::Enrollment,
            "enrolled".to_string(),
            None,
            actor(),
        );
        ledger.append(
            participant_subject(2),
            EventType::Enrollment,
            "enrolled".to_string(),
            None,
            actor(),
        );
        ledger.append(
            participant_subject(1),
            EventType::ScreenFailure,
            "screen failed".to_string(),
            None,
            actor(),
        );

        let events = ledger.for_participant(&ParticipantId::from_sequence(1));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::Enrollment);
        assert_eq!(events[1].event_type, EventType::ScreenFailure);
        assert!(events[0].seq < events[1].seq);
    }

    #[test]
    fn test_for_pack_filters() {
        let ledger = EventLedger::new();
        let pack = PackId::new("PK050").unwrap();
        ledger.append(
            EventSubject::Pack(pack.clone()),
            EventType::ConsignmentRaised,
            "raised".to_string(),
            None,
            Username::new("depot_ops").unwrap(),
        );
        ledger.append(
            participant_subject(1),
            EventType::Enrollment,
            "enrolled".to_string(),
            None,
            actor(),
        );
        assert_eq!(ledger.for_pack(&pack).len(), 1);
    }

    #[test]
    fn test_recent_returns_tail_oldest_first() {
        let ledger = EventLedger::new();
        for i in 1..=5 {
            ledger.append(
                participant_subject(i),
                EventType::Enrollment,
                format!("enrolled {i}"),
                None,
                actor(),
            );
        }
        let tail = ledger.recent(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].seq, 3);
        assert_eq!(tail[1].seq, 4);
    }

    #[test]
    fn test_timestamps_never_run_backwards() {
        let ledger = EventLedger::new();
        let mut last = None;
        for i in 0..10 {
            let e = ledger.append(
                participant_subject(i),
                EventType::Enrollment,
                "enrolled".to_string(),
                None,
                actor(),
            );
            if let Some(prev) = last {
                assert!(e.recorded_at >= prev);
            }
            last = Some(e.recorded_at);
        }
    }
}
