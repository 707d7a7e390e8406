//! Append-only ledger and independent chain verification

use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use crate::event::LedgerEvent;

/// Ledger failures. Both variants are fatal consistency errors: continuing
/// past either would corrupt the audit trail, so they propagate rather than
/// fold into a run result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger chain mismatch: append expected prev_hash {expected:?}, event carries {found:?}")]
    ChainMismatch {
        expected: Option<String>,
        found: Option<String>,
    },

    #[error("ledger lock poisoned")]
    Poisoned,
}

/// In-process, append-only, hash-chained event sequence.
///
/// Appends are serialized through a mutex because each one reads and
/// extends the tail hash; a lost update would silently corrupt the chain.
/// The lock covers only the append or read itself, never any caller work.
#[derive(Debug, Default)]
pub struct Ledger {
    events: Mutex<Vec<LedgerEvent>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event whose `prev_hash` must match the current tail.
    ///
    /// A mismatch means the event was built against a stale snapshot of the
    /// chain (e.g. a concurrent append won the race) and is rejected as a
    /// fatal consistency error.
    pub fn append(&self, event: LedgerEvent) -> Result<(), LedgerError> {
        let mut events = self.events.lock().map_err(|_| LedgerError::Poisoned)?;
        let expected = events.last().map(|tail| tail.event_hash.clone());
        if event.prev_hash != expected {
            return Err(LedgerError::ChainMismatch {
                expected,
                found: event.prev_hash.clone(),
            });
        }
        debug!(event_id = %event.event_id, run_id = %event.run_id, "ledger append");
        events.push(event);
        Ok(())
    }

    /// Hash of the current tail event, if any.
    pub fn last_hash(&self) -> Option<String> {
        self.events
            .lock()
            .ok()
            .and_then(|events| events.last().map(|tail| tail.event_hash.clone()))
    }

    /// Snapshot of the full event sequence in insertion order.
    pub fn read_all(&self) -> Vec<LedgerEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Independently re-verify a chain without trusting the store.
///
/// Checks, for every event, that its `prev_hash` matches its predecessor's
/// `event_hash`, that its `event_hash` matches a recomputation over its own
/// content, and that its `event_id` re-derives from its fields. The first
/// event's `prev_hash` is unconstrained so a chain segment can be verified
/// on its own; any mutation of it still trips the `event_hash` check.
pub fn validate_chain(events: &[LedgerEvent]) -> bool {
    for (index, event) in events.iter().enumerate() {
        if index > 0 {
            let prev = &events[index - 1];
            if event.prev_hash.as_deref() != Some(prev.event_hash.as_str()) {
                return false;
            }
        }
        if event.event_hash != event.content_hash() {
            return false;
        }
        if event.event_id != event.expected_event_id() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LedgerEventType;
    use serde_json::json;

    fn chained(ledger: &Ledger, run_id: &str) -> LedgerEvent {
        LedgerEvent::new(
            LedgerEventType::RunCompleted,
            run_id,
            ledger.last_hash(),
            json!({"run": run_id}),
        )
    }

    #[test]
    fn test_appends_link_to_tail() {
        let ledger = Ledger::new();
        for run in ["run-1", "run-2", "run-3"] {
            ledger.append(chained(&ledger, run)).unwrap();
        }

        let events = ledger.read_all();
        assert_eq!(events.len(), 3);
        assert!(events[0].prev_hash.is_none());
        for i in 1..events.len() {
            assert_eq!(
                events[i].prev_hash.as_deref(),
                Some(events[i - 1].event_hash.as_str())
            );
        }
        assert_eq!(ledger.last_hash(), Some(events[2].event_hash.clone()));
    }

    #[test]
    fn test_stale_prev_hash_is_fatal() {
        let ledger = Ledger::new();
        ledger.append(chained(&ledger, "run-1")).unwrap();

        // Built against the empty chain, appended after run-1: stale.
        let stale = LedgerEvent::new(
            LedgerEventType::RunCompleted,
            "run-2",
            None,
            json!({"run": "run-2"}),
        );
        let err = ledger.append(stale).unwrap_err();
        assert!(matches!(err, LedgerError::ChainMismatch { .. }));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_validate_chain_accepts_intact_chain() {
        let ledger = Ledger::new();
        for run in ["run-1", "run-2", "run-3"] {
            ledger.append(chained(&ledger, run)).unwrap();
        }
        assert!(validate_chain(&ledger.read_all()));
    }

    #[test]
    fn test_validate_chain_accepts_empty_chain() {
        assert!(validate_chain(&[]));
    }

    #[test]
    fn test_tampered_payload_detected() {
        let ledger = Ledger::new();
        ledger.append(chained(&ledger, "run-1")).unwrap();
        ledger.append(chained(&ledger, "run-2")).unwrap();

        let mut events = ledger.read_all();
        events[0].payload = json!({"run": "forged"});
        assert!(!validate_chain(&events));
    }

    #[test]
    fn test_tampered_run_id_detected() {
        let ledger = Ledger::new();
        ledger.append(chained(&ledger, "run-1")).unwrap();

        let mut events = ledger.read_all();
        events[0].run_id = "forged".to_string();
        assert!(!validate_chain(&events));
    }

    #[test]
    fn test_tampered_event_type_detected() {
        let ledger = Ledger::new();
        ledger.append(chained(&ledger, "run-1")).unwrap();

        let mut events = ledger.read_all();
        events[0].event_type = LedgerEventType::RunNotComputable;
        assert!(!validate_chain(&events));
    }

    #[test]
    fn test_relinked_event_hash_detected() {
        // Recompute the hash after tampering so the self-hash check passes;
        // the broken prev link must still be caught.
        let ledger = Ledger::new();
        ledger.append(chained(&ledger, "run-1")).unwrap();
        ledger.append(chained(&ledger, "run-2")).unwrap();

        let mut events = ledger.read_all();
        events[0].payload = json!({"run": "forged"});
        events[0].event_id = events[0].expected_event_id();
        events[0].event_hash = events[0].content_hash();
        assert!(!validate_chain(&events));
    }

    #[test]
    fn test_reordered_events_detected() {
        let ledger = Ledger::new();
        for run in ["run-1", "run-2", "run-3"] {
            ledger.append(chained(&ledger, run)).unwrap();
        }
        let mut events = ledger.read_all();
        events.swap(1, 2);
        assert!(!validate_chain(&events));
    }
}
