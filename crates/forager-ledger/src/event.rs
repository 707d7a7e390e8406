//! Ledger event construction

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use forager_core::{canonical, hash_without_field, RunStatus};

/// What a ledger event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventType {
    RunCompleted,
    RunNotComputable,
}

impl From<RunStatus> for LedgerEventType {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Ok => Self::RunCompleted,
            RunStatus::NotComputable => Self::RunNotComputable,
        }
    }
}

impl std::fmt::Display for LedgerEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RunCompleted => write!(f, "run_completed"),
            Self::RunNotComputable => write!(f, "run_not_computable"),
        }
    }
}

/// One link in the hash chain. Appended once, never mutated or deleted.
///
/// `event_id` is derived from the run id, the previous event's hash, and a
/// digest of the payload; `event_hash` covers every field but itself. Both
/// are recomputable by anyone holding the event, which is what makes the
/// chain auditable without trusting the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub event_id: String,
    pub event_type: LedgerEventType,
    pub run_id: String,
    /// None only for the first event in a chain.
    pub prev_hash: Option<String>,
    pub payload: Value,
    pub event_hash: String,
}

impl LedgerEvent {
    /// Build a fully sealed event linking to `prev_hash`.
    pub fn new(
        event_type: LedgerEventType,
        run_id: impl Into<String>,
        prev_hash: Option<String>,
        payload: Value,
    ) -> Self {
        let run_id = run_id.into();
        let payload_hash = canonical::digest(&payload);
        let event = Self {
            event_id: derive_event_id(&run_id, prev_hash.as_deref(), &payload_hash),
            event_type,
            run_id,
            prev_hash,
            payload,
            event_hash: String::new(),
        };
        let event_hash = event.content_hash();
        Self { event_hash, ..event }
    }

    /// Digest of the event content, excluding `event_hash` itself.
    pub fn content_hash(&self) -> String {
        hash_without_field(self, "event_hash")
    }

    /// Re-derive the event id from the event's own fields.
    pub fn expected_event_id(&self) -> String {
        let payload_hash = canonical::digest(&self.payload);
        derive_event_id(&self.run_id, self.prev_hash.as_deref(), &payload_hash)
    }
}

fn derive_event_id(run_id: &str, prev_hash: Option<&str>, payload_hash: &str) -> String {
    canonical::digest(&json!({
        "run_id": run_id,
        "prev_hash": prev_hash,
        "payload_hash": payload_hash,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_is_sealed_on_construction() {
        let event = LedgerEvent::new(
            LedgerEventType::RunCompleted,
            "run-1",
            None,
            json!({"result_hash": "abc"}),
        );
        assert_eq!(event.event_hash, event.content_hash());
        assert_eq!(event.event_id, event.expected_event_id());
        assert!(event.prev_hash.is_none());
    }

    #[test]
    fn test_event_id_depends_on_prev_hash() {
        let payload = json!({"result_hash": "abc"});
        let first = LedgerEvent::new(
            LedgerEventType::RunCompleted,
            "run-1",
            None,
            payload.clone(),
        );
        let second = LedgerEvent::new(
            LedgerEventType::RunCompleted,
            "run-1",
            Some(first.event_hash.clone()),
            payload,
        );
        assert_ne!(first.event_id, second.event_id);
        assert_ne!(first.event_hash, second.event_hash);
    }

    #[test]
    fn test_event_type_from_status() {
        assert_eq!(
            LedgerEventType::from(RunStatus::Ok),
            LedgerEventType::RunCompleted
        );
        assert_eq!(
            LedgerEventType::from(RunStatus::NotComputable),
            LedgerEventType::RunNotComputable
        );
    }
}
