//! Core type definitions for the Forager run kernel
//!
//! A run flows through the kernel as a pure value: the request comes in,
//! derived artifacts (decision, plan, result, provenance) come out, and
//! none of them are mutated after creation. Inputs, outputs, and step
//! parameters stay opaque `serde_json::Value` payloads; the kernel hashes
//! and forwards them but never interprets them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::canonical;

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    NotComputable,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::NotComputable => write!(f, "not_computable"),
        }
    }
}

/// Why a run ended the way it did.
///
/// The whole failure taxonomy lives here; nothing else crosses the kernel
/// boundary on a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    Ok,
    InvalidRequest,
    MissingInput,
    CapabilityDenied,
    PlanInvalid,
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::MissingInput => write!(f, "missing_input"),
            Self::CapabilityDenied => write!(f, "capability_denied"),
            Self::PlanInvalid => write!(f, "plan_invalid"),
        }
    }
}

/// One unit of work inside a run request.
///
/// The action label is opaque to the kernel. Dependencies must resolve to
/// step ids within the same request and the dependency relation must be
/// acyclic; the planner enforces both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub step_id: String,
    pub action: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl Step {
    pub fn new(step_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            action: action.into(),
            depends_on: Vec::new(),
            parameters: None,
        }
    }

    pub fn with_depends_on(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// A single capability entry in a policy snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityGrant {
    pub capability: String,
    pub granted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CapabilityGrant {
    pub fn new(capability: impl Into<String>, granted: bool) -> Self {
        Self {
            capability: capability.into(),
            granted,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Immutable capability policy in force for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub policy_id: String,
    pub issued_at: DateTime<Utc>,
    #[serde(default)]
    pub grants: Vec<CapabilityGrant>,
}

impl PolicySnapshot {
    pub fn new(policy_id: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            policy_id: policy_id.into(),
            issued_at,
            grants: Vec::new(),
        }
    }

    pub fn with_grants(mut self, grants: Vec<CapabilityGrant>) -> Self {
        self.grants = grants;
        self
    }
}

/// Outcome of gating requested capabilities against a policy.
///
/// Computed once by the capability gate, never mutated. Both lists are
/// sorted so the decision hashes deterministically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDecision {
    pub allowed: bool,
    pub reason_code: ReasonCode,
    pub granted: Vec<String>,
    pub denied: Vec<String>,
}

/// A declarative run submission. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub run_id: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub required_inputs: Vec<String>,
    #[serde(default)]
    pub requested_capabilities: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_snapshot: Option<PolicySnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_snapshot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl RunRequest {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            inputs: Map::new(),
            required_inputs: Vec::new(),
            requested_capabilities: Vec::new(),
            steps: Vec::new(),
            policy_snapshot: None,
            policy_snapshot_id: None,
            metadata: None,
        }
    }

    pub fn with_inputs(mut self, inputs: Map<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_required_inputs(mut self, keys: Vec<String>) -> Self {
        self.required_inputs = keys;
        self
    }

    pub fn with_requested_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.requested_capabilities = capabilities;
        self
    }

    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_policy_snapshot(mut self, snapshot: PolicySnapshot) -> Self {
        self.policy_snapshot = Some(snapshot);
        self
    }

    pub fn with_policy_snapshot_id(mut self, policy_id: impl Into<String>) -> Self {
        self.policy_snapshot_id = Some(policy_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Canonical, dependency-ordered execution plan derived from a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPlan {
    /// Steps normalized (dependencies sorted and deduplicated) and listed
    /// in schedule order.
    pub steps: Vec<Step>,
    pub ordered_step_ids: Vec<String>,
}

impl RunPlan {
    /// Content digest of the plan. Depends only on the normalized steps
    /// and their canonical order.
    pub fn plan_hash(&self) -> String {
        canonical::digest(&serde_json::to_value(self).unwrap_or(Value::Null))
    }
}

/// Per-step outcome reported by the execution adapter.
///
/// The status string is the adapter's vocabulary; the kernel copies it
/// through without interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub status: String,
}

/// Terminal artifact of one kernel run. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: String,
    pub status: RunStatus,
    pub reason_code: ReasonCode,
    /// Structural validation failures, populated on `invalid_request`.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Absent required-input keys, sorted, populated on `missing_input`.
    #[serde(default)]
    pub missing_inputs: Vec<String>,
    /// Requested-but-denied capability ids, sorted.
    #[serde(default)]
    pub denied_capabilities: Vec<String>,
    #[serde(default)]
    pub outputs: Map<String, Value>,
    #[serde(default)]
    pub step_results: Vec<StepResult>,
    pub input_hash: String,
    pub plan_hash: Option<String>,
    pub policy_hash: Option<String>,
    pub capability_hash: Option<String>,
    /// Digest over every field above, computed with this field excluded.
    pub result_hash: String,
}

impl RunResult {
    /// Digest of the result content, excluding `result_hash` itself.
    pub fn content_hash(&self) -> String {
        hash_without_field(self, "result_hash")
    }

    /// Recompute and store the self-referential hash.
    pub fn seal(mut self) -> Self {
        self.result_hash = self.content_hash();
        self
    }
}

/// Compact, independently hashed summary of a run's decision hashes.
///
/// Lets an auditor check the key decisions without holding the full result
/// payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub run_id: String,
    pub status: RunStatus,
    pub reason_code: ReasonCode,
    pub input_hash: String,
    pub plan_hash: Option<String>,
    pub policy_hash: Option<String>,
    pub capability_hash: Option<String>,
    pub result_hash: String,
    pub provenance_hash: String,
}

impl ProvenanceRecord {
    /// Build the provenance summary from a sealed result.
    pub fn from_result(result: &RunResult) -> Self {
        let record = Self {
            run_id: result.run_id.clone(),
            status: result.status,
            reason_code: result.reason_code,
            input_hash: result.input_hash.clone(),
            plan_hash: result.plan_hash.clone(),
            policy_hash: result.policy_hash.clone(),
            capability_hash: result.capability_hash.clone(),
            result_hash: result.result_hash.clone(),
            provenance_hash: String::new(),
        };
        let hash = record.content_hash();
        Self {
            provenance_hash: hash,
            ..record
        }
    }

    /// Digest of the record content, excluding `provenance_hash` itself.
    pub fn content_hash(&self) -> String {
        hash_without_field(self, "provenance_hash")
    }
}

/// Digest a serializable value with one named field removed.
///
/// Shared by every self-referentially hashed artifact: serialize, drop the
/// hash field, canonicalize, digest.
pub fn hash_without_field<T: Serialize>(artifact: &T, field: &str) -> String {
    let mut value = serde_json::to_value(artifact).unwrap_or(Value::Null);
    if let Value::Object(ref mut map) = value {
        map.remove(field);
    }
    canonical::digest(&value)
}
