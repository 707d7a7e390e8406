//! Collaborator interfaces: execution adapter and policy registry
//!
//! The kernel never discovers collaborators dynamically; it is constructed
//! with one implementation of each. The null implementations here are fully
//! valid kernels-of-record for tests and capability-denied dry runs.

use std::collections::BTreeMap;

use forager_core::{PolicySnapshot, RunPlan, StepResult};
use serde_json::{Map, Value};

/// What an execution adapter hands back after running a plan.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub outputs: Map<String, Value>,
    pub step_results: Vec<StepResult>,
}

/// Performs the actual work for an ordered plan.
///
/// The kernel makes no assumption about internals: outputs and step
/// statuses are copied into the run result verbatim. Timeout and
/// cancellation policy belong to the adapter. Adapter-internal failures are
/// the adapter's concern to report through step statuses; they cannot fail
/// the run.
pub trait ExecutionAdapter {
    fn execute(&self, plan: &RunPlan, inputs: &Map<String, Value>) -> ExecutionReport;
}

/// Adapter that performs no work: every step comes back `"skipped"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAdapter;

impl ExecutionAdapter for NullAdapter {
    fn execute(&self, plan: &RunPlan, _inputs: &Map<String, Value>) -> ExecutionReport {
        ExecutionReport {
            outputs: Map::new(),
            step_results: plan
                .ordered_step_ids
                .iter()
                .map(|step_id| StepResult {
                    step_id: step_id.clone(),
                    status: "skipped".to_string(),
                })
                .collect(),
        }
    }
}

/// Source of policy snapshots for requests that reference one by id.
pub trait PolicyRegistry {
    fn get_policy_snapshot(&self, policy_id: &str) -> Option<PolicySnapshot>;
}

/// Map-backed registry; empty by default.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPolicyRegistry {
    snapshots: BTreeMap<String, PolicySnapshot>,
}

impl InMemoryPolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, snapshot: PolicySnapshot) {
        self.snapshots.insert(snapshot.policy_id.clone(), snapshot);
    }

    pub fn with_snapshot(mut self, snapshot: PolicySnapshot) -> Self {
        self.insert(snapshot);
        self
    }
}

impl PolicyRegistry for InMemoryPolicyRegistry {
    fn get_policy_snapshot(&self, policy_id: &str) -> Option<PolicySnapshot> {
        self.snapshots.get(policy_id).cloned()
    }
}
