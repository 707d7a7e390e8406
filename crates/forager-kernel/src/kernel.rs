//! The orchestration kernel
//!
//! A strict-order state machine: validate -> resolve policy -> gate
//! capabilities -> check inputs -> plan -> execute -> finalize. Any stage
//! before execution can short-circuit the run into a `not_computable`
//! result with a specific reason code; nothing after the adapter call can
//! fail the run. Every path, success or failure, ends in a sealed
//! RunResult, a ProvenanceRecord, and a ledger append: failed runs are
//! audited exactly like successful ones.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use forager_core::{
    canonical, CapabilityDecision, ProvenanceRecord, ReasonCode, RunPlan, RunRequest, RunResult,
    RunStatus,
};
use forager_ledger::{Ledger, LedgerError, LedgerEvent};
use forager_planning::build_plan;

use crate::adapter::{ExecutionAdapter, PolicyRegistry};

/// Everything one `run()` call produces.
///
/// `run_plan` and `capability_decision` are None whenever the run
/// short-circuited before the corresponding stage.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_result: RunResult,
    pub provenance_record: ProvenanceRecord,
    pub ledger_event: LedgerEvent,
    pub run_plan: Option<RunPlan>,
    pub capability_decision: Option<CapabilityDecision>,
}

/// The orchestration kernel. Collaborators are injected at construction;
/// the kernel is the only component that writes to the ledger.
pub struct Kernel {
    adapter: Box<dyn ExecutionAdapter>,
    registry: Box<dyn PolicyRegistry>,
    ledger: Arc<Ledger>,
}

impl Kernel {
    pub fn new(
        adapter: Box<dyn ExecutionAdapter>,
        registry: Box<dyn PolicyRegistry>,
        ledger: Arc<Ledger>,
    ) -> Self {
        Self {
            adapter,
            registry,
            ledger,
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Execute one run request to a terminal state.
    ///
    /// Never returns a run-level error: failures become `not_computable`
    /// results. The only `Err` is a broken ledger-append invariant, which
    /// must propagate because absorbing it would corrupt the audit trail.
    pub fn run(&self, request: &RunRequest) -> Result<RunOutcome, LedgerError> {
        info!(run_id = %request.run_id, "run started");
        let input_hash = canonical::digest(&Value::Object(request.inputs.clone()));

        // Stage 1: validate request structure.
        let errors = validate_request(request);
        if !errors.is_empty() {
            warn!(run_id = %request.run_id, errors = errors.len(), "request failed validation");
            let result = RunResult {
                reason_code: ReasonCode::InvalidRequest,
                errors,
                ..not_computable(request, input_hash)
            }
            .seal();
            return self.finalize(result, None, None);
        }

        // Stage 2: resolve the policy snapshot. Inline wins; the registry
        // is consulted only when the request carries an id instead.
        let policy = match &request.policy_snapshot {
            Some(snapshot) => Some(snapshot.clone()),
            None => request
                .policy_snapshot_id
                .as_deref()
                .and_then(|id| self.registry.get_policy_snapshot(id)),
        };
        let Some(policy) = policy else {
            warn!(run_id = %request.run_id, "no policy snapshot available");
            let result = RunResult {
                reason_code: ReasonCode::MissingInput,
                missing_inputs: vec!["policy_snapshot".to_string()],
                ..not_computable(request, input_hash)
            }
            .seal();
            return self.finalize(result, None, None);
        };
        let policy_hash = canonical::digest(&serde_json::to_value(&policy).unwrap_or(Value::Null));
        debug!(run_id = %request.run_id, policy_id = %policy.policy_id, "policy resolved");

        // Stage 3: gate requested capabilities.
        let decision = forager_policy::evaluate(&policy, &request.requested_capabilities);
        let capability_hash =
            canonical::digest(&serde_json::to_value(&decision).unwrap_or(Value::Null));
        if !decision.allowed {
            warn!(
                run_id = %request.run_id,
                denied = decision.denied.len(),
                "capabilities denied"
            );
            let result = RunResult {
                reason_code: decision.reason_code,
                denied_capabilities: decision.denied.clone(),
                policy_hash: Some(policy_hash),
                capability_hash: Some(capability_hash),
                ..not_computable(request, input_hash)
            }
            .seal();
            return self.finalize(result, None, Some(decision));
        }

        // Stage 4: every required input must exist and be non-null.
        let missing_inputs = missing_required_inputs(request);
        if !missing_inputs.is_empty() {
            warn!(run_id = %request.run_id, missing = missing_inputs.len(), "required inputs absent");
            let result = RunResult {
                reason_code: ReasonCode::MissingInput,
                missing_inputs,
                policy_hash: Some(policy_hash),
                capability_hash: Some(capability_hash),
                ..not_computable(request, input_hash)
            }
            .seal();
            return self.finalize(result, None, Some(decision));
        }

        // Stage 5: build the canonical plan.
        let plan = match build_plan(&request.steps) {
            Ok(plan) => plan,
            Err(plan_error) => {
                warn!(run_id = %request.run_id, error = %plan_error, "planning failed");
                let result = RunResult {
                    reason_code: ReasonCode::PlanInvalid,
                    errors: vec![plan_error.to_string()],
                    policy_hash: Some(policy_hash),
                    capability_hash: Some(capability_hash),
                    ..not_computable(request, input_hash)
                }
                .seal();
                return self.finalize(result, None, Some(decision));
            }
        };
        let plan_hash = plan.plan_hash();
        debug!(run_id = %request.run_id, steps = plan.ordered_step_ids.len(), "plan built");

        // Stage 6: delegate to the execution adapter. Outputs come back
        // verbatim; nothing past this point can fail the run.
        let report = self.adapter.execute(&plan, &request.inputs);

        // Stage 7: finalize.
        let result = RunResult {
            status: RunStatus::Ok,
            reason_code: ReasonCode::Ok,
            outputs: report.outputs,
            step_results: report.step_results,
            plan_hash: Some(plan_hash),
            policy_hash: Some(policy_hash),
            capability_hash: Some(capability_hash),
            ..not_computable(request, input_hash)
        }
        .seal();
        self.finalize(result, Some(plan), Some(decision))
    }

    /// Seal provenance, chain a ledger event onto the current tail, and
    /// assemble the outcome. Shared by every terminal path.
    fn finalize(
        &self,
        result: RunResult,
        run_plan: Option<RunPlan>,
        capability_decision: Option<CapabilityDecision>,
    ) -> Result<RunOutcome, LedgerError> {
        let provenance_record = ProvenanceRecord::from_result(&result);
        let payload = serde_json::to_value(&provenance_record).unwrap_or(Value::Null);
        let ledger_event = LedgerEvent::new(
            result.status.into(),
            result.run_id.clone(),
            self.ledger.last_hash(),
            payload,
        );
        self.ledger.append(ledger_event.clone())?;
        info!(
            run_id = %result.run_id,
            status = %result.status,
            reason = %result.reason_code,
            "run finalized"
        );
        Ok(RunOutcome {
            run_result: result,
            provenance_record,
            ledger_event,
            run_plan,
            capability_decision,
        })
    }
}

/// Base `not_computable` result skeleton; stages override what they know.
fn not_computable(request: &RunRequest, input_hash: String) -> RunResult {
    RunResult {
        run_id: request.run_id.clone(),
        status: RunStatus::NotComputable,
        reason_code: ReasonCode::MissingInput,
        errors: Vec::new(),
        missing_inputs: Vec::new(),
        denied_capabilities: Vec::new(),
        outputs: serde_json::Map::new(),
        step_results: Vec::new(),
        input_hash,
        plan_hash: None,
        policy_hash: None,
        capability_hash: None,
        result_hash: String::new(),
    }
}

/// Structural checks on the request itself. Step-graph problems (missing
/// or duplicate ids, bad dependencies, cycles) belong to the planner.
fn validate_request(request: &RunRequest) -> Vec<String> {
    let mut errors = Vec::new();
    if request.run_id.is_empty() {
        errors.push("run_id must not be empty".to_string());
    }
    for step in &request.steps {
        if step.action.is_empty() {
            errors.push(format!("step {:?} has no action", step.step_id));
        }
    }
    if request.required_inputs.iter().any(String::is_empty) {
        errors.push("required_inputs contains an empty key".to_string());
    }
    if request.requested_capabilities.iter().any(String::is_empty) {
        errors.push("requested_capabilities contains an empty id".to_string());
    }
    errors
}

/// Sorted list of required-input keys that are absent or null.
fn missing_required_inputs(request: &RunRequest) -> Vec<String> {
    let mut missing: Vec<String> = request
        .required_inputs
        .iter()
        .filter(|key| {
            matches!(request.inputs.get(key.as_str()), None | Some(Value::Null))
        })
        .cloned()
        .collect();
    missing.sort();
    missing.dedup();
    missing
}
