//! Deterministic topological planning over step dependency graphs

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use forager_core::{RunPlan, Step};
use thiserror::Error;

/// Why a step list could not be planned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("step at index {index} has no step_id")]
    MissingStepId { index: usize },

    #[error("duplicate step_id: {0}")]
    DuplicateStepId(String),

    #[error("step {step_id} depends on unknown step {dependency}")]
    UnknownDependency { step_id: String, dependency: String },

    #[error("dependency cycle among steps: {}", unscheduled.join(", "))]
    Cycle { unscheduled: Vec<String> },
}

/// Build the canonical execution plan for a step list.
///
/// Dependencies are normalized (sorted, deduplicated), then the steps are
/// topologically sorted with a min-heap keyed on step id: among all ready
/// steps, the lexicographically smallest schedules next. The resulting
/// order is a function of the step set alone, independent of submission
/// order.
///
/// If the sort drains before every step is scheduled, the remaining steps
/// form at least one cycle and planning fails with the sorted remainder;
/// a plan is never silently truncated.
pub fn build_plan(steps: &[Step]) -> Result<RunPlan, PlanError> {
    for (index, step) in steps.iter().enumerate() {
        if step.step_id.is_empty() {
            return Err(PlanError::MissingStepId { index });
        }
    }

    let mut normalized: BTreeMap<String, Step> = BTreeMap::new();
    for step in steps {
        if normalized.contains_key(&step.step_id) {
            return Err(PlanError::DuplicateStepId(step.step_id.clone()));
        }
        let mut step = step.clone();
        let deps: BTreeSet<String> = step.depends_on.drain(..).collect();
        step.depends_on = deps.into_iter().collect();
        normalized.insert(step.step_id.clone(), step);
    }

    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    for step in normalized.values() {
        in_degree.insert(step.step_id.as_str(), step.depends_on.len());
        for dependency in &step.depends_on {
            if !normalized.contains_key(dependency) {
                return Err(PlanError::UnknownDependency {
                    step_id: step.step_id.clone(),
                    dependency: dependency.clone(),
                });
            }
            dependents
                .entry(dependency.as_str())
                .or_default()
                .push(step.step_id.as_str());
        }
    }

    let mut ready: BinaryHeap<Reverse<&str>> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| Reverse(*id))
        .collect();

    let mut ordered_step_ids: Vec<String> = Vec::with_capacity(normalized.len());
    while let Some(Reverse(step_id)) = ready.pop() {
        ordered_step_ids.push(step_id.to_string());
        for dependent in dependents.get(step_id).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(*dependent));
                }
            }
        }
    }

    if ordered_step_ids.len() < normalized.len() {
        let scheduled: BTreeSet<&str> = ordered_step_ids.iter().map(String::as_str).collect();
        let unscheduled = normalized
            .keys()
            .filter(|id| !scheduled.contains(id.as_str()))
            .cloned()
            .collect();
        return Err(PlanError::Cycle { unscheduled });
    }

    let steps = ordered_step_ids
        .iter()
        .filter_map(|id| normalized.get(id).cloned())
        .collect();

    Ok(RunPlan {
        steps,
        ordered_step_ids,
    })
}
