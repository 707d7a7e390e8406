//! Invariance certification
//!
//! Runs the kernel repeatedly against one fixed request and checks that the
//! tracked artifact hashes never move. The kernel's entire value is
//! reproducibility, and the most dangerous regression is a silent source of
//! nondeterminism: a wall-clock read, unsorted iteration, random
//! tie-breaking, or a feature that reads prior ledger state and so varies
//! with invocation order. This harness is how that class of bug gets
//! caught before it ships.

use std::collections::BTreeMap;

use tracing::debug;

use forager_core::RunRequest;
use forager_ledger::LedgerError;

use crate::kernel::{Kernel, RunOutcome};

/// One artifact hash that failed to reproduce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashMismatch {
    pub run_index: usize,
    pub artifact: String,
    pub expected: String,
    pub actual: String,
}

/// Result of an invariance certification.
#[derive(Debug, Clone)]
pub struct InvarianceReport {
    pub runs_required: usize,
    pub runs_completed: usize,
    /// Artifact hashes from the first run; every later run must match.
    pub baseline: BTreeMap<String, String>,
    pub mismatches: Vec<HashMismatch>,
}

impl InvarianceReport {
    pub fn passed(&self) -> bool {
        self.runs_completed == self.runs_required && self.mismatches.is_empty()
    }
}

impl std::fmt::Display for InvarianceReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.passed() {
            writeln!(
                f,
                "invariance: PASS ({} runs, {} artifacts)",
                self.runs_completed,
                self.baseline.len()
            )?;
        } else {
            writeln!(
                f,
                "invariance: FAIL ({}/{} runs, {} mismatches)",
                self.runs_completed,
                self.runs_required,
                self.mismatches.len()
            )?;
        }
        for m in &self.mismatches {
            writeln!(
                f,
                "  run {}: {} expected {} got {}",
                m.run_index, m.artifact, m.expected, m.actual
            )?;
        }
        Ok(())
    }
}

/// Repeated-execution harness over a fixed request.
#[derive(Debug, Clone, Copy)]
pub struct InvarianceHarness {
    runs_required: usize,
}

impl Default for InvarianceHarness {
    fn default() -> Self {
        Self { runs_required: 12 }
    }
}

impl InvarianceHarness {
    pub fn new(runs_required: usize) -> Self {
        Self { runs_required }
    }

    /// Run a freshly built kernel `runs_required` times against `request`
    /// and compare every tracked artifact hash against the first run.
    ///
    /// The builder must hand back a kernel over a fresh ledger each time:
    /// ledger events chain on the tail hash, so a shared ledger would make
    /// every event hash differ by construction rather than by defect.
    pub fn certify<F>(
        &self,
        mut build_kernel: F,
        request: &RunRequest,
    ) -> Result<InvarianceReport, LedgerError>
    where
        F: FnMut() -> Kernel,
    {
        let mut baseline: BTreeMap<String, String> = BTreeMap::new();
        let mut mismatches = Vec::new();
        let mut runs_completed = 0;

        for run_index in 0..self.runs_required {
            let kernel = build_kernel();
            let outcome = kernel.run(request)?;
            let hashes = artifact_hashes(&outcome);
            runs_completed += 1;
            debug!(run_index, artifacts = hashes.len(), "invariance run complete");

            if run_index == 0 {
                baseline = hashes;
                continue;
            }
            for (artifact, expected) in &baseline {
                let actual = hashes.get(artifact).cloned().unwrap_or_default();
                if actual != *expected {
                    mismatches.push(HashMismatch {
                        run_index,
                        artifact: artifact.clone(),
                        expected: expected.clone(),
                        actual,
                    });
                }
            }
            for (artifact, actual) in &hashes {
                if !baseline.contains_key(artifact) {
                    mismatches.push(HashMismatch {
                        run_index,
                        artifact: artifact.clone(),
                        expected: String::new(),
                        actual: actual.clone(),
                    });
                }
            }
        }

        Ok(InvarianceReport {
            runs_required: self.runs_required,
            runs_completed,
            baseline,
            mismatches,
        })
    }
}

/// The named hashes a certification tracks.
fn artifact_hashes(outcome: &RunOutcome) -> BTreeMap<String, String> {
    let mut hashes = BTreeMap::new();
    hashes.insert(
        "result_hash".to_string(),
        outcome.run_result.result_hash.clone(),
    );
    hashes.insert(
        "provenance_hash".to_string(),
        outcome.provenance_record.provenance_hash.clone(),
    );
    hashes.insert(
        "ledger_event_hash".to_string(),
        outcome.ledger_event.event_hash.clone(),
    );
    if let Some(plan) = &outcome.run_plan {
        hashes.insert("plan_hash".to_string(), plan.plan_hash());
        hashes.insert(
            "ordered_step_ids".to_string(),
            plan.ordered_step_ids.join(","),
        );
    }
    hashes
}
