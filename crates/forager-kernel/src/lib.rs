//! # forager-kernel
//!
//! The deterministic orchestration kernel for Forager runs.
//!
//! This crate provides:
//! - The `Kernel` state machine sequencing validate, policy resolution,
//!   capability gating, input checks, planning, execution, and finalization
//! - Collaborator traits (`ExecutionAdapter`, `PolicyRegistry`) with null
//!   implementations for tests and dry runs
//! - The invariance harness that certifies the absence of hidden
//!   nondeterminism
//!
//! Every run terminates in exactly one of two states, `ok` or
//! `not_computable`, and every run leaves one hash-chained ledger event
//! behind, whichever state it reached.

mod adapter;
mod invariance;
mod kernel;

pub use adapter::{
    ExecutionAdapter, ExecutionReport, InMemoryPolicyRegistry, NullAdapter, PolicyRegistry,
};
pub use invariance::{HashMismatch, InvarianceHarness, InvarianceReport};
pub use kernel::{Kernel, RunOutcome};
