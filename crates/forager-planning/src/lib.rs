//! # forager-planning
//!
//! Run planning for the Forager kernel.
//!
//! Converts an unordered, dependency-annotated step list into one canonical
//! linear order. The same step set always plans to the same order no matter
//! how the request listed it; the result hash depends on that.

mod planner;

pub use planner::{build_plan, PlanError};
