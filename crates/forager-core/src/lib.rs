//! # forager-core
//!
//! Core types for the Forager deterministic run kernel.
//!
//! A run is a pure value all the way through: the same request against the
//! same policy always produces the same plan, the same result hash, and the
//! same ledger event. Everything in this crate serves that guarantee:
//! canonical hashing so structurally equal values digest identically, and
//! immutable artifact types that are computed once and never touched again.

pub mod canonical;
mod config;
mod error;
mod types;

pub use config::ForagerConfig;
pub use error::{ForagerError, Result};
pub use types::*;
