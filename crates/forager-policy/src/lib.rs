//! # forager-policy
//!
//! Capability gating for the Forager run kernel.
//!
//! The gate is a pure evaluation: requested capability ids go in against a
//! policy snapshot's grant list, a `CapabilityDecision` comes out. It never
//! errors; a malformed or empty policy simply denies everything.

mod gate;

pub use gate::evaluate;
