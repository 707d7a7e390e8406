//! # forager-ledger
//!
//! Tamper-evident provenance ledger for the Forager run kernel.
//!
//! Events form a hash chain: each event embeds its predecessor's hash and a
//! hash of its own content, so undetected reordering or mutation is
//! computationally infeasible. The ledger is an in-process append-only
//! sequence; durable storage belongs to whoever exports it.

mod chain;
mod event;

pub use chain::{validate_chain, Ledger, LedgerError};
pub use event::{LedgerEvent, LedgerEventType};
