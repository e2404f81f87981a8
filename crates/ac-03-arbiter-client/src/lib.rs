//! # AC-03 Arbiter Client
//!
//! Interface to the external uniqueness and finality service.
//!
//! **Subsystem ID:** 3  
//! **Architecture:** Hexagonal (Domain + Ports + Adapters)
//!
//! ## Contract
//!
//! | Outcome | When |
//! |---------|------|
//! | `Accepted(token)` | every input unconsumed, signatures complete, time window open |
//! | `Conflict` | an input was consumed by a different, previously accepted transaction |
//! | `InvalidSignatures` | a required signature is missing or does not verify |
//! | `MisalignedTime` | the arbiter clock is outside the proposal's time window |
//!
//! Submission is idempotent by transaction id: resubmitting an accepted
//! transaction returns the original token. Only [`ArbiterError`]s (transport
//! and timeout) are retried by [`notarize_with_retry`]; outcomes never are.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{FailureMode, FlakyArbiter, InMemoryArbiter};
pub use domain::{ArbiterError, NotarizationOutcome, RetryPolicy};
pub use ports::ArbiterClient;
pub use service::notarize_with_retry;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
