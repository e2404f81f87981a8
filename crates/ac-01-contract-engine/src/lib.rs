//! # AC-01 Contract Engine
//!
//! Decides whether a proposed ledger transition is legal.
//!
//! **Subsystem ID:** 1  
//! **Architecture:** Hexagonal (Domain + Ports)  
//! **Purity:** No I/O, no shared mutable state, no clock
//!
//! ## Algorithm
//!
//! 1. Resolve exactly one command; anything else is `AmbiguousCommand`.
//! 2. Look up the fixed, ordered rule list for that command kind.
//! 3. Evaluate rules in order. By default the first failure is returned;
//!    `VerificationMode::CollectAll` reports every failing rule instead.
//!
//! ## Rule Sets
//!
//! | Command | Rules |
//! |---------|-------|
//! | `Issue` | no inputs, one output, positive amount, paid within amount, lender ≠ borrower, signers = participants |
//! | `Transfer` | one input, one output, only lender changes, lender changes, signers = old ∪ new participants |
//! | `Settle` | one input, positive payment, payment currency, no overpayment, output shape, only paid changes, signers = participants |
//!
//! ## Example
//!
//! ```rust,ignore
//! use ac_01_contract_engine::{ContractEngine, ContractVerifier};
//!
//! let engine = ContractEngine::new();
//! engine.verify(&proposal)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod engine;
pub mod ports;

// Re-exports
pub use domain::{rules_for, ContractError, Rule, RuleKind, RuleViolation};
pub use engine::{ContractEngine, VerificationMode};
pub use ports::ContractVerifier;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
