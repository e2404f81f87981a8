//! # Domain Module
//!
//! Rule definitions and the contract error taxonomy.

pub mod errors;
pub mod rules;

pub use errors::*;
pub use rules::{rules_for, Rule, RuleKind};
