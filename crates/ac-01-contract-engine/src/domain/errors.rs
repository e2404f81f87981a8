//! # Domain Errors
//!
//! Error types for contract verification.

use super::rules::RuleKind;
use std::fmt;
use thiserror::Error;

/// One failing rule, as reported in collect-all mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    /// Command whose rule set was evaluated.
    pub command: &'static str,
    /// Human readable rule text.
    pub rule: &'static str,
    /// Category of the rule.
    pub kind: RuleKind,
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.command, self.rule)
    }
}

impl RuleViolation {
    /// Convert a single violation into the error reported in short-circuit mode.
    pub fn into_error(self) -> ContractError {
        match self.kind {
            RuleKind::SignerSet => ContractError::SignerSetMismatch {
                rule: self.rule.to_string(),
            },
            RuleKind::Structure => ContractError::Validation {
                rule: self.rule.to_string(),
            },
        }
    }
}

/// Contract verification errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// A structural or value rule failed.
    #[error("Contract verification failed: {rule}")]
    Validation {
        /// Violated rule text
        rule: String,
    },

    /// The proposal does not carry exactly one command.
    #[error("Ambiguous command: expected exactly one IOU command, found {found}")]
    AmbiguousCommand {
        /// Number of commands present
        found: usize,
    },

    /// The command's signers differ from the required participant keys.
    #[error("Signer set mismatch: {rule}")]
    SignerSetMismatch {
        /// Violated rule text
        rule: String,
    },

    /// Every failing rule, in evaluation order (collect-all mode).
    #[error("{} contract rules violated", .0.len())]
    Violations(Vec<RuleViolation>),
}

impl ContractError {
    /// Text of every violated rule carried by this error.
    pub fn violated_rules(&self) -> Vec<String> {
        match self {
            ContractError::Validation { rule } | ContractError::SignerSetMismatch { rule } => {
                vec![rule.clone()]
            }
            ContractError::AmbiguousCommand { .. } => vec![self.to_string()],
            ContractError::Violations(all) => all.iter().map(|v| v.rule.to_string()).collect(),
        }
    }
}
