//! # Contract Engine
//!
//! Pure evaluation of the rule tables against a proposal.

use crate::domain::{rules_for, ContractError, RuleViolation};
use shared_types::{Command, Proposal};

/// How many failures a verification reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerificationMode {
    /// Stop at the first failing rule.
    #[default]
    ShortCircuit,
    /// Evaluate every rule and report all failures.
    CollectAll,
}

/// Deterministic IOU contract verifier.
///
/// Holds no state besides its mode, so one instance can be shared freely
/// between initiator and responder paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContractEngine {
    mode: VerificationMode,
}

impl ContractEngine {
    /// Engine in short-circuit mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine in the given mode.
    pub fn with_mode(mode: VerificationMode) -> Self {
        Self { mode }
    }

    /// Current mode.
    pub fn mode(&self) -> VerificationMode {
        self.mode
    }

    /// Accept or reject a proposal.
    pub fn verify(&self, proposal: &Proposal) -> Result<(), ContractError> {
        let command = single_command(proposal)?;
        match self.mode {
            VerificationMode::ShortCircuit => {
                match first_violation(proposal, command) {
                    Some(violation) => Err(violation.into_error()),
                    None => Ok(()),
                }
            }
            VerificationMode::CollectAll => {
                let violations = self.diagnose_command(proposal, command);
                if violations.is_empty() {
                    Ok(())
                } else {
                    Err(ContractError::Violations(violations))
                }
            }
        }
    }

    /// Every failing rule regardless of mode.
    ///
    /// Returns `AmbiguousCommand` when the command cannot be resolved.
    pub fn diagnose(&self, proposal: &Proposal) -> Result<Vec<RuleViolation>, ContractError> {
        let command = single_command(proposal)?;
        Ok(self.diagnose_command(proposal, command))
    }

    fn diagnose_command(&self, proposal: &Proposal, command: &Command) -> Vec<RuleViolation> {
        let name = command.kind.name();
        rules_for(&command.kind)
            .iter()
            .filter(|rule| !(rule.check)(proposal, command))
            .map(|rule| RuleViolation {
                command: name,
                rule: rule.description,
                kind: rule.kind,
            })
            .collect()
    }
}

fn single_command(proposal: &Proposal) -> Result<&Command, ContractError> {
    match proposal.commands.as_slice() {
        [only] => Ok(only),
        other => Err(ContractError::AmbiguousCommand { found: other.len() }),
    }
}

fn first_violation(proposal: &Proposal, command: &Command) -> Option<RuleViolation> {
    rules_for(&command.kind)
        .iter()
        .find(|rule| !(rule.check)(proposal, command))
        .map(|rule| RuleViolation {
            command: command.kind.name(),
            rule: rule.description,
            kind: rule.kind,
        })
}
