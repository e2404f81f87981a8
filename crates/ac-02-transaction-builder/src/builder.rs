//! # Transaction Builder
//!
//! Fluent assembly of proposals. The required-signer set is not stored
//! separately: it is always the union of the commands' signers, see
//! [`Proposal::required_signers`].

use crate::errors::BuildError;
use ac_01_contract_engine::ContractVerifier;
use shared_types::{Command, LedgerState, Party, Proposal, StateAndRef, TimeWindow};
use tracing::debug;
use uuid::Uuid;

/// Builder for [`Proposal`] values.
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    arbiter: Party,
    inputs: Vec<StateAndRef>,
    outputs: Vec<LedgerState>,
    commands: Vec<Command>,
    time_window: Option<TimeWindow>,
    salt: Option<[u8; 16]>,
}

impl TransactionBuilder {
    /// Start a draft notarised by `arbiter`.
    pub fn new(arbiter: Party) -> Self {
        Self {
            arbiter,
            inputs: Vec::new(),
            outputs: Vec::new(),
            commands: Vec::new(),
            time_window: None,
            salt: None,
        }
    }

    /// Add a command.
    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Consume a state.
    pub fn with_input(mut self, input: StateAndRef) -> Self {
        self.inputs.push(input);
        self
    }

    /// Create a state.
    pub fn with_output(mut self, output: LedgerState) -> Self {
        self.outputs.push(output);
        self
    }

    /// Restrict when the arbiter may accept the transaction.
    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    /// Use a fixed salt instead of a random one.
    pub fn with_salt(mut self, salt: [u8; 16]) -> Self {
        self.salt = Some(salt);
        self
    }

    /// Assemble and verify the draft.
    ///
    /// Fails synchronously with the violated rule when the contract rejects
    /// the draft.
    pub fn verify_and_build<V>(self, verifier: &V) -> Result<Proposal, BuildError>
    where
        V: ContractVerifier + ?Sized,
    {
        if self.commands.is_empty() {
            return Err(BuildError::NoCommands);
        }
        let proposal = self.build_unverified();
        verifier.verify(&proposal)?;
        debug!(
            tx_id = %proposal.id(),
            inputs = proposal.inputs.len(),
            outputs = proposal.outputs.len(),
            "Built proposal"
        );
        Ok(proposal)
    }

    /// Assemble without running the contract.
    ///
    /// Only for tooling that deliberately constructs malformed drafts.
    pub fn build_unverified(self) -> Proposal {
        Proposal {
            inputs: self.inputs,
            outputs: self.outputs,
            commands: self.commands,
            arbiter: self.arbiter,
            time_window: self.time_window,
            salt: self.salt.unwrap_or_else(|| Uuid::new_v4().into_bytes()),
        }
    }
}

/// One-shot form of [`TransactionBuilder`].
pub fn build<V>(
    command: Command,
    inputs: Vec<StateAndRef>,
    outputs: Vec<LedgerState>,
    arbiter: Party,
    verifier: &V,
) -> Result<Proposal, BuildError>
where
    V: ContractVerifier + ?Sized,
{
    let builder = inputs
        .into_iter()
        .fold(TransactionBuilder::new(arbiter), TransactionBuilder::with_input);
    outputs
        .into_iter()
        .fold(builder, TransactionBuilder::with_output)
        .with_command(command)
        .verify_and_build(verifier)
}
