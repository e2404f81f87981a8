//! # Inbound Ports
//!
//! API exposed to the builder and the signing coordinator.

use crate::domain::ContractError;
use crate::engine::ContractEngine;
use shared_types::Proposal;

/// Verifies proposals against the contract rules.
///
/// Implementations must be pure: the same proposal always yields the same
/// result, on every node.
pub trait ContractVerifier: Send + Sync {
    /// `Ok(())` when the proposal is a legal transition.
    fn verify(&self, proposal: &Proposal) -> Result<(), ContractError>;
}

impl ContractVerifier for ContractEngine {
    fn verify(&self, proposal: &Proposal) -> Result<(), ContractError> {
        ContractEngine::verify(self, proposal)
    }
}
