//! Builder errors.

use ac_01_contract_engine::ContractError;
use thiserror::Error;

/// Why a draft could not be turned into a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The draft breaks a contract rule.
    #[error("Draft rejected locally: {0}")]
    Validation(#[from] ContractError),

    /// No command was supplied.
    #[error("A proposal needs at least one command")]
    NoCommands,
}
