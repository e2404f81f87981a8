//! # Error Types
//!
//! Errors raised by the value types themselves. Contract and protocol errors
//! live in the crates that own those concerns.

use crate::entities::PartyKey;
use thiserror::Error;

/// Errors from amount arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Amounts in different currencies cannot be combined.
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },

    /// Quantity arithmetic overflowed.
    #[error("Amount arithmetic overflow")]
    Overflow,
}

/// Errors from accumulating endorsements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndorsementError {
    /// The signer is not in the proposal's required signer set.
    #[error("Party {0} is not a required signer")]
    NotARequiredSigner(PartyKey),

    /// All required signatures are already present.
    #[error("Proposal is already fully endorsed")]
    AlreadyFullyEndorsed,
}
