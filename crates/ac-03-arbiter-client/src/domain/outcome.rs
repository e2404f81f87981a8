//! Answers the arbiter can give.

use shared_types::{ArbiterToken, PartyKey, StateRef, TxId};
use std::collections::BTreeSet;

/// Verdict on a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotarizationOutcome {
    /// Committed. Every input is now consumed by this transaction.
    Accepted(ArbiterToken),
    /// An input was already consumed by another transaction. Never retried.
    Conflict {
        /// The transaction that consumed the input first.
        conflicting_tx_id: TxId,
        /// The contested input.
        state_ref: StateRef,
    },
    /// Required signatures are absent or invalid.
    InvalidSignatures {
        /// Keys whose signature is missing or did not verify.
        missing: BTreeSet<PartyKey>,
    },
    /// The arbiter's clock is outside the proposal's time window.
    MisalignedTime,
}

impl NotarizationOutcome {
    /// Whether the transaction was committed.
    pub fn is_accepted(&self) -> bool {
        matches!(self, NotarizationOutcome::Accepted(_))
    }
}
