//! # Protocol Errors
//!
//! Local validation failures are synchronous and never reach the network.
//! Remote rejection and endorsement timeout abort the whole attempt.
//! Only arbiter transport failures and arbiter timeouts are retryable.

use ac_01_contract_engine::ContractError;
use ac_03_arbiter_client::ArbiterError;
use serde::{Deserialize, Serialize};
use shared_types::{PartyKey, TxId};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Suspension point at which a deadline fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeoutStage {
    /// Waiting for counterparties' endorsements.
    Endorsement,
    /// Responder waiting for the finalized transaction.
    Finality,
    /// Waiting for the arbiter.
    Arbiter,
}

impl fmt::Display for TimeoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            TimeoutStage::Endorsement => "endorsement",
            TimeoutStage::Finality => "finality",
            TimeoutStage::Arbiter => "arbiter",
        };
        f.write_str(stage)
    }
}

/// Errors raised while coordinating a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The proposal broke a contract rule locally.
    #[error("Local validation failed: {0}")]
    Validation(#[from] ContractError),

    /// A counterparty refused to endorse.
    #[error("Rejected by {remote_party}: {reason}")]
    Rejected {
        /// Name of the rejecting party
        remote_party: String,
        /// Reason given, usually the violated rule
        reason: String,
    },

    /// An input was already consumed by another transaction.
    #[error("Notary conflict: input already consumed by {conflicting_tx_id}")]
    NotaryConflict {
        /// Transaction that consumed the input first
        conflicting_tx_id: TxId,
    },

    /// The arbiter found required signatures missing or invalid.
    #[error("Arbiter rejected signatures from {} signer(s)", .missing.len())]
    InvalidSignatures {
        /// Offending keys
        missing: BTreeSet<PartyKey>,
    },

    /// The arbiter's clock is outside the time window.
    #[error("Transaction time window does not contain the arbiter's time")]
    MisalignedTime,

    /// A deadline fired.
    #[error("Timed out at {stage} stage")]
    Timeout {
        /// Where the deadline fired
        stage: TimeoutStage,
    },

    /// Session transport failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The arbiter could not be reached within the retry budget.
    #[error("Arbiter unavailable: {0}")]
    ArbiterUnavailable(#[from] ArbiterError),

    /// This node, or a signature's author, is not a required signer.
    #[error("Party {0} is not a required signer")]
    NotARequiredSigner(PartyKey),

    /// A required signer has no well-known identity in the proposal.
    #[error("No party in the proposal owns key {0}")]
    UnknownSigner(PartyKey),

    /// Illegal state machine transition.
    #[error("Invalid coordinator transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// A message arrived that the protocol does not expect at this point.
    #[error("Unexpected {received} message from {from}")]
    UnexpectedMessage {
        /// Sender
        from: String,
        /// Message kind received
        received: &'static str,
    },

    /// Checkpoint persistence failed.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Local signing failed.
    #[error("Signing error: {0}")]
    Signing(String),
}

impl ProtocolError {
    /// Whether resubmitting the same transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProtocolError::ArbiterUnavailable(_)
                | ProtocolError::Timeout {
                    stage: TimeoutStage::Arbiter
                }
        )
    }

    /// Whether this error was raised before anything left the node.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ProtocolError::Validation(_)
                | ProtocolError::NotARequiredSigner(_)
                | ProtocolError::UnknownSigner(_)
                | ProtocolError::Signing(_)
        )
    }
}
