//! # Coordinator State Machine
//!
//! ```text
//! Built → LocallySigned → AwaitingEndorsements → FullyEndorsed → AwaitingArbiter → Finalized
//!   │           │                  │                   │                │
//!   └───────────┴──────────────────┴───────────────────┴────────────────┴──→ Aborted(reason)
//! ```
//!
//! `AwaitingEndorsements → LocallySigned` is the rewind taken when an
//! attempt is resumed mid-collection: the old sessions are gone and
//! endorsements are gathered again over fresh ones.

use super::errors::{ProtocolError, TimeoutStage};
use serde::{Deserialize, Serialize};
use shared_types::{FinalizedTransaction, PartyKey, TxId};
use std::collections::BTreeSet;
use std::fmt;

/// Why an attempt was abandoned. Persisted in checkpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    /// A counterparty refused to endorse.
    Rejected {
        /// Rejecting party
        remote_party: String,
        /// Reason given
        reason: String,
    },
    /// The arbiter reported a double spend.
    NotaryConflict {
        /// Winner of the race
        conflicting_tx_id: TxId,
    },
    /// The arbiter rejected signatures.
    InvalidSignatures {
        /// Offending keys
        missing: BTreeSet<PartyKey>,
    },
    /// The arbiter's clock was outside the time window.
    MisalignedTime,
    /// A deadline fired.
    Timeout {
        /// Where
        stage: TimeoutStage,
    },
    /// Anything else, kept as its message.
    Failed(String),
}

impl From<&ProtocolError> for AbortReason {
    fn from(error: &ProtocolError) -> Self {
        match error {
            ProtocolError::Rejected {
                remote_party,
                reason,
            } => AbortReason::Rejected {
                remote_party: remote_party.clone(),
                reason: reason.clone(),
            },
            ProtocolError::NotaryConflict { conflicting_tx_id } => AbortReason::NotaryConflict {
                conflicting_tx_id: *conflicting_tx_id,
            },
            ProtocolError::InvalidSignatures { missing } => AbortReason::InvalidSignatures {
                missing: missing.clone(),
            },
            ProtocolError::MisalignedTime => AbortReason::MisalignedTime,
            ProtocolError::Timeout { stage } => AbortReason::Timeout { stage: *stage },
            other => AbortReason::Failed(other.to_string()),
        }
    }
}

impl From<AbortReason> for ProtocolError {
    fn from(reason: AbortReason) -> Self {
        match reason {
            AbortReason::Rejected {
                remote_party,
                reason,
            } => ProtocolError::Rejected {
                remote_party,
                reason,
            },
            AbortReason::NotaryConflict { conflicting_tx_id } => {
                ProtocolError::NotaryConflict { conflicting_tx_id }
            }
            AbortReason::InvalidSignatures { missing } => {
                ProtocolError::InvalidSignatures { missing }
            }
            AbortReason::MisalignedTime => ProtocolError::MisalignedTime,
            AbortReason::Timeout { stage } => ProtocolError::Timeout { stage },
            AbortReason::Failed(message) => ProtocolError::Transport(message),
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ProtocolError::from(self.clone()))
    }
}

/// Initiator protocol state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinatorState {
    /// Proposal assembled and verified.
    #[default]
    Built,
    /// Own signature attached.
    LocallySigned,
    /// Proposal sent; waiting on counterparties.
    AwaitingEndorsements,
    /// Every required signature present.
    FullyEndorsed,
    /// Submitted to the arbiter.
    AwaitingArbiter,
    /// Committed and broadcast.
    Finalized,
    /// Abandoned; nothing was committed.
    Aborted(AbortReason),
}

impl CoordinatorState {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: &CoordinatorState) -> bool {
        use CoordinatorState::*;
        match (self, next) {
            (Built, LocallySigned) => true,
            (LocallySigned, AwaitingEndorsements) => true,
            (LocallySigned, FullyEndorsed) => true, // Sole signer
            (AwaitingEndorsements, FullyEndorsed) => true,
            (AwaitingEndorsements, LocallySigned) => true, // Resume rewind
            (FullyEndorsed, AwaitingArbiter) => true,
            (AwaitingArbiter, Finalized) => true,
            (from, Aborted(_)) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Aborted(_))
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Built => "Built",
            Self::LocallySigned => "LocallySigned",
            Self::AwaitingEndorsements => "AwaitingEndorsements",
            Self::FullyEndorsed => "FullyEndorsed",
            Self::AwaitingArbiter => "AwaitingArbiter",
            Self::Finalized => "Finalized",
            Self::Aborted(_) => "Aborted",
        }
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted(reason) => write!(f, "Aborted({})", reason),
            other => f.write_str(other.name()),
        }
    }
}

/// How a responder's part in one transaction ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponderOutcome {
    /// Endorsed and recorded the finalized transaction.
    Committed(Box<FinalizedTransaction>),
    /// Refused to endorse.
    Rejected {
        /// Reason sent to the initiator
        reason: String,
    },
    /// The initiator abandoned the attempt.
    Aborted {
        /// Reason from the abort notice
        reason: String,
    },
}
