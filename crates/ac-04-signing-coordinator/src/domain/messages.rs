//! Session messages exchanged between initiator and responders.

use super::checkpoint::FlowId;
use serde::{Deserialize, Serialize};
use shared_types::{FinalizedTransaction, Proposal, TransactionSignature, TxId};

/// Initiator → responder: please endorse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalMessage {
    /// Initiator's attempt.
    pub flow_id: FlowId,
    /// The proposal to endorse.
    pub proposal: Proposal,
    /// Initiator's own signature over the proposal id.
    pub initiator_signature: TransactionSignature,
}

/// Responder → initiator: endorsement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsementResponse {
    /// Endorsed transaction.
    pub tx_id: TxId,
    /// Responder's signature over `tx_id`.
    pub signature: TransactionSignature,
}

/// Responder → initiator: refusal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionResponse {
    /// Refused transaction.
    pub tx_id: TxId,
    /// Violated rule or policy.
    pub reason: String,
}

/// Initiator → responder: discard everything about this attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortNotice {
    /// Abandoned transaction.
    pub tx_id: TxId,
    /// Why.
    pub reason: String,
}

/// Initiator → responder: the transaction is committed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedMessage {
    /// Committed transaction with arbiter token.
    pub finalized: FinalizedTransaction,
}

/// Everything that travels over a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMessage {
    /// See [`ProposalMessage`].
    Proposal(ProposalMessage),
    /// See [`EndorsementResponse`].
    Endorsement(EndorsementResponse),
    /// See [`RejectionResponse`].
    Rejection(RejectionResponse),
    /// See [`AbortNotice`].
    Abort(AbortNotice),
    /// See [`FinalizedMessage`].
    Finalized(FinalizedMessage),
}

impl SessionMessage {
    /// Message kind for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionMessage::Proposal(_) => "Proposal",
            SessionMessage::Endorsement(_) => "Endorsement",
            SessionMessage::Rejection(_) => "Rejection",
            SessionMessage::Abort(_) => "Abort",
            SessionMessage::Finalized(_) => "Finalized",
        }
    }
}
