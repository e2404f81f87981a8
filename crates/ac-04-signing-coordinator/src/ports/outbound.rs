//! # Outbound Ports
//!
//! Transport, identity and storage are external collaborators.

use crate::domain::{Checkpoint, FlowId, ProtocolError, SessionMessage};
use async_trait::async_trait;
use shared_types::{
    FinalizedTransaction, Party, PartyKey, Proposal, StateAndRef, TransactionSignature, TxId,
};

/// One bidirectional conversation with a counterparty - outbound port.
///
/// Methods take `&self` so the initiator can notify a session while another
/// task is still waiting on it.
#[async_trait]
pub trait Session: Send + Sync {
    /// The party at the other end.
    fn counterparty(&self) -> &Party;

    /// Send a message.
    async fn send(&self, message: SessionMessage) -> Result<(), ProtocolError>;

    /// Wait for the next message.
    async fn receive(&self) -> Result<SessionMessage, ProtocolError>;
}

/// Stream of sessions initiated by other parties.
pub type SessionInbox = tokio::sync::mpsc::UnboundedReceiver<Box<dyn Session>>;

/// Opens sessions to counterparties - outbound port.
#[async_trait]
pub trait SessionOpener: Send + Sync {
    /// Open a fresh session to `counterparty`.
    async fn open(&self, counterparty: &Party) -> Result<Box<dyn Session>, ProtocolError>;
}

/// Signing capability - outbound port.
pub trait IdentityService: Send + Sync {
    /// Sign `payload` with the key of `identity`.
    fn sign(&self, payload: &[u8], identity: &PartyKey)
        -> Result<TransactionSignature, ProtocolError>;

    /// Whether `signature` is a valid signature over `payload` by `identity`.
    fn verify(&self, payload: &[u8], signature: &TransactionSignature, identity: &PartyKey)
        -> bool;
}

/// Local record of committed transactions - outbound port.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Record a finalized transaction. Recording twice is a no-op.
    async fn record(&self, finalized: &FinalizedTransaction) -> Result<(), ProtocolError>;

    /// Look up a recorded transaction.
    async fn get(&self, tx_id: &TxId) -> Result<Option<FinalizedTransaction>, ProtocolError>;

    /// Outputs of recorded transactions not consumed by a later recorded one.
    async fn unconsumed(&self) -> Result<Vec<StateAndRef>, ProtocolError>;
}

/// Durable checkpoints keyed by flow id - outbound port.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist the latest checkpoint of a flow.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), ProtocolError>;

    /// Latest checkpoint of a flow.
    async fn load(&self, flow_id: &FlowId) -> Result<Option<Checkpoint>, ProtocolError>;
}

/// Role-specific checks a responder applies on top of the contract.
pub trait ResponderPolicy: Send + Sync {
    /// `Err(reason)` refuses to endorse.
    fn check(&self, proposal: &Proposal, me: &Party) -> Result<(), String>;
}
