//! In-Memory Arbiter
//!
//! Single-node reference arbiter. The consumed-input record is the only
//! state shared between otherwise unrelated transactions, and it is only
//! mutated here.

use crate::domain::{ArbiterError, NotarizationOutcome};
use crate::ports::ArbiterClient;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_crypto::{verify_signature, Ed25519KeyPair};
use shared_types::{
    ArbiterToken, EndorsedProposal, Party, PartyKey, StateRef, TransactionSignature, TxId,
};
use std::collections::{BTreeSet, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};

#[derive(Default)]
struct Ledger {
    /// Input -> transaction that consumed it.
    consumed: HashMap<StateRef, TxId>,
    /// Accepted transaction -> its token.
    accepted: HashMap<TxId, ArbiterToken>,
    /// Last issued sequence number.
    sequence: u64,
}

/// In-memory uniqueness service for tests and the demo node.
pub struct InMemoryArbiter {
    identity: Party,
    keypair: Ed25519KeyPair,
    ledger: Mutex<Ledger>,
    /// Clock override in Unix milliseconds; `None` uses the system clock.
    clock_ms: RwLock<Option<u64>>,
}

impl InMemoryArbiter {
    /// Arbiter with a fresh random key.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_keypair(name, Ed25519KeyPair::generate())
    }

    /// Arbiter signing with the given key.
    pub fn with_keypair(name: impl Into<String>, keypair: Ed25519KeyPair) -> Self {
        let identity = Party::new(name, PartyKey(keypair.public_key()));
        Self {
            identity,
            keypair,
            ledger: Mutex::new(Ledger::default()),
            clock_ms: RwLock::new(None),
        }
    }

    /// Identity to name in proposals.
    pub fn party(&self) -> Party {
        self.identity.clone()
    }

    /// Pin the clock for testing.
    pub fn set_time(&self, now_ms: u64) {
        *self.clock_ms.write() = Some(now_ms);
    }

    /// Current arbiter time.
    pub fn now_ms(&self) -> u64 {
        match *self.clock_ms.read() {
            Some(pinned) => pinned,
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
        }
    }

    /// Transaction that consumed `state_ref`, if any.
    pub fn consumer_of(&self, state_ref: &StateRef) -> Option<TxId> {
        self.ledger.lock().consumed.get(state_ref).copied()
    }

    /// Number of accepted transactions.
    pub fn accepted_count(&self) -> usize {
        self.ledger.lock().accepted.len()
    }

    fn invalid_signers(&self, endorsed: &EndorsedProposal, tx_id: &TxId) -> BTreeSet<PartyKey> {
        endorsed
            .proposal
            .required_signers()
            .into_iter()
            .filter(|key| match endorsed.signature_of(key) {
                Some(sig) => verify_signature(key.as_bytes(), tx_id.as_bytes(), &sig.bytes).is_err(),
                None => true,
            })
            .collect()
    }

    fn sign_token(&self, tx_id: TxId, sequence: u64) -> ArbiterToken {
        let payload = ArbiterToken::signing_payload(&tx_id, sequence);
        let signature = self.keypair.sign(&payload);
        ArbiterToken {
            tx_id,
            arbiter: self.identity.owning_key,
            sequence,
            signature: TransactionSignature {
                by: self.identity.owning_key,
                bytes: signature,
            },
        }
    }
}

#[async_trait]
impl ArbiterClient for InMemoryArbiter {
    async fn notarize(
        &self,
        endorsed: &EndorsedProposal,
    ) -> Result<NotarizationOutcome, ArbiterError> {
        let tx_id = endorsed.id();
        let now_ms = self.now_ms();
        let mut ledger = self.ledger.lock();

        if let Some(token) = ledger.accepted.get(&tx_id) {
            debug!(tx_id = %tx_id, sequence = token.sequence, "Replaying accepted transaction");
            return Ok(NotarizationOutcome::Accepted(*token));
        }

        let missing = self.invalid_signers(endorsed, &tx_id);
        if !missing.is_empty() {
            info!(tx_id = %tx_id, missing = missing.len(), "Rejecting: invalid signatures");
            return Ok(NotarizationOutcome::InvalidSignatures { missing });
        }

        if let Some(window) = &endorsed.proposal.time_window {
            if !window.contains(now_ms) {
                info!(tx_id = %tx_id, now_ms, "Rejecting: outside time window");
                return Ok(NotarizationOutcome::MisalignedTime);
            }
        }

        for state_ref in endorsed.proposal.input_refs() {
            if let Some(consumer) = ledger.consumed.get(&state_ref) {
                if *consumer != tx_id {
                    error!(
                        tx_id = %tx_id,
                        conflicting_tx_id = %consumer,
                        state_ref = %state_ref,
                        "Double spend rejected"
                    );
                    return Ok(NotarizationOutcome::Conflict {
                        conflicting_tx_id: *consumer,
                        state_ref,
                    });
                }
            }
        }

        for state_ref in endorsed.proposal.input_refs() {
            ledger.consumed.insert(state_ref, tx_id);
        }
        ledger.sequence += 1;
        let token = self.sign_token(tx_id, ledger.sequence);
        ledger.accepted.insert(tx_id, token);

        info!(tx_id = %tx_id, sequence = token.sequence, "Transaction notarised");
        Ok(NotarizationOutcome::Accepted(token))
    }
}
