//! In-memory vault of finalized transactions.

use crate::domain::ProtocolError;
use crate::ports::VaultStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{FinalizedTransaction, StateAndRef, StateRef, TxId};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

#[derive(Default)]
struct VaultData {
    /// Ordered by id so listings are deterministic.
    transactions: BTreeMap<TxId, FinalizedTransaction>,
    consumed: HashSet<StateRef>,
}

/// Transactions this party has seen committed.
#[derive(Default)]
pub struct InMemoryVault {
    data: RwLock<VaultData>,
}

impl InMemoryVault {
    /// Empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded transactions.
    pub fn len(&self) -> usize {
        self.data.read().transactions.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VaultStore for InMemoryVault {
    async fn record(&self, finalized: &FinalizedTransaction) -> Result<(), ProtocolError> {
        let tx_id = finalized.id();
        let mut data = self.data.write();
        if data.transactions.contains_key(&tx_id) {
            return Ok(());
        }
        data.consumed
            .extend(finalized.endorsed.proposal.input_refs());
        data.transactions.insert(tx_id, finalized.clone());
        debug!(tx_id = %tx_id, "Recorded in vault");
        Ok(())
    }

    async fn get(&self, tx_id: &TxId) -> Result<Option<FinalizedTransaction>, ProtocolError> {
        Ok(self.data.read().transactions.get(tx_id).cloned())
    }

    async fn unconsumed(&self) -> Result<Vec<StateAndRef>, ProtocolError> {
        let data = self.data.read();
        Ok(data
            .transactions
            .values()
            .flat_map(|tx| tx.output_refs())
            .filter(|s| !data.consumed.contains(&s.reference))
            .collect())
    }
}
