//! # Participants
//!
//! Every participant gets its own key vault, ledger vault and checkpoint
//! store. The arbiter and the network are shared.
//!
//! ```text
//!            InMemoryNetwork ──sessions──┐
//!                  │                     │
//!   Alice ─────────┼──── Bob ────────────┼──── Charlie
//!     │            │      │              │       │
//!     └────────────┴──────┴─ InMemoryArbiter ────┘
//! ```

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument};

use ac_03_arbiter_client::InMemoryArbiter;
use ac_04_signing_coordinator::{
    InMemoryCheckpointStore, InMemoryNetwork, InMemoryVault, LocalKeyVault, NetworkOpener,
    ResponderHandle, ResponderReport, ResponderService, SigningCoordinator,
};
use shared_types::Party;

use crate::container::config::NodeConfig;

/// Concrete coordinator type with in-memory backends.
pub type NodeCoordinator = SigningCoordinator<
    LocalKeyVault,
    NetworkOpener,
    InMemoryArbiter,
    InMemoryVault,
    InMemoryCheckpointStore,
>;

/// One identity with its coordinator and running accept loop.
pub struct Participant {
    /// Public identity.
    pub party: Party,
    /// Drives flows this participant initiates.
    pub coordinator: Arc<NodeCoordinator>,
    /// Committed transactions.
    pub vault: Arc<InMemoryVault>,
    /// Flow checkpoints.
    pub checkpoints: Arc<InMemoryCheckpointStore>,
    responder: Mutex<Option<ResponderHandle>>,
}

impl Participant {
    /// Wait for the next session answered by this participant.
    pub async fn next_report(&self) -> Option<ResponderReport> {
        match self.responder.lock().await.as_mut() {
            Some(handle) => handle.next_report().await,
            None => None,
        }
    }

    /// Stop answering new sessions.
    pub async fn stop(&self) {
        if let Some(handle) = self.responder.lock().await.take() {
            handle.shutdown();
        }
    }
}

/// Shared infrastructure plus all participants.
pub struct PartyContainer {
    /// Uniqueness and finality service.
    pub arbiter: Arc<InMemoryArbiter>,
    /// Session routing between participants.
    pub network: Arc<InMemoryNetwork>,
    /// Node configuration (immutable after initialization).
    pub config: NodeConfig,
    participants: Vec<Arc<Participant>>,
}

impl PartyContainer {
    /// Create the shared arbiter and network.
    #[instrument(name = "container_init", skip(config))]
    pub fn new(config: NodeConfig, arbiter_name: &str) -> Self {
        let arbiter = Arc::new(InMemoryArbiter::new(arbiter_name));
        info!(arbiter = %arbiter_name, "Arbiter online");
        Self {
            arbiter,
            network: Arc::new(InMemoryNetwork::new()),
            config,
            participants: Vec::new(),
        }
    }

    /// Create an identity, wire its coordinator and start its accept loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn add_party(&mut self, name: &str) -> Arc<Participant> {
        let keys = Arc::new(LocalKeyVault::new());
        let party = keys.create_identity(name);
        let vault = Arc::new(InMemoryVault::new());
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());

        let coordinator = Arc::new(SigningCoordinator::new(
            party.clone(),
            self.config.coordinator.clone(),
            keys,
            Arc::new(self.network.opener(party.clone())),
            Arc::clone(&self.arbiter),
            Arc::clone(&vault),
            Arc::clone(&checkpoints),
        ));
        let inbox = self.network.register(&party);
        let responder = ResponderService::spawn(Arc::clone(&coordinator), inbox);
        info!(party = %party.name, key = %party.owning_key, "Participant ready");

        let participant = Arc::new(Participant {
            party,
            coordinator,
            vault,
            checkpoints,
            responder: Mutex::new(Some(responder)),
        });
        self.participants.push(Arc::clone(&participant));
        participant
    }

    /// Every participant, in creation order.
    pub fn participants(&self) -> &[Arc<Participant>] {
        &self.participants
    }

    /// Stop every accept loop.
    pub async fn shutdown(&self) {
        for participant in &self.participants {
            participant.stop().await;
        }
        info!(participants = self.participants.len(), "All participants stopped");
    }
}
