//! # Signing Coordinator Service
//!
//! One coordinator per party. The same instance drives attempts it
//! initiates ([`SigningCoordinator::run`], [`SigningCoordinator::resume`])
//! and answers sessions opened by others ([`SigningCoordinator::respond`]).

mod initiator;
mod listener;
mod responder;

pub use listener::{ResponderHandle, ResponderReport, ResponderService};

use crate::adapters::IouResponderPolicy;
use crate::domain::CoordinatorConfig;
use crate::ports::{CheckpointStore, IdentityService, ResponderPolicy, SessionOpener, VaultStore};
use ac_01_contract_engine::ContractEngine;
use ac_03_arbiter_client::ArbiterClient;
use shared_types::Party;
use std::sync::Arc;

/// Signing Coordinator implementation
pub struct SigningCoordinator<I, N, A, V, C>
where
    I: IdentityService,
    N: SessionOpener,
    A: ArbiterClient,
    V: VaultStore,
    C: CheckpointStore,
{
    me: Party,
    config: CoordinatorConfig,
    engine: ContractEngine,
    policy: Arc<dyn ResponderPolicy>,
    identity: Arc<I>,
    network: Arc<N>,
    arbiter: Arc<A>,
    vault: Arc<V>,
    checkpoints: Arc<C>,
}

impl<I, N, A, V, C> SigningCoordinator<I, N, A, V, C>
where
    I: IdentityService,
    N: SessionOpener,
    A: ArbiterClient,
    V: VaultStore,
    C: CheckpointStore,
{
    /// Create a coordinator acting as `me`.
    pub fn new(
        me: Party,
        config: CoordinatorConfig,
        identity: Arc<I>,
        network: Arc<N>,
        arbiter: Arc<A>,
        vault: Arc<V>,
        checkpoints: Arc<C>,
    ) -> Self {
        Self {
            me,
            config,
            engine: ContractEngine::new(),
            policy: Arc::new(IouResponderPolicy),
            identity,
            network,
            arbiter,
            vault,
            checkpoints,
        }
    }

    /// Replace the responder policy.
    pub fn with_policy(mut self, policy: Arc<dyn ResponderPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the contract engine (e.g. collect-all diagnostics).
    pub fn with_engine(mut self, engine: ContractEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Identity this coordinator acts as.
    pub fn party(&self) -> &Party {
        &self.me
    }

    /// Active configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// This party's vault.
    pub fn vault(&self) -> &Arc<V> {
        &self.vault
    }
}
