//! # Test Fixtures
//!
//! A [`TestLedger`] owns the shared arbiter and network; each
//! [`TestNode`] is one participant with its own keys, vault, checkpoints and
//! accept loop. Every coordinator talks to the arbiter through a
//! [`FlakyArbiter`] so any test can inject submission failures.

use std::sync::Arc;
use std::time::Duration;

use ac_01_contract_engine::ContractEngine;
use ac_02_transaction_builder::TransactionBuilder;
use ac_03_arbiter_client::{FailureMode, FlakyArbiter, InMemoryArbiter, RetryPolicy};
use ac_04_signing_coordinator::{
    CoordinatorConfig, InMemoryCheckpointStore, InMemoryNetwork, InMemoryVault, LocalKeyVault,
    NetworkOpener, ProtocolError, ResponderHandle, ResponderOutcome, ResponderPolicy,
    ResponderService, SessionInbox, SigningCoordinator,
};
use shared_types::{
    Amount, Command, CommandKind, LedgerState, Party, Proposal, StateAndRef,
};

/// Arbiter client used by every test coordinator.
pub type TestArbiter = FlakyArbiter<Arc<InMemoryArbiter>>;

/// Coordinator with in-memory backends.
pub type TestCoordinator = SigningCoordinator<
    LocalKeyVault,
    NetworkOpener,
    TestArbiter,
    InMemoryVault,
    InMemoryCheckpointStore,
>;

/// Short timeouts and a quick retry policy.
pub fn fast_config() -> CoordinatorConfig {
    CoordinatorConfig {
        endorsement_timeout: Duration::from_secs(2),
        finality_timeout: Duration::from_secs(2),
        verify_before_send: true,
        arbiter_retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(40),
            attempt_timeout: Duration::from_millis(250),
        },
    }
}

/// How a node is wired.
pub struct NodeOptions {
    /// Coordinator configuration.
    pub config: CoordinatorConfig,
    /// Arbiter submissions that fail before the arbiter is reached.
    pub arbiter_failures: u32,
    /// How those failures manifest.
    pub failure_mode: FailureMode,
    /// Replaces the default IOU responder policy.
    pub policy: Option<Arc<dyn ResponderPolicy>>,
    /// Replaces the default short-circuit engine.
    pub engine: Option<ContractEngine>,
    /// Start an accept loop; otherwise the inbox is handed to the test.
    pub respond: bool,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            config: fast_config(),
            arbiter_failures: 0,
            failure_mode: FailureMode::Transport,
            policy: None,
            engine: None,
            respond: true,
        }
    }
}

/// One participant.
pub struct TestNode {
    /// Public identity.
    pub party: Party,
    /// Signing keys.
    pub keys: Arc<LocalKeyVault>,
    /// Committed transactions.
    pub vault: Arc<InMemoryVault>,
    /// Flow checkpoints.
    pub checkpoints: Arc<InMemoryCheckpointStore>,
    /// The node's arbiter client.
    pub arbiter: Arc<TestArbiter>,
    /// Initiates flows.
    pub coordinator: Arc<TestCoordinator>,
    /// Accept loop, when started.
    pub responder: Option<ResponderHandle>,
    /// Raw inbox, when no accept loop was started.
    pub inbox: Option<SessionInbox>,
}

impl TestNode {
    /// Outcome of the next session this node answered.
    pub async fn next_outcome(&mut self) -> Result<ResponderOutcome, ProtocolError> {
        let handle = self.responder.as_mut().expect("node has no accept loop");
        handle.next_report().await.expect("accept loop stopped").result
    }

    /// Whether the next answered session ended committed.
    pub async fn committed(&mut self) -> bool {
        matches!(self.next_outcome().await, Ok(ResponderOutcome::Committed(_)))
    }
}

/// Shared arbiter and network.
pub struct TestLedger {
    /// Uniqueness service shared by every node.
    pub arbiter: Arc<InMemoryArbiter>,
    /// Session routing.
    pub network: Arc<InMemoryNetwork>,
}

impl Default for TestLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLedger {
    /// Fresh arbiter and network.
    pub fn new() -> Self {
        Self {
            arbiter: Arc::new(InMemoryArbiter::new("Arbiter")),
            network: Arc::new(InMemoryNetwork::new()),
        }
    }

    /// Node with default options.
    pub fn node(&self, name: &str) -> TestNode {
        self.node_with(name, NodeOptions::default())
    }

    /// Node reachable on the network that never answers on its own.
    pub fn silent_node(&self, name: &str) -> TestNode {
        self.node_with(
            name,
            NodeOptions {
                respond: false,
                ..NodeOptions::default()
            },
        )
    }

    /// Node wired according to `options`.
    pub fn node_with(&self, name: &str, options: NodeOptions) -> TestNode {
        let keys = Arc::new(LocalKeyVault::new());
        let party = keys.create_identity(name);
        let vault = Arc::new(InMemoryVault::new());
        let checkpoints = Arc::new(InMemoryCheckpointStore::with_history());
        let arbiter = Arc::new(FlakyArbiter::new(
            Arc::clone(&self.arbiter),
            options.arbiter_failures,
            options.failure_mode,
        ));

        let mut coordinator = SigningCoordinator::new(
            party.clone(),
            options.config,
            Arc::clone(&keys),
            Arc::new(self.network.opener(party.clone())),
            Arc::clone(&arbiter),
            Arc::clone(&vault),
            Arc::clone(&checkpoints),
        );
        if let Some(policy) = options.policy {
            coordinator = coordinator.with_policy(policy);
        }
        if let Some(engine) = options.engine {
            coordinator = coordinator.with_engine(engine);
        }
        let coordinator = Arc::new(coordinator);

        let inbox = self.network.register(&party);
        let (responder, inbox) = if options.respond {
            (
                Some(ResponderService::spawn(Arc::clone(&coordinator), inbox)),
                None,
            )
        } else {
            (None, Some(inbox))
        };

        TestNode {
            party,
            keys,
            vault,
            checkpoints,
            arbiter,
            coordinator,
            responder,
            inbox,
        }
    }

    /// A second coordinator for `node` sharing its keys and stores, as after
    /// a restart. It does not answer sessions.
    pub fn restart(&self, node: &TestNode, config: CoordinatorConfig) -> TestCoordinator {
        SigningCoordinator::new(
            node.party.clone(),
            config,
            Arc::clone(&node.keys),
            Arc::new(self.network.opener(node.party.clone())),
            Arc::new(FlakyArbiter::new(
                Arc::clone(&self.arbiter),
                0,
                FailureMode::Transport,
            )),
            Arc::clone(&node.vault),
            Arc::clone(&node.checkpoints),
        )
    }

    // =========================================================================
    // PROPOSALS
    // =========================================================================

    /// Unverified issue of `quantity` USD owed by `borrower` to `lender`.
    pub fn issue(&self, lender: &Party, borrower: &Party, quantity: i64) -> Proposal {
        let state = LedgerState::new(
            Amount::new(quantity, "USD"),
            lender.clone(),
            borrower.clone(),
        );
        TransactionBuilder::new(self.arbiter.party())
            .with_command(Command::new(CommandKind::Issue, state.participant_keys()))
            .with_output(state)
            .build_unverified()
    }

    /// Unverified transfer of `input` to `new_lender`.
    pub fn transfer(&self, input: &StateAndRef, new_lender: &Party) -> Proposal {
        let signers = input
            .state
            .participant_keys()
            .into_iter()
            .chain([new_lender.owning_key]);
        TransactionBuilder::new(self.arbiter.party())
            .with_command(Command::new(CommandKind::Transfer, signers))
            .with_input(input.clone())
            .with_output(input.state.with_new_lender(new_lender.clone()))
            .build_unverified()
    }

    /// Unverified settlement of `payment` USD against `input`.
    ///
    /// Emits a remaining IOU only while something is left to pay.
    pub fn settle(&self, input: &StateAndRef, payment: i64) -> Proposal {
        let payment = Amount::new(payment, "USD");
        let mut builder = TransactionBuilder::new(self.arbiter.party())
            .with_command(Command::new(
                CommandKind::Settle {
                    payment: payment.clone(),
                },
                input.state.participant_keys(),
            ))
            .with_input(input.clone());
        if let Ok(paid) = input.state.pay(&payment) {
            if paid.outstanding().map_or(false, |left| left.quantity > 0) {
                builder = builder.with_output(paid);
            }
        }
        builder.build_unverified()
    }
}
