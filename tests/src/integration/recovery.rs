//! # Recovery Flows
//!
//! Arbiter retries, suspended attempts resumed after a restart, and the two
//! protocol deadlines (endorsement on the initiator, finality on responders).

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use ac_03_arbiter_client::{FailureMode, RetryPolicy};
    use ac_04_signing_coordinator::{
        AbortReason, CoordinatorConfig, CoordinatorState, FlowId, ProtocolError, ResponderOutcome,
        ResponderPolicy, Session, SessionMessage, TimeoutStage, VaultStore,
    };
    use shared_types::{Party, Proposal};

    use crate::fixtures::{fast_config, NodeOptions, TestLedger};

    fn flaky(failures: u32, mode: FailureMode) -> NodeOptions {
        NodeOptions {
            arbiter_failures: failures,
            failure_mode: mode,
            ..NodeOptions::default()
        }
    }

    // =============================================================================
    // ARBITER RETRY
    // =============================================================================

    #[tokio::test]
    async fn test_transport_failures_are_retried() {
        let ledger = TestLedger::new();
        let alice = ledger.node_with("Alice", flaky(2, FailureMode::Transport));
        let mut bob = ledger.node("Bob");

        let finalized = alice
            .coordinator
            .run(ledger.issue(&alice.party, &bob.party, 10))
            .await
            .unwrap();

        assert_eq!(alice.arbiter.calls(), 3);
        assert_eq!(ledger.arbiter.accepted_count(), 1);
        assert!(bob.committed().await);
        assert!(bob.vault.get(&finalized.id()).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_submission_times_out_and_is_retried() {
        let ledger = TestLedger::new();
        let alice = ledger.node_with("Alice", flaky(1, FailureMode::Hang));
        let mut bob = ledger.node("Bob");

        alice
            .coordinator
            .run(ledger.issue(&alice.party, &bob.party, 10))
            .await
            .unwrap();

        assert_eq!(alice.arbiter.calls(), 2);
        assert!(bob.committed().await);
    }

    #[tokio::test]
    async fn test_lost_response_is_replayed_not_duplicated() {
        let ledger = TestLedger::new();
        let alice = ledger.node_with("Alice", flaky(1, FailureMode::LoseResponse));
        let mut bob = ledger.node("Bob");

        let finalized = alice
            .coordinator
            .run(ledger.issue(&alice.party, &bob.party, 10))
            .await
            .unwrap();

        assert_eq!(alice.arbiter.calls(), 2);
        assert_eq!(ledger.arbiter.accepted_count(), 1);
        assert_eq!(finalized.token.sequence, 1);
        assert!(bob.committed().await);
    }

    // =============================================================================
    // SUSPEND AND RESUME
    // =============================================================================

    #[tokio::test]
    async fn test_exhausted_retries_suspend_then_resume_finalizes() {
        let ledger = TestLedger::new();
        let alice = ledger.node_with("Alice", flaky(u32::MAX, FailureMode::Transport));
        let mut bob = ledger.node("Bob");

        let flow_id = FlowId::new();
        let err = alice
            .coordinator
            .run_flow(flow_id, ledger.issue(&alice.party, &bob.party, 10))
            .await
            .unwrap_err();

        assert!(matches!(err, ProtocolError::ArbiterUnavailable(_)));
        assert!(err.is_retryable());
        assert_eq!(alice.arbiter.calls(), fast_config().arbiter_retry.attempts());
        assert_eq!(
            alice.checkpoints.history(&flow_id).last(),
            Some(&CoordinatorState::AwaitingArbiter)
        );
        // Bob endorsed, then saw the session close.
        assert!(matches!(
            bob.next_outcome().await,
            Err(ProtocolError::Transport(_))
        ));
        assert!(bob.vault.is_empty());

        let restarted = ledger.restart(&alice, fast_config());
        let finalized = restarted.resume(flow_id).await.unwrap();

        assert!(alice.vault.get(&finalized.id()).await.unwrap().is_some());
        assert!(bob.committed().await);
        assert!(bob.vault.get(&finalized.id()).await.unwrap().is_some());
        assert_eq!(
            alice.checkpoints.history(&flow_id).last(),
            Some(&CoordinatorState::Finalized)
        );

        // Resuming again is a no-op returning the same transaction.
        assert_eq!(restarted.resume(flow_id).await.unwrap(), finalized);
        assert_eq!(ledger.arbiter.accepted_count(), 1);
    }

    struct RefuseEverything;

    impl ResponderPolicy for RefuseEverything {
        fn check(&self, _proposal: &Proposal, _me: &Party) -> Result<(), String> {
            Err("no".to_string())
        }
    }

    #[tokio::test]
    async fn test_resume_of_aborted_flow_replays_the_abort() {
        let ledger = TestLedger::new();
        let alice = ledger.node("Alice");
        let mut bob = ledger.node_with(
            "Bob",
            NodeOptions {
                policy: Some(Arc::new(RefuseEverything)),
                ..NodeOptions::default()
            },
        );

        let flow_id = FlowId::new();
        let first = alice
            .coordinator
            .run_flow(flow_id, ledger.issue(&alice.party, &bob.party, 10))
            .await
            .unwrap_err();
        let _ = bob.next_outcome().await;
        let opened = ledger.network.sessions_opened();

        let replayed = alice.coordinator.resume(flow_id).await.unwrap_err();

        assert_eq!(replayed.to_string(), first.to_string());
        assert_eq!(ledger.network.sessions_opened(), opened);
    }

    // =============================================================================
    // DEADLINES
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_endorsement_timeout_notifies_every_session() {
        let ledger = TestLedger::new();
        let alice = ledger.node("Alice");
        // Bob waits for finality well past Alice's endorsement deadline.
        let mut bob = ledger.node_with(
            "Bob",
            NodeOptions {
                config: CoordinatorConfig {
                    finality_timeout: Duration::from_secs(10),
                    ..fast_config()
                },
                ..NodeOptions::default()
            },
        );
        let mut charlie = ledger.silent_node("Charlie");

        let issued = alice
            .coordinator
            .run(ledger.issue(&alice.party, &bob.party, 100))
            .await
            .unwrap();
        assert!(bob.committed().await);
        let input = issued.output_refs().remove(0);

        let flow_id = FlowId::new();
        let err = alice
            .coordinator
            .run_flow(flow_id, ledger.transfer(&input, &charlie.party))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProtocolError::Timeout {
                stage: TimeoutStage::Endorsement
            }
        ));
        assert_eq!(
            alice.checkpoints.history(&flow_id).last(),
            Some(&CoordinatorState::Aborted(AbortReason::Timeout {
                stage: TimeoutStage::Endorsement
            }))
        );

        // Bob endorsed in time and is told to discard.
        assert!(matches!(
            bob.next_outcome().await.unwrap(),
            ResponderOutcome::Aborted { .. }
        ));

        // Charlie never answered but still receives the abort.
        let inbox = charlie.inbox.as_mut().unwrap();
        let session = inbox.recv().await.unwrap();
        assert!(matches!(
            session.receive().await.unwrap(),
            SessionMessage::Proposal(_)
        ));
        assert!(matches!(
            session.receive().await.unwrap(),
            SessionMessage::Abort(_)
        ));

        assert_eq!(ledger.arbiter.consumer_of(&input.reference), None);
        assert_eq!(bob.vault.unconsumed().await.unwrap(), vec![input]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_responder_finality_timeout_discards_then_late_finality_commits() {
        let ledger = TestLedger::new();
        let alice = ledger.node_with(
            "Alice",
            NodeOptions {
                config: CoordinatorConfig {
                    arbiter_retry: RetryPolicy {
                        max_attempts: 1,
                        attempt_timeout: Duration::from_secs(5),
                        ..RetryPolicy::default()
                    },
                    ..fast_config()
                },
                ..flaky(1, FailureMode::Hang)
            },
        );
        let mut bob = ledger.node("Bob");

        let flow_id = FlowId::new();
        let err = alice
            .coordinator
            .run_flow(flow_id, ledger.issue(&alice.party, &bob.party, 10))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProtocolError::Timeout {
                stage: TimeoutStage::Arbiter
            }
        ));
        assert!(err.is_retryable());
        // Bob's deadline (2s) passed long before the arbiter attempt (5s).
        assert!(matches!(
            bob.next_outcome().await,
            Err(ProtocolError::Timeout {
                stage: TimeoutStage::Finality
            })
        ));
        assert!(bob.vault.is_empty());

        let finalized = ledger
            .restart(&alice, fast_config())
            .resume(flow_id)
            .await
            .unwrap();

        match bob.next_outcome().await.unwrap() {
            ResponderOutcome::Committed(tx) => assert_eq!(tx.id(), finalized.id()),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(bob.vault.get(&finalized.id()).await.unwrap().is_some());
    }
}
