//! # Protocol Scenarios
//!
//! The four canonical runs of the signing protocol:
//!
//! 1. **Happy path**: Alice issues to Bob; both vaults hold the transaction
//! 2. **Local rejection**: a contract violation fails before any session opens
//! 3. **Remote rejection**: Bob refuses (a self-loan, a policy or an
//!    overpayment); the attempt aborts and nothing commits
//! 4. **Double spend**: two concurrent spends of one IOU; exactly one commits

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ac_01_contract_engine::domain::rules::{ISSUE_DISTINCT_PARTIES, SETTLE_NOT_OVERPAID};
    use ac_02_transaction_builder::TransactionBuilder;
    use ac_04_signing_coordinator::{
        AbortReason, CoordinatorConfig, CoordinatorState, FlowId, ProtocolError,
        ResponderOutcome, ResponderPolicy, VaultStore,
    };
    use shared_types::{Amount, Command, CommandKind, LedgerState, Party, Proposal};

    use crate::fixtures::{fast_config, NodeOptions, TestLedger};

    // =============================================================================
    // SCENARIO A: HAPPY PATH
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_a_issue_commits_everywhere() {
        let ledger = TestLedger::new();
        let alice = ledger.node("Alice");
        let mut bob = ledger.node("Bob");

        let flow_id = FlowId::new();
        let proposal = ledger.issue(&alice.party, &bob.party, 100);
        let tx_id = proposal.id();
        let finalized = alice.coordinator.run_flow(flow_id, proposal).await.unwrap();

        assert_eq!(finalized.id(), tx_id);
        assert_eq!(finalized.token.sequence, 1);
        assert!(bob.committed().await);

        for vault in [&alice.vault, &bob.vault] {
            let recorded = vault.get(&tx_id).await.unwrap().unwrap();
            assert_eq!(recorded, finalized);
            let live = vault.unconsumed().await.unwrap();
            assert_eq!(live.len(), 1);
            assert_eq!(live[0].state.amount.quantity, 100);
        }
        assert_eq!(
            alice.checkpoints.history(&flow_id).last(),
            Some(&CoordinatorState::Finalized)
        );
        assert_eq!(alice.arbiter.calls(), 1);
    }

    // =============================================================================
    // SCENARIO B: LOCAL REJECTION
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_b_self_issue_never_leaves_the_node() {
        let ledger = TestLedger::new();
        let alice = ledger.node("Alice");
        let _bob = ledger.node("Bob");

        let proposal = ledger.issue(&alice.party, &alice.party, 100);
        let err = alice.coordinator.run(proposal).await.unwrap_err();

        match err {
            ProtocolError::Validation(e) => {
                assert_eq!(e.violated_rules(), vec![ISSUE_DISTINCT_PARTIES.to_string()])
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(ledger.network.sessions_opened(), 0);
        assert_eq!(alice.checkpoints.flow_count(), 0);
        assert_eq!(alice.arbiter.calls(), 0);
    }

    // =============================================================================
    // SCENARIO C: REMOTE REJECTION
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_c_self_loan_rejected_by_responder() {
        let ledger = TestLedger::new();
        let alice = ledger.node_with(
            "Alice",
            NodeOptions {
                config: CoordinatorConfig {
                    verify_before_send: false,
                    ..fast_config()
                },
                ..NodeOptions::default()
            },
        );
        let mut bob = ledger.node("Bob");

        // Bob lends to himself, yet Alice's signature is demanded too.
        let state = LedgerState::new(Amount::new(100, "USD"), bob.party.clone(), bob.party.clone());
        let proposal = TransactionBuilder::new(ledger.arbiter.party())
            .with_command(Command::new(
                CommandKind::Issue,
                [alice.party.owning_key, bob.party.owning_key],
            ))
            .with_output(state)
            .build_unverified();

        let flow_id = FlowId::new();
        let err = alice.coordinator.run_flow(flow_id, proposal).await.unwrap_err();

        match &err {
            ProtocolError::Rejected {
                remote_party,
                reason,
            } => {
                assert_eq!(remote_party, "Bob");
                assert!(reason.contains(ISSUE_DISTINCT_PARTIES), "reason {:?}", reason);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(
            bob.next_outcome().await.unwrap(),
            ResponderOutcome::Rejected { .. }
        ));
        assert!(matches!(
            alice.checkpoints.history(&flow_id).last(),
            Some(CoordinatorState::Aborted(AbortReason::Rejected { .. }))
        ));
        assert!(alice.vault.is_empty());
        assert!(bob.vault.is_empty());
        assert_eq!(alice.arbiter.calls(), 0);
    }

    struct RefuseLargeLoans;

    impl ResponderPolicy for RefuseLargeLoans {
        fn check(&self, proposal: &Proposal, _me: &Party) -> Result<(), String> {
            if proposal.outputs.iter().any(|s| s.amount.quantity > 1_000) {
                return Err("amount exceeds credit line".to_string());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_scenario_c_responder_refusal_aborts_attempt() {
        let ledger = TestLedger::new();
        let alice = ledger.node("Alice");
        let mut bob = ledger.node_with(
            "Bob",
            NodeOptions {
                policy: Some(Arc::new(RefuseLargeLoans)),
                ..NodeOptions::default()
            },
        );

        let flow_id = FlowId::new();
        let proposal = ledger.issue(&alice.party, &bob.party, 5_000);
        let err = alice.coordinator.run_flow(flow_id, proposal).await.unwrap_err();

        match &err {
            ProtocolError::Rejected {
                remote_party,
                reason,
            } => {
                assert_eq!(remote_party, "Bob");
                assert_eq!(reason, "amount exceeds credit line");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(
            bob.next_outcome().await.unwrap(),
            ResponderOutcome::Rejected { .. }
        ));
        assert!(matches!(
            alice.checkpoints.history(&flow_id).last(),
            Some(CoordinatorState::Aborted(AbortReason::Rejected { .. }))
        ));
        assert!(alice.vault.is_empty());
        assert!(bob.vault.is_empty());
        assert_eq!(ledger.arbiter.accepted_count(), 0);

        // A loan within the credit line still goes through.
        let proposal = ledger.issue(&alice.party, &bob.party, 500);
        alice.coordinator.run(proposal).await.unwrap();
        assert!(bob.committed().await);
    }

    #[tokio::test]
    async fn test_scenario_c_responder_reverifies_contract() {
        let ledger = TestLedger::new();
        let honest = ledger.node("Alice");
        let mut bob = ledger.node("Bob");

        let issued = honest
            .coordinator
            .run(ledger.issue(&honest.party, &bob.party, 50))
            .await
            .unwrap();
        assert!(bob.committed().await);
        let input = issued.output_refs().remove(0);

        let careless = ledger.restart(
            &honest,
            CoordinatorConfig {
                verify_before_send: false,
                ..fast_config()
            },
        );
        let err = careless
            .run(ledger.settle(&input, 80))
            .await
            .unwrap_err();

        assert!(
            matches!(&err, ProtocolError::Rejected { reason, .. } if reason.contains(SETTLE_NOT_OVERPAID)),
            "unexpected error {:?}",
            err
        );
        assert!(matches!(
            bob.next_outcome().await.unwrap(),
            ResponderOutcome::Rejected { .. }
        ));
        assert_eq!(ledger.arbiter.consumer_of(&input.reference), None);
        assert_eq!(bob.vault.unconsumed().await.unwrap(), vec![input]);
    }

    // =============================================================================
    // SCENARIO D: DOUBLE SPEND
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_d_concurrent_spends_one_wins() {
        let ledger = TestLedger::new();
        let mut alice = ledger.node("Alice");
        let mut bob = ledger.node("Bob");
        let mut charlie = ledger.node("Charlie");

        let issued = alice
            .coordinator
            .run(ledger.issue(&alice.party, &bob.party, 100))
            .await
            .unwrap();
        assert!(bob.committed().await);
        let input = issued.output_refs().remove(0);

        // Alice moves the IOU to Charlie while Bob pays part of it to Alice.
        let transfer = ledger.transfer(&input, &charlie.party);
        let settle = ledger.settle(&input, 30);
        let (transfer_id, settle_id) = (transfer.id(), settle.id());
        let (transferred, settled) = futures::join!(
            alice.coordinator.run(transfer),
            bob.coordinator.run(settle)
        );

        let (winner, loser_err) = match (transferred, settled) {
            (Ok(tx), Err(e)) | (Err(e), Ok(tx)) => (tx, e),
            (a, b) => panic!("expected exactly one winner, got {:?} / {:?}", a, b),
        };
        let loser_id = if winner.id() == transfer_id {
            settle_id
        } else {
            transfer_id
        };
        assert!(
            matches!(loser_err, ProtocolError::NotaryConflict { conflicting_tx_id } if conflicting_tx_id == winner.id()),
            "unexpected error {:?}",
            loser_err
        );
        assert!(!loser_err.is_retryable());

        // Each initiator submitted exactly once: conflicts are not retried.
        assert_eq!(alice.arbiter.calls(), 2);
        assert_eq!(bob.arbiter.calls(), 1);
        assert_eq!(ledger.arbiter.consumer_of(&input.reference), Some(winner.id()));

        // Drain the sessions each party answered: Bob and Charlie the
        // transfer, Alice the settlement.
        let _ = bob.next_outcome().await;
        let _ = charlie.next_outcome().await;
        let _ = alice.next_outcome().await;

        for vault in [&alice.vault, &bob.vault] {
            assert!(vault.get(&winner.id()).await.unwrap().is_some());
            assert!(vault.get(&loser_id).await.unwrap().is_none());
        }
        assert!(charlie.vault.get(&settle_id).await.unwrap().is_none());
    }
}
