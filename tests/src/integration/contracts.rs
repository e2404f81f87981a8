//! # Contract Rules End to End
//!
//! Transfer and settlement through the full protocol, and the collect-all
//! diagnostic mode reporting every broken rule back to the initiator.

#[cfg(test)]
mod tests {
    use ac_01_contract_engine::domain::rules::{
        ISSUE_PAID_WITHIN_AMOUNT, ISSUE_POSITIVE_AMOUNT, TRANSFER_LENDER_CHANGES,
        TRANSFER_SIGNERS,
    };
    use ac_01_contract_engine::{ContractEngine, VerificationMode};
    use ac_02_transaction_builder::TransactionBuilder;
    use ac_04_signing_coordinator::{CoordinatorConfig, ProtocolError, VaultStore};
    use shared_types::{Command, CommandKind};

    use crate::fixtures::{fast_config, NodeOptions, TestLedger};

    #[tokio::test]
    async fn test_transfer_needs_all_three_parties() {
        let ledger = TestLedger::new();
        let alice = ledger.node("Alice");
        let mut bob = ledger.node("Bob");
        let mut charlie = ledger.node("Charlie");

        let issued = alice
            .coordinator
            .run(ledger.issue(&alice.party, &bob.party, 100))
            .await
            .unwrap();
        assert!(bob.committed().await);
        let input = issued.output_refs().remove(0);

        let transferred = alice
            .coordinator
            .run(ledger.transfer(&input, &charlie.party))
            .await
            .unwrap();

        assert_eq!(transferred.endorsed.signatures().count(), 3);
        assert!(bob.committed().await);
        assert!(charlie.committed().await);
        let live = charlie.vault.unconsumed().await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].state.lender, charlie.party);
        assert_eq!(live[0].state.borrower, bob.party);
        assert_eq!(live[0].state.linear_id, input.state.linear_id);
    }

    #[tokio::test]
    async fn test_transfer_to_same_lender_rejected_locally() {
        let ledger = TestLedger::new();
        let alice = ledger.node("Alice");
        let mut bob = ledger.node("Bob");

        let issued = alice
            .coordinator
            .run(ledger.issue(&alice.party, &bob.party, 100))
            .await
            .unwrap();
        assert!(bob.committed().await);
        let input = issued.output_refs().remove(0);
        let opened = ledger.network.sessions_opened();

        let err = alice
            .coordinator
            .run(ledger.transfer(&input, &alice.party))
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            ProtocolError::Validation(e) if e.violated_rules() == vec![TRANSFER_LENDER_CHANGES.to_string()]
        ));
        assert_eq!(ledger.network.sessions_opened(), opened);
    }

    #[tokio::test]
    async fn test_transfer_missing_new_lender_signature_rejected() {
        let ledger = TestLedger::new();
        let alice = ledger.node("Alice");
        let mut bob = ledger.node("Bob");
        let charlie = ledger.node("Charlie");

        let issued = alice
            .coordinator
            .run(ledger.issue(&alice.party, &bob.party, 100))
            .await
            .unwrap();
        assert!(bob.committed().await);
        let input = issued.output_refs().remove(0);

        let proposal = TransactionBuilder::new(ledger.arbiter.party())
            .with_command(Command::new(
                CommandKind::Transfer,
                input.state.participant_keys(),
            ))
            .with_input(input.clone())
            .with_output(input.state.with_new_lender(charlie.party.clone()))
            .build_unverified();
        let err = alice.coordinator.run(proposal).await.unwrap_err();

        match err {
            ProtocolError::Validation(e) => {
                assert_eq!(e.violated_rules(), vec![TRANSFER_SIGNERS.to_string()])
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_partial_then_full_settlement() {
        let ledger = TestLedger::new();
        let mut alice = ledger.node("Alice");
        let bob = ledger.node("Bob");

        let issued = bob
            .coordinator
            .run(ledger.issue(&alice.party, &bob.party, 100))
            .await
            .unwrap();
        assert!(alice.committed().await);
        let input = issued.output_refs().remove(0);

        let partial = bob.coordinator.run(ledger.settle(&input, 60)).await.unwrap();
        assert!(alice.committed().await);
        let remaining = partial.output_refs().remove(0);
        assert_eq!(remaining.state.paid.quantity, 60);
        assert_eq!(remaining.state.outstanding().unwrap().quantity, 40);

        let full = bob
            .coordinator
            .run(ledger.settle(&remaining, 40))
            .await
            .unwrap();
        assert!(alice.committed().await);

        assert!(full.output_refs().is_empty());
        assert!(alice.vault.unconsumed().await.unwrap().is_empty());
        assert!(bob.vault.unconsumed().await.unwrap().is_empty());
        assert_eq!(ledger.arbiter.accepted_count(), 3);
    }

    #[tokio::test]
    async fn test_collect_all_responder_reports_every_rule() {
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
        let mut bob = ledger.node_with(
            "Bob",
            NodeOptions {
                engine: Some(ContractEngine::with_mode(VerificationMode::CollectAll)),
                ..NodeOptions::default()
            },
        );

        let err = alice
            .coordinator
            .run(ledger.issue(&alice.party, &bob.party, -5))
            .await
            .unwrap_err();

        match err {
            ProtocolError::Rejected { reason, .. } => {
                assert_eq!(
                    reason,
                    format!("{}; {}", ISSUE_POSITIVE_AMOUNT, ISSUE_PAID_WITHIN_AMOUNT)
                );
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(bob.next_outcome().await.is_ok());
        assert_eq!(ledger.arbiter.accepted_count(), 0);
    }
}
