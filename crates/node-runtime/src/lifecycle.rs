//! # IOU Lifecycle
//!
//! Drives one IOU through issue, transfer and partial settlement across three
//! participants and summarises each committed step.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::info;

use ac_01_contract_engine::ContractEngine;
use ac_02_transaction_builder::TransactionBuilder;
use ac_04_signing_coordinator::{ResponderOutcome, VaultStore};
use shared_types::{
    Amount, Command, CommandKind, FinalizedTransaction, LedgerState, Party, StateAndRef,
};

use crate::container::{Participant, PartyContainer};

/// Amounts used by [`run_lifecycle`].
#[derive(Debug, Clone)]
pub struct LifecyclePlan {
    /// Face value of the issued IOU.
    pub amount: i64,
    /// Partial payment made at the end.
    pub payment: i64,
    /// ISO currency code.
    pub currency: String,
}

impl Default for LifecyclePlan {
    fn default() -> Self {
        Self {
            amount: 100,
            payment: 40,
            currency: "USD".to_string(),
        }
    }
}

/// Run issue → transfer → settle and return a JSON summary.
///
/// `lender` issues to `borrower`, transfers the IOU to `new_lender`, then
/// `borrower` pays part of it off.
pub async fn run_lifecycle(
    container: &PartyContainer,
    lender: &Arc<Participant>,
    borrower: &Arc<Participant>,
    new_lender: &Arc<Participant>,
    plan: &LifecyclePlan,
) -> Result<Value> {
    let engine = ContractEngine::new();
    let arbiter = container.arbiter.party();
    let mut steps = Vec::new();

    // Issue
    let iou = LedgerState::new(
        Amount::new(plan.amount, plan.currency.clone()),
        lender.party.clone(),
        borrower.party.clone(),
    );
    let proposal = TransactionBuilder::new(arbiter.clone())
        .with_command(Command::new(CommandKind::Issue, iou.participant_keys()))
        .with_output(iou)
        .verify_and_build(&engine)
        .context("issue proposal rejected")?;
    let issued = lender.coordinator.run(proposal).await.context("issue flow failed")?;
    await_commit(&[borrower]).await?;
    steps.push(step_summary("issue", &lender.party, &issued));
    let current = single_output(&issued)?;

    // Transfer
    let transferred_state = current.state.with_new_lender(new_lender.party.clone());
    let signers = current
        .state
        .participant_keys()
        .into_iter()
        .chain([new_lender.party.owning_key]);
    let proposal = TransactionBuilder::new(arbiter.clone())
        .with_command(Command::new(CommandKind::Transfer, signers))
        .with_input(current)
        .with_output(transferred_state)
        .verify_and_build(&engine)
        .context("transfer proposal rejected")?;
    let transferred = lender
        .coordinator
        .run(proposal)
        .await
        .context("transfer flow failed")?;
    await_commit(&[borrower, new_lender]).await?;
    steps.push(step_summary("transfer", &lender.party, &transferred));
    let current = single_output(&transferred)?;

    // Settle
    let payment = Amount::new(plan.payment, plan.currency.clone());
    let mut builder = TransactionBuilder::new(arbiter)
        .with_command(Command::new(
            CommandKind::Settle {
                payment: payment.clone(),
            },
            current.state.participant_keys(),
        ))
        .with_input(current.clone());
    let paid = current.state.pay(&payment)?;
    if paid.outstanding()?.quantity > 0 {
        builder = builder.with_output(paid);
    }
    let proposal = builder
        .verify_and_build(&engine)
        .context("settle proposal rejected")?;
    let settled = borrower
        .coordinator
        .run(proposal)
        .await
        .context("settle flow failed")?;
    await_commit(&[new_lender]).await?;
    steps.push(step_summary("settle", &borrower.party, &settled));

    let mut vaults = serde_json::Map::new();
    for participant in container.participants() {
        let live = participant.vault.unconsumed().await?;
        vaults.insert(
            participant.party.name.clone(),
            json!({
                "transactions": participant.vault.len(),
                "unconsumed": live.iter().map(state_summary).collect::<Vec<_>>(),
            }),
        );
    }

    info!(steps = steps.len(), "Lifecycle complete");
    Ok(json!({
        "arbiter": container.arbiter.party().name,
        "accepted": container.arbiter.accepted_count(),
        "steps": steps,
        "vaults": vaults,
    }))
}

/// Wait until each responder has finished its session.
async fn await_commit(responders: &[&Arc<Participant>]) -> Result<()> {
    for participant in responders {
        let report = participant
            .next_report()
            .await
            .context("responder stopped")?;
        match report.result? {
            ResponderOutcome::Committed(_) => {}
            other => bail!("{} did not commit: {:?}", participant.party.name, other),
        }
    }
    Ok(())
}

fn single_output(finalized: &FinalizedTransaction) -> Result<StateAndRef> {
    let mut outputs = finalized.output_refs();
    if outputs.len() != 1 {
        bail!("expected one output, found {}", outputs.len());
    }
    Ok(outputs.remove(0))
}

fn step_summary(name: &str, initiator: &Party, finalized: &FinalizedTransaction) -> Value {
    let proposal = &finalized.endorsed.proposal;
    let signers: Vec<String> = proposal
        .required_signers()
        .iter()
        .filter_map(|key| proposal.party_for_key(key))
        .map(|party| party.name.clone())
        .collect();
    json!({
        "step": name,
        "initiator": initiator.name,
        "tx_id": finalized.id().to_string(),
        "sequence": finalized.token.sequence,
        "signers": signers,
    })
}

fn state_summary(state: &StateAndRef) -> Value {
    json!({
        "ref": state.reference.to_string(),
        "lender": state.state.lender.name,
        "borrower": state.state.borrower.name,
        "amount": state.state.amount.to_string(),
        "paid": state.state.paid.to_string(),
    })
}
