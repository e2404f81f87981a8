//! Initiator side of the protocol.
//!
//! Every transition is checkpointed before the next suspension point. The
//! sessions of an attempt live only in memory; a resumed attempt opens
//! fresh ones.

use super::SigningCoordinator;
use crate::domain::{
    AbortNotice, AbortReason, Checkpoint, CoordinatorState, FinalizedMessage, FlowId,
    ProposalMessage, ProtocolError, SessionMessage, TimeoutStage,
};
use crate::ports::{CheckpointStore, IdentityService, Session, SessionOpener, VaultStore};
use ac_03_arbiter_client::{notarize_with_retry, ArbiterClient, ArbiterError, NotarizationOutcome};
use futures::stream::{FuturesUnordered, StreamExt};
use shared_types::{
    EndorsedProposal, EndorsementError, FinalizedTransaction, Party, PartyKey, Proposal,
    TransactionSignature, TxId,
};
use std::collections::BTreeSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

/// In-memory side of one attempt.
struct Attempt {
    checkpoint: Checkpoint,
    sessions: Vec<Box<dyn Session>>,
}

impl Attempt {
    fn tx_id(&self) -> TxId {
        self.checkpoint.endorsed.id()
    }

    fn flow_id(&self) -> FlowId {
        self.checkpoint.flow_id
    }
}

fn endorsement_error(error: EndorsementError) -> ProtocolError {
    match error {
        EndorsementError::NotARequiredSigner(key) => ProtocolError::NotARequiredSigner(key),
        EndorsementError::AlreadyFullyEndorsed => ProtocolError::InvalidTransition {
            from: CoordinatorState::FullyEndorsed.to_string(),
            to: CoordinatorState::FullyEndorsed.to_string(),
        },
    }
}

/// Whether `error` raised in `state` ends the attempt.
///
/// Once submitted, only a definitive arbiter verdict aborts: the arbiter
/// may already have accepted the transaction.
fn should_abort(state: &CoordinatorState, error: &ProtocolError) -> bool {
    match state {
        CoordinatorState::AwaitingArbiter => matches!(
            error,
            ProtocolError::NotaryConflict { .. }
                | ProtocolError::InvalidSignatures { .. }
                | ProtocolError::MisalignedTime
        ),
        other => !other.is_terminal(),
    }
}

impl<I, N, A, V, C> SigningCoordinator<I, N, A, V, C>
where
    I: IdentityService,
    N: SessionOpener,
    A: ArbiterClient,
    V: VaultStore,
    C: CheckpointStore,
{
    /// Drive a new attempt to finality.
    pub async fn run(&self, proposal: Proposal) -> Result<FinalizedTransaction, ProtocolError> {
        self.run_flow(FlowId::new(), proposal).await
    }

    /// Drive a new attempt under a caller-chosen flow id.
    ///
    /// Local failures are returned before anything is checkpointed or sent.
    pub async fn run_flow(
        &self,
        flow_id: FlowId,
        proposal: Proposal,
    ) -> Result<FinalizedTransaction, ProtocolError> {
        let tx_id = proposal.id();

        if self.config.verify_before_send {
            if let Err(e) = self.engine.verify(&proposal) {
                warn!(flow_id = %flow_id, tx_id = %tx_id, error = %e, "Proposal rejected locally");
                return Err(e.into());
            }
        }

        let required = proposal.required_signers();
        if !required.contains(&self.me.owning_key) {
            return Err(ProtocolError::NotARequiredSigner(self.me.owning_key));
        }
        // Only counterparties need resolving; the initiator signs for itself.
        if let Some(unknown) = required
            .iter()
            .filter(|key| **key != self.me.owning_key)
            .find(|key| proposal.party_for_key(key).is_none())
        {
            return Err(ProtocolError::UnknownSigner(*unknown));
        }

        let mut attempt = Attempt {
            checkpoint: Checkpoint {
                flow_id,
                state: CoordinatorState::Built,
                endorsed: EndorsedProposal::new(proposal),
                finalized: None,
            },
            sessions: Vec::new(),
        };
        self.checkpoints.save(&attempt.checkpoint).await?;
        info!(
            flow_id = %flow_id,
            tx_id = %tx_id,
            party = %self.me.name,
            signers = required.len(),
            "Starting flow"
        );

        self.drive(&mut attempt).await
    }

    /// Continue an attempt from its last checkpoint.
    ///
    /// Finalized attempts return the stored result and aborted ones the
    /// recorded abort. Attempts that reached the arbiter resubmit (safe, the
    /// arbiter deduplicates) and re-broadcast finality. Earlier attempts
    /// collect endorsements again over fresh sessions.
    pub async fn resume(&self, flow_id: FlowId) -> Result<FinalizedTransaction, ProtocolError> {
        let checkpoint = self
            .checkpoints
            .load(&flow_id)
            .await?
            .ok_or_else(|| ProtocolError::Checkpoint(format!("no checkpoint for flow {}", flow_id)))?;
        info!(flow_id = %flow_id, state = %checkpoint.state, "Resuming flow");

        let mut attempt = Attempt {
            checkpoint,
            sessions: Vec::new(),
        };
        self.drive(&mut attempt).await
    }

    async fn drive(&self, attempt: &mut Attempt) -> Result<FinalizedTransaction, ProtocolError> {
        match self.step(attempt).await {
            Ok(finalized) => Ok(finalized),
            Err(error) => {
                if should_abort(&attempt.checkpoint.state, &error) {
                    self.abort(attempt, &error).await;
                } else if error.is_retryable() {
                    warn!(
                        flow_id = %attempt.flow_id(),
                        tx_id = %attempt.tx_id(),
                        state = %attempt.checkpoint.state,
                        error = %error,
                        "Flow suspended; resume later"
                    );
                }
                Err(error)
            }
        }
    }

    async fn step(&self, attempt: &mut Attempt) -> Result<FinalizedTransaction, ProtocolError> {
        loop {
            match attempt.checkpoint.state.clone() {
                CoordinatorState::Built => {
                    self.sign_locally(attempt)?;
                    self.advance(attempt, CoordinatorState::LocallySigned).await?;
                }
                CoordinatorState::LocallySigned => self.collect_endorsements(attempt).await?,
                CoordinatorState::AwaitingEndorsements => {
                    debug!(flow_id = %attempt.flow_id(), "Discarding endorsements from lost sessions");
                    attempt.checkpoint.endorsed.clear_signatures();
                    self.sign_locally(attempt)?;
                    self.advance(attempt, CoordinatorState::LocallySigned).await?;
                }
                CoordinatorState::FullyEndorsed => {
                    self.advance(attempt, CoordinatorState::AwaitingArbiter).await?;
                }
                CoordinatorState::AwaitingArbiter => return self.notarize(attempt).await,
                CoordinatorState::Finalized => {
                    return attempt.checkpoint.finalized.clone().ok_or_else(|| {
                        ProtocolError::Checkpoint("finalized without a transaction".to_string())
                    })
                }
                CoordinatorState::Aborted(reason) => return Err(reason.into()),
            }
        }
    }

    async fn advance(
        &self,
        attempt: &mut Attempt,
        next: CoordinatorState,
    ) -> Result<(), ProtocolError> {
        let from = &attempt.checkpoint.state;
        if !from.can_transition_to(&next) {
            return Err(ProtocolError::InvalidTransition {
                from: from.to_string(),
                to: next.to_string(),
            });
        }
        info!(
            flow_id = %attempt.flow_id(),
            tx_id = %attempt.tx_id(),
            from = %from,
            to = %next,
            "Coordinator transition"
        );
        attempt.checkpoint.state = next;
        self.checkpoints.save(&attempt.checkpoint).await
    }

    fn sign_locally(&self, attempt: &mut Attempt) -> Result<(), ProtocolError> {
        let tx_id = attempt.tx_id();
        let signature = self.identity.sign(tx_id.as_bytes(), &self.me.owning_key)?;
        attempt
            .checkpoint
            .endorsed
            .add_signature(signature)
            .map_err(endorsement_error)
    }

    // =========================================================================
    // ENDORSEMENT COLLECTION
    // =========================================================================

    async fn collect_endorsements(&self, attempt: &mut Attempt) -> Result<(), ProtocolError> {
        let tx_id = attempt.tx_id();
        let proposal = attempt.checkpoint.endorsed.proposal.clone();
        let counterparties = attempt
            .checkpoint
            .endorsed
            .missing_signers()
            .iter()
            .map(|key| {
                proposal
                    .party_for_key(key)
                    .cloned()
                    .ok_or(ProtocolError::UnknownSigner(*key))
            })
            .collect::<Result<Vec<Party>, _>>()?;

        if counterparties.is_empty() {
            return self.advance(attempt, CoordinatorState::FullyEndorsed).await;
        }

        let initiator_signature = *attempt
            .checkpoint
            .endorsed
            .signature_of(&self.me.owning_key)
            .ok_or_else(|| ProtocolError::Signing("own signature missing".to_string()))?;
        let request = SessionMessage::Proposal(ProposalMessage {
            flow_id: attempt.flow_id(),
            proposal,
            initiator_signature,
        });

        for party in &counterparties {
            let session = self.network.open(party).await?;
            attempt.sessions.push(session);
            if let Some(session) = attempt.sessions.last() {
                session.send(request.clone()).await?;
            }
            debug!(tx_id = %tx_id, to = %party.name, "Proposal sent");
        }
        self.advance(attempt, CoordinatorState::AwaitingEndorsements).await?;

        let deadline = Instant::now() + self.config.endorsement_timeout;
        let mut pending: FuturesUnordered<_> = attempt
            .sessions
            .iter()
            .map(|session| async move {
                let received = session.receive().await;
                (session.counterparty().clone(), received)
            })
            .collect();

        loop {
            let (party, received) = match timeout_at(deadline, pending.next()).await {
                Ok(Some(response)) => response,
                Ok(None) => break,
                Err(_) => {
                    warn!(tx_id = %tx_id, outstanding = pending.len(), "Endorsement deadline passed");
                    return Err(ProtocolError::Timeout {
                        stage: TimeoutStage::Endorsement,
                    });
                }
            };
            let signature = self.check_response(&tx_id, &party, received?)?;
            attempt
                .checkpoint
                .endorsed
                .add_signature(signature)
                .map_err(endorsement_error)?;
            debug!(tx_id = %tx_id, from = %party.name, "Endorsement received");
        }
        drop(pending);

        if !attempt.checkpoint.endorsed.is_fully_endorsed() {
            return Err(ProtocolError::InvalidSignatures {
                missing: attempt.checkpoint.endorsed.missing_signers(),
            });
        }
        self.advance(attempt, CoordinatorState::FullyEndorsed).await
    }

    fn check_response(
        &self,
        tx_id: &TxId,
        party: &Party,
        message: SessionMessage,
    ) -> Result<TransactionSignature, ProtocolError> {
        match message {
            SessionMessage::Endorsement(response) => {
                let valid = response.tx_id == *tx_id
                    && self
                        .identity
                        .verify(tx_id.as_bytes(), &response.signature, &party.owning_key);
                if !valid {
                    warn!(tx_id = %tx_id, from = %party.name, "Invalid endorsement signature");
                    return Err(ProtocolError::Rejected {
                        remote_party: party.name.clone(),
                        reason: "invalid endorsement signature".to_string(),
                    });
                }
                Ok(response.signature)
            }
            SessionMessage::Rejection(rejection) => {
                warn!(tx_id = %tx_id, from = %party.name, reason = %rejection.reason, "Endorsement refused");
                Err(ProtocolError::Rejected {
                    remote_party: party.name.clone(),
                    reason: rejection.reason,
                })
            }
            other => Err(ProtocolError::UnexpectedMessage {
                from: party.name.clone(),
                received: other.kind(),
            }),
        }
    }

    // =========================================================================
    // ARBITER AND FINALITY
    // =========================================================================

    async fn notarize(&self, attempt: &mut Attempt) -> Result<FinalizedTransaction, ProtocolError> {
        let tx_id = attempt.tx_id();
        let endorsed = attempt.checkpoint.endorsed.clone();

        let outcome = notarize_with_retry(
            self.arbiter.as_ref(),
            &endorsed,
            &self.config.arbiter_retry,
        )
        .await
        .map_err(|e| match e {
            ArbiterError::Timeout { .. } => ProtocolError::Timeout {
                stage: TimeoutStage::Arbiter,
            },
            other => ProtocolError::ArbiterUnavailable(other),
        })?;

        let token = match outcome {
            NotarizationOutcome::Accepted(token) => token,
            NotarizationOutcome::Conflict {
                conflicting_tx_id,
                state_ref,
            } => {
                error!(
                    flow_id = %attempt.flow_id(),
                    tx_id = %tx_id,
                    conflicting_tx_id = %conflicting_tx_id,
                    state_ref = %state_ref,
                    "Input already consumed"
                );
                return Err(ProtocolError::NotaryConflict { conflicting_tx_id });
            }
            NotarizationOutcome::InvalidSignatures { missing } => {
                return Err(ProtocolError::InvalidSignatures { missing })
            }
            NotarizationOutcome::MisalignedTime => return Err(ProtocolError::MisalignedTime),
        };

        let finalized = FinalizedTransaction { endorsed, token };
        self.vault.record(&finalized).await?;
        self.broadcast_finality(attempt, &finalized).await;

        attempt.checkpoint.finalized = Some(finalized.clone());
        self.advance(attempt, CoordinatorState::Finalized).await?;
        info!(
            flow_id = %attempt.flow_id(),
            tx_id = %tx_id,
            sequence = token.sequence,
            "Transaction finalized"
        );
        Ok(finalized)
    }

    /// Send the finalized transaction to every other participant.
    ///
    /// Failures are logged only: the transaction is already committed.
    async fn broadcast_finality(&self, attempt: &mut Attempt, finalized: &FinalizedTransaction) {
        let proposal = &finalized.endorsed.proposal;
        let recipients: BTreeSet<PartyKey> = proposal
            .required_signers()
            .into_iter()
            .chain(
                proposal
                    .inputs
                    .iter()
                    .map(|i| &i.state)
                    .chain(proposal.outputs.iter())
                    .flat_map(|s| s.participant_keys()),
            )
            .filter(|key| *key != self.me.owning_key)
            .collect();

        let message = SessionMessage::Finalized(FinalizedMessage {
            finalized: finalized.clone(),
        });

        for key in recipients {
            let existing = attempt
                .sessions
                .iter()
                .position(|s| s.counterparty().owning_key == key);
            let index = match existing {
                Some(index) => index,
                None => {
                    let Some(party) = proposal.party_for_key(&key) else {
                        continue;
                    };
                    match self.network.open(party).await {
                        Ok(session) => {
                            attempt.sessions.push(session);
                            attempt.sessions.len() - 1
                        }
                        Err(e) => {
                            warn!(tx_id = %finalized.id(), to = %party.name, error = %e, "Cannot reach participant");
                            continue;
                        }
                    }
                }
            };
            let session = &attempt.sessions[index];
            if let Err(e) = session.send(message.clone()).await {
                warn!(
                    tx_id = %finalized.id(),
                    to = %session.counterparty().name,
                    error = %e,
                    "Finality broadcast failed"
                );
            }
        }
    }

    async fn abort(&self, attempt: &mut Attempt, error: &ProtocolError) {
        let reason = AbortReason::from(error);
        warn!(
            flow_id = %attempt.flow_id(),
            tx_id = %attempt.tx_id(),
            state = %attempt.checkpoint.state,
            reason = %reason,
            "Aborting flow"
        );

        if let Err(e) = self
            .advance(attempt, CoordinatorState::Aborted(reason))
            .await
        {
            error!(flow_id = %attempt.flow_id(), error = %e, "Could not record abort");
        }

        let notice = SessionMessage::Abort(AbortNotice {
            tx_id: attempt.tx_id(),
            reason: error.to_string(),
        });
        for session in &attempt.sessions {
            if let Err(e) = session.send(notice.clone()).await {
                debug!(to = %session.counterparty().name, error = %e, "Abort notice not delivered");
            }
        }
    }
}
