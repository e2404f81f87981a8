//! Responder side of the protocol.
//!
//! A responder trusts nothing it receives: it re-verifies the contract, the
//! initiator's authority and signature, and the arbiter token before
//! recording anything.

use super::SigningCoordinator;
use crate::domain::{
    EndorsementResponse, ProposalMessage, ProtocolError, RejectionResponse, ResponderOutcome,
    SessionMessage, TimeoutStage,
};
use crate::ports::{CheckpointStore, IdentityService, Session, SessionOpener, VaultStore};
use ac_03_arbiter_client::ArbiterClient;
use shared_types::{ArbiterToken, FinalizedTransaction, Party, Proposal, TransactionSignature, TxId};
use std::collections::BTreeSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

impl<I, N, A, V, C> SigningCoordinator<I, N, A, V, C>
where
    I: IdentityService,
    N: SessionOpener,
    A: ArbiterClient,
    V: VaultStore,
    C: CheckpointStore,
{
    /// Answer one inbound session.
    ///
    /// A session usually opens with a proposal. A session that opens with a
    /// finalized transaction is a re-broadcast from a resumed initiator and
    /// is recorded directly after verification.
    pub async fn respond(
        &self,
        session: Box<dyn Session>,
    ) -> Result<ResponderOutcome, ProtocolError> {
        let initiator = session.counterparty().clone();
        let first = timeout(self.config.endorsement_timeout, session.receive())
            .await
            .map_err(|_| ProtocolError::Timeout {
                stage: TimeoutStage::Endorsement,
            })??;

        match first {
            SessionMessage::Proposal(request) => {
                self.endorse(session.as_ref(), &initiator, request).await
            }
            SessionMessage::Finalized(message) => {
                let finalized = message.finalized;
                self.engine.verify(&finalized.endorsed.proposal)?;
                self.accept_finalized(&finalized, None).await?;
                info!(
                    party = %self.me.name,
                    tx_id = %finalized.id(),
                    from = %initiator.name,
                    "Recorded late finality"
                );
                Ok(ResponderOutcome::Committed(Box::new(finalized)))
            }
            other => Err(ProtocolError::UnexpectedMessage {
                from: initiator.name,
                received: other.kind(),
            }),
        }
    }

    async fn endorse(
        &self,
        session: &dyn Session,
        initiator: &Party,
        request: ProposalMessage,
    ) -> Result<ResponderOutcome, ProtocolError> {
        let proposal = request.proposal;
        let tx_id = proposal.id();
        debug!(
            party = %self.me.name,
            flow_id = %request.flow_id,
            tx_id = %tx_id,
            from = %initiator.name,
            "Proposal received"
        );

        if let Err(reason) = self.vet(&proposal, initiator, &request.initiator_signature, &tx_id) {
            warn!(party = %self.me.name, tx_id = %tx_id, reason = %reason, "Refusing to endorse");
            session
                .send(SessionMessage::Rejection(RejectionResponse {
                    tx_id,
                    reason: reason.clone(),
                }))
                .await?;
            return Ok(ResponderOutcome::Rejected { reason });
        }

        let signature = self.identity.sign(tx_id.as_bytes(), &self.me.owning_key)?;
        session
            .send(SessionMessage::Endorsement(EndorsementResponse { tx_id, signature }))
            .await?;
        debug!(party = %self.me.name, tx_id = %tx_id, "Endorsement sent");

        let next = match timeout(self.config.finality_timeout, session.receive()).await {
            Ok(received) => received?,
            Err(_) => {
                warn!(party = %self.me.name, tx_id = %tx_id, "No finality before deadline; discarding");
                return Err(ProtocolError::Timeout {
                    stage: TimeoutStage::Finality,
                });
            }
        };

        match next {
            SessionMessage::Finalized(message) => {
                self.accept_finalized(&message.finalized, Some(tx_id)).await?;
                info!(party = %self.me.name, tx_id = %tx_id, "Transaction committed");
                Ok(ResponderOutcome::Committed(Box::new(message.finalized)))
            }
            SessionMessage::Abort(notice) => {
                info!(party = %self.me.name, tx_id = %tx_id, reason = %notice.reason, "Initiator aborted");
                Ok(ResponderOutcome::Aborted {
                    reason: notice.reason,
                })
            }
            other => Err(ProtocolError::UnexpectedMessage {
                from: initiator.name.clone(),
                received: other.kind(),
            }),
        }
    }

    /// Contract, authority and policy checks. `Err` carries the reason
    /// sent back to the initiator.
    fn vet(
        &self,
        proposal: &Proposal,
        initiator: &Party,
        initiator_signature: &TransactionSignature,
        tx_id: &TxId,
    ) -> Result<(), String> {
        let required = proposal.required_signers();
        if !required.contains(&self.me.owning_key) {
            return Err(format!("{} is not a required signer", self.me.name));
        }
        if !required.contains(&initiator.owning_key) {
            return Err(format!("{} is not a required signer", initiator.name));
        }
        if !self
            .identity
            .verify(tx_id.as_bytes(), initiator_signature, &initiator.owning_key)
        {
            return Err("invalid initiator signature".to_string());
        }

        self.engine
            .verify(proposal)
            .map_err(|e| e.violated_rules().join("; "))?;

        self.policy.check(proposal, &self.me)
    }

    /// Verify a finalized transaction and record it.
    async fn accept_finalized(
        &self,
        finalized: &FinalizedTransaction,
        expected: Option<TxId>,
    ) -> Result<(), ProtocolError> {
        let tx_id = finalized.id();
        if expected.is_some_and(|expected| expected != tx_id) {
            return Err(ProtocolError::UnexpectedMessage {
                from: "initiator".to_string(),
                received: "Finalized (different transaction)",
            });
        }

        let proposal = &finalized.endorsed.proposal;
        let token = &finalized.token;
        let arbiter_key = proposal.arbiter.owning_key;
        let token_valid = token.tx_id == tx_id
            && token.arbiter == arbiter_key
            && self.identity.verify(
                &ArbiterToken::signing_payload(&tx_id, token.sequence),
                &token.signature,
                &arbiter_key,
            );
        if !token_valid {
            return Err(ProtocolError::InvalidSignatures {
                missing: BTreeSet::from([arbiter_key]),
            });
        }

        let invalid: BTreeSet<_> = proposal
            .required_signers()
            .into_iter()
            .filter(|key| match finalized.endorsed.signature_of(key) {
                Some(signature) => !self.identity.verify(tx_id.as_bytes(), signature, key),
                None => true,
            })
            .collect();
        if !invalid.is_empty() {
            return Err(ProtocolError::InvalidSignatures { missing: invalid });
        }

        self.vault.record(finalized).await
    }
}
