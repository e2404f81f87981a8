//! Accept loop running one responder task per inbound session.

use super::SigningCoordinator;
use crate::domain::{ProtocolError, ResponderOutcome};
use crate::ports::{CheckpointStore, IdentityService, SessionInbox, SessionOpener, VaultStore};
use ac_03_arbiter_client::ArbiterClient;
use shared_types::Party;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result of one responder task.
#[derive(Debug)]
pub struct ResponderReport {
    /// Party that opened the session.
    pub initiator: Party,
    /// How the session ended.
    pub result: Result<ResponderOutcome, ProtocolError>,
}

/// Handle to a running accept loop.
pub struct ResponderHandle {
    task: JoinHandle<()>,
    reports: mpsc::UnboundedReceiver<ResponderReport>,
}

impl ResponderHandle {
    /// Wait for the next finished session.
    pub async fn next_report(&mut self) -> Option<ResponderReport> {
        self.reports.recv().await
    }

    /// Stop accepting sessions. Running responder tasks are not cancelled.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Spawns the accept loop for a coordinator.
pub struct ResponderService;

impl ResponderService {
    /// Answer every session arriving on `inbox` until it closes.
    pub fn spawn<I, N, A, V, C>(
        coordinator: Arc<SigningCoordinator<I, N, A, V, C>>,
        mut inbox: SessionInbox,
    ) -> ResponderHandle
    where
        I: IdentityService + 'static,
        N: SessionOpener + 'static,
        A: ArbiterClient + 'static,
        V: VaultStore + 'static,
        C: CheckpointStore + 'static,
    {
        let (report_tx, reports) = mpsc::unbounded_channel();
        let party = coordinator.party().name.clone();

        let task = tokio::spawn(async move {
            info!(party = %party, "Responder listening");
            while let Some(session) = inbox.recv().await {
                let coordinator = Arc::clone(&coordinator);
                let report_tx = report_tx.clone();
                tokio::spawn(async move {
                    let initiator = session.counterparty().clone();
                    let result = coordinator.respond(session).await;
                    match &result {
                        Ok(outcome) => debug!(
                            party = %coordinator.party().name,
                            from = %initiator.name,
                            outcome = outcome_name(outcome),
                            "Session finished"
                        ),
                        Err(e) => warn!(
                            party = %coordinator.party().name,
                            from = %initiator.name,
                            error = %e,
                            "Session failed"
                        ),
                    }
                    let _ = report_tx.send(ResponderReport { initiator, result });
                });
            }
            debug!(party = %party, "Responder inbox closed");
        });

        ResponderHandle { task, reports }
    }
}

fn outcome_name(outcome: &ResponderOutcome) -> &'static str {
    match outcome {
        ResponderOutcome::Committed(_) => "committed",
        ResponderOutcome::Rejected { .. } => "rejected",
        ResponderOutcome::Aborted { .. } => "aborted",
    }
}
