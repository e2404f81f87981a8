//! Fault-injecting arbiter wrapper for exercising retry paths.

use crate::domain::{ArbiterError, NotarizationOutcome};
use crate::ports::ArbiterClient;
use async_trait::async_trait;
use shared_types::EndorsedProposal;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::warn;

/// How an injected failure manifests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureMode {
    /// Return a transport error immediately.
    Transport,
    /// Never answer; the caller's deadline has to fire.
    Hang,
    /// Forward to the inner arbiter, then lose the answer.
    LoseResponse,
}

/// Fails the first `failures` submissions, then delegates to `inner`.
pub struct FlakyArbiter<A> {
    inner: A,
    failures: u32,
    mode: FailureMode,
    calls: AtomicU32,
}

impl<A: ArbiterClient> FlakyArbiter<A> {
    /// Wrap `inner`, injecting `failures` failures of kind `mode`.
    pub fn new(inner: A, failures: u32, mode: FailureMode) -> Self {
        Self {
            inner,
            failures,
            mode,
            calls: AtomicU32::new(0),
        }
    }

    /// Submissions seen so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The wrapped arbiter.
    pub fn inner(&self) -> &A {
        &self.inner
    }
}

#[async_trait]
impl<A: ArbiterClient> ArbiterClient for FlakyArbiter<A> {
    async fn notarize(
        &self,
        endorsed: &EndorsedProposal,
    ) -> Result<NotarizationOutcome, ArbiterError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call > self.failures {
            return self.inner.notarize(endorsed).await;
        }

        warn!(tx_id = %endorsed.id(), call, mode = ?self.mode, "Injecting arbiter failure");
        match self.mode {
            FailureMode::Transport => Err(ArbiterError::Transport(format!(
                "injected failure {} of {}",
                call, self.failures
            ))),
            FailureMode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ArbiterError::Transport("hung request abandoned".to_string()))
            }
            FailureMode::LoseResponse => {
                let _ = self.inner.notarize(endorsed).await;
                Err(ArbiterError::Transport("response lost".to_string()))
            }
        }
    }
}
