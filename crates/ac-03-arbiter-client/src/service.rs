//! # Retrying Submission
//!
//! Arbiter transport failures and timeouts are retried with bounded
//! exponential backoff. Safe because the arbiter deduplicates by
//! transaction id. Outcomes (including `Conflict`) are returned as-is.

use crate::domain::{ArbiterError, NotarizationOutcome, RetryPolicy};
use crate::ports::ArbiterClient;
use shared_types::EndorsedProposal;
use tracing::{debug, warn};

/// Submit with retries. Returns the last error once attempts are exhausted.
pub async fn notarize_with_retry<C>(
    client: &C,
    endorsed: &EndorsedProposal,
    policy: &RetryPolicy,
) -> Result<NotarizationOutcome, ArbiterError>
where
    C: ArbiterClient + ?Sized,
{
    let tx_id = endorsed.id();
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        debug!(tx_id = %tx_id, attempt, "Submitting to arbiter");
        let error = match tokio::time::timeout(policy.attempt_timeout, client.notarize(endorsed))
            .await
        {
            Ok(Ok(outcome)) => return Ok(outcome),
            Ok(Err(e)) => e,
            Err(_) => ArbiterError::Timeout {
                after_ms: policy.attempt_timeout.as_millis() as u64,
            },
        };

        if attempt >= attempts {
            warn!(tx_id = %tx_id, attempts, error = %error, "Arbiter retries exhausted");
            return Err(error);
        }

        let delay = policy.backoff_for(attempt);
        warn!(
            tx_id = %tx_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Arbiter submission failed, backing off"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
