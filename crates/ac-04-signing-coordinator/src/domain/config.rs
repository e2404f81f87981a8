//! Coordinator configuration.

use ac_03_arbiter_client::RetryPolicy;
use std::time::Duration;

/// Coordinator configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Deadline for collecting every endorsement (one deadline for all sessions)
    pub endorsement_timeout: Duration,
    /// How long a responder waits for the finalized transaction after endorsing
    pub finality_timeout: Duration,
    /// Verify the contract before sending anything (disable only to test responders)
    pub verify_before_send: bool,
    /// Arbiter submission retries
    pub arbiter_retry: RetryPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            endorsement_timeout: Duration::from_secs(30),
            finality_timeout: Duration::from_secs(60),
            verify_before_send: true,
            arbiter_retry: RetryPolicy::default(),
        }
    }
}
