//! Arbiter transport errors.

use thiserror::Error;

/// Failure to obtain any answer from the arbiter.
///
/// Both variants are retryable: the arbiter deduplicates by transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArbiterError {
    /// The request or response was lost.
    #[error("Arbiter transport error: {0}")]
    Transport(String),

    /// No answer within the attempt deadline.
    #[error("Arbiter did not answer within {after_ms}ms")]
    Timeout {
        /// Attempt deadline in milliseconds
        after_ms: u64,
    },
}
