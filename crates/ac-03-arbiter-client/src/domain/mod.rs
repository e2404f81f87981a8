//! Domain layer for the arbiter client.

pub mod errors;
pub mod outcome;
pub mod retry;

pub use errors::ArbiterError;
pub use outcome::NotarizationOutcome;
pub use retry::RetryPolicy;
