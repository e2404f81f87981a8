//! Adapters implementing the arbiter port.

pub mod flaky;
pub mod in_memory;

pub use flaky::{FailureMode, FlakyArbiter};
pub use in_memory::InMemoryArbiter;
