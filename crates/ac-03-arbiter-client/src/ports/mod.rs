//! Ports for the arbiter client.

pub mod outbound;

pub use outbound::ArbiterClient;
