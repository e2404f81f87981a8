//! # Party Container
//!
//! Holds the shared arbiter and network plus one fully wired participant per
//! identity, with dependency injection of every coordinator port.

pub mod config;
pub mod parties;

pub use config::{ConfigError, NodeConfig};
pub use parties::{NodeCoordinator, Participant, PartyContainer};
