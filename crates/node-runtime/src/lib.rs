//! # Node Runtime Library
//!
//! This library exposes the internal modules of the node runtime for testing.
//! The main entry point is the `main.rs` binary.
//!
//! ## Architectural Patterns
//!
//! - **Hexagonal Architecture**: every coordinator port is injected here
//! - **One coordinator per party**: the same instance initiates and responds
//! - **Shared arbiter**: a single uniqueness service orders all commits

#![warn(missing_docs)]

pub mod container;
pub mod lifecycle;

pub use container::{ConfigError, NodeConfig, NodeCoordinator, Participant, PartyContainer};
pub use lifecycle::{run_lifecycle, LifecyclePlan};
