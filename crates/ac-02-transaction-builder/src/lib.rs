//! # AC-02 Transaction Builder
//!
//! Assembles a [`Proposal`](shared_types::Proposal) from a command, inputs,
//! outputs and an explicit arbiter, then pre-checks it with the contract
//! engine so invalid drafts never reach the network.
//!
//! **Subsystem ID:** 2  
//! **Purity:** No network, no signing
//!
//! ## Example
//!
//! ```rust,ignore
//! use ac_02_transaction_builder::TransactionBuilder;
//!
//! let proposal = TransactionBuilder::new(arbiter)
//!     .with_command(Command::new(CommandKind::Issue, iou.participant_keys()))
//!     .with_output(iou)
//!     .verify_and_build(&engine)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod errors;

pub use builder::{build, TransactionBuilder};
pub use errors::BuildError;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
