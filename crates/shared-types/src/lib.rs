//! # Shared Types Crate
//!
//! This crate contains the ledger state model and the transaction types that
//! travel between parties and the arbiter.
//!
//! ## Design Principles
//!
//! - **Immutable Facts**: A `LedgerState` is never mutated in place; evolving
//!   a fact produces a new value linked by the same `linear_id`.
//! - **Content Addressing**: A proposal's `TxId` is a digest over a canonical
//!   encoding of every field, so any party can recompute it independently.
//! - **Signatures Over Ids**: Endorsements and arbiter tokens sign the 32 id
//!   bytes, never a serializer-dependent encoding.

pub mod entities;
pub mod errors;
pub mod transaction;

pub use entities::*;
pub use errors::*;
pub use transaction::*;
