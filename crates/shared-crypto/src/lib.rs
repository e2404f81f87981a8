//! # Shared Crypto - Signing Primitives
//!
//! Every party and every arbiter in Accord Ledger is identified by an Ed25519
//! public key. Endorsements and arbiter acceptance tokens are Ed25519
//! signatures over a 32-byte transaction identifier.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signatures` | Ed25519 | Endorsements, arbiter tokens |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency when signing
//! - Secret keys are wiped on drop; seeds passed in are wiped on use

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use signatures::{verify_signature, Ed25519KeyPair};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
