//! # Integration Tests
//!
//! Multi-party flows over the in-memory network and arbiter.

pub mod contracts;
pub mod recovery;
pub mod scenarios;
