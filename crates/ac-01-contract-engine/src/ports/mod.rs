//! # Ports Module
//!
//! Inbound API used by coordinators and offline auditors.

pub mod inbound;

pub use inbound::*;
