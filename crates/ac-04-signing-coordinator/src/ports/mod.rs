//! Ports for the signing coordinator.

pub mod outbound;

pub use outbound::{
    CheckpointStore, IdentityService, ResponderPolicy, Session, SessionInbox, SessionOpener,
    VaultStore,
};
