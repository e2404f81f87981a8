//! # AC-04 Signing Coordinator
//!
//! Resumable, message-driven protocol that gathers every required
//! endorsement, obtains the arbiter's acceptance and finalizes the
//! transaction at every participant. Nothing is committed anywhere unless
//! the arbiter accepted.
//!
//! **Subsystem ID:** 4  
//! **Architecture:** Hexagonal (Domain + Ports + Adapters + Service)
//!
//! ## Initiator
//!
//! ```text
//! Built ──sign──→ LocallySigned ──send──→ AwaitingEndorsements ──all──→ FullyEndorsed
//!                                                │                            │
//!                                  rejection/timeout                    submit│
//!                                                ↓                            ↓
//!                                        Aborted(reason) ←──conflict── AwaitingArbiter
//!                                                                             │accepted
//!                                                                             ↓
//!                                                                         Finalized
//! ```
//!
//! ## Responder
//!
//! 1. Re-verify the contract independently
//! 2. Apply the [`ResponderPolicy`]
//! 3. Endorse, or reject with the violated rule
//! 4. Record the finalized transaction, or discard on abort
//!
//! ## Failure Semantics
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Local contract violation | Returned synchronously, no session opened |
//! | Remote rejection | Attempt aborted, every session notified |
//! | Endorsement timeout | Attempt aborted, every session notified |
//! | Arbiter transport/timeout | Retried with backoff; then left in `AwaitingArbiter` for `resume` |
//! | Arbiter conflict | Attempt aborted, never retried |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{
    ChannelSession, InMemoryCheckpointStore, InMemoryNetwork, InMemoryVault, IouResponderPolicy,
    LocalKeyVault, NetworkOpener,
};
pub use domain::{
    AbortNotice, AbortReason, Checkpoint, CoordinatorConfig, CoordinatorState,
    EndorsementResponse, FinalizedMessage, FlowId, ProposalMessage, ProtocolError,
    RejectionResponse, ResponderOutcome, SessionMessage, TimeoutStage,
};
pub use ports::{
    CheckpointStore, IdentityService, ResponderPolicy, Session, SessionInbox, SessionOpener,
    VaultStore,
};
pub use service::{ResponderHandle, ResponderReport, ResponderService, SigningCoordinator};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
