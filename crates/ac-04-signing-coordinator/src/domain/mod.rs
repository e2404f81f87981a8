//! Domain layer: protocol states, messages, checkpoints and errors.

pub mod checkpoint;
pub mod config;
pub mod errors;
pub mod messages;
pub mod state;

pub use checkpoint::{Checkpoint, FlowId};
pub use config::CoordinatorConfig;
pub use errors::{ProtocolError, TimeoutStage};
pub use messages::{
    AbortNotice, EndorsementResponse, FinalizedMessage, ProposalMessage, RejectionResponse,
    SessionMessage,
};
pub use state::{AbortReason, CoordinatorState, ResponderOutcome};
