//! Checkpoints persisted at every initiator transition.

use super::state::CoordinatorState;
use serde::{Deserialize, Serialize};
use shared_types::{EndorsedProposal, FinalizedTransaction};
use std::fmt;
use uuid::Uuid;

/// Identifier of one coordinator attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowId(pub Uuid);

impl FlowId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FlowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything needed to resume an attempt after a crash.
///
/// Sessions are not part of a checkpoint; a resumed attempt opens fresh ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Attempt id.
    pub flow_id: FlowId,
    /// State reached.
    pub state: CoordinatorState,
    /// Proposal with the signatures gathered so far.
    pub endorsed: EndorsedProposal,
    /// Present once finalized.
    pub finalized: Option<FinalizedTransaction>,
}
