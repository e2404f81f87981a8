//! In-memory checkpoint store.
//!
//! Checkpoints are stored bincode-encoded, exactly as a durable store would
//! persist them. Only the latest version of each flow is kept unless the
//! store was built with [`InMemoryCheckpointStore::with_history`].

use crate::domain::{Checkpoint, CoordinatorState, FlowId, ProtocolError};
use crate::ports::CheckpointStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::trace;

#[derive(Default)]
struct FlowRecord {
    latest: Vec<u8>,
    /// Every state saved, when history is tracked.
    states: Vec<CoordinatorState>,
}

/// Checkpoints held in process memory.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    flows: RwLock<HashMap<FlowId, FlowRecord>>,
    track_history: bool,
}

impl InMemoryCheckpointStore {
    /// Empty store keeping one checkpoint per flow.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store that also records every state each flow passed through.
    pub fn with_history() -> Self {
        Self {
            track_history: true,
            ..Self::default()
        }
    }

    /// States saved for `flow_id`, oldest first.
    ///
    /// Without history tracking this is at most the latest state.
    pub fn history(&self, flow_id: &FlowId) -> Vec<CoordinatorState> {
        let flows = self.flows.read();
        let Some(record) = flows.get(flow_id) else {
            return Vec::new();
        };
        if self.track_history {
            return record.states.clone();
        }
        bincode::deserialize::<Checkpoint>(&record.latest)
            .map(|checkpoint| vec![checkpoint.state])
            .unwrap_or_default()
    }

    /// Number of flows with at least one checkpoint.
    pub fn flow_count(&self) -> usize {
        self.flows.read().len()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), ProtocolError> {
        let bytes =
            bincode::serialize(checkpoint).map_err(|e| ProtocolError::Checkpoint(e.to_string()))?;
        trace!(flow_id = %checkpoint.flow_id, state = %checkpoint.state, bytes = bytes.len(), "checkpoint");
        let mut flows = self.flows.write();
        let record = flows.entry(checkpoint.flow_id).or_default();
        record.latest = bytes;
        if self.track_history {
            record.states.push(checkpoint.state.clone());
        }
        Ok(())
    }

    async fn load(&self, flow_id: &FlowId) -> Result<Option<Checkpoint>, ProtocolError> {
        let flows = self.flows.read();
        match flows.get(flow_id) {
            Some(record) => bincode::deserialize(&record.latest)
                .map(Some)
                .map_err(|e| ProtocolError::Checkpoint(e.to_string())),
            None => Ok(None),
        }
    }
}
