//! In-Memory Network
//!
//! Sessions are pairs of bounded tokio channels carrying bincode-encoded
//! [`SessionMessage`]s, so everything that crosses a session goes through
//! the same encoding a real transport would use.

use crate::domain::{ProtocolError, SessionMessage};
use crate::ports::{Session, SessionInbox, SessionOpener};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Party, PartyKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace};

/// Per-direction channel capacity.
const SESSION_BUFFER: usize = 32;

/// One end of a channel-backed session.
pub struct ChannelSession {
    counterparty: Party,
    outbound: mpsc::Sender<Vec<u8>>,
    inbound: Mutex<mpsc::Receiver<Vec<u8>>>,
}

impl ChannelSession {
    /// Connected pair: the first end talks to `b`, the second to `a`.
    pub fn pair(a: Party, b: Party) -> (ChannelSession, ChannelSession) {
        let (a_tx, b_rx) = mpsc::channel(SESSION_BUFFER);
        let (b_tx, a_rx) = mpsc::channel(SESSION_BUFFER);
        let a_end = ChannelSession {
            counterparty: b,
            outbound: a_tx,
            inbound: Mutex::new(a_rx),
        };
        let b_end = ChannelSession {
            counterparty: a,
            outbound: b_tx,
            inbound: Mutex::new(b_rx),
        };
        (a_end, b_end)
    }
}

#[async_trait]
impl Session for ChannelSession {
    fn counterparty(&self) -> &Party {
        &self.counterparty
    }

    async fn send(&self, message: SessionMessage) -> Result<(), ProtocolError> {
        trace!(to = %self.counterparty.name, kind = message.kind(), "send");
        let bytes = bincode::serialize(&message)
            .map_err(|e| ProtocolError::Transport(format!("encode failed: {}", e)))?;
        self.outbound.send(bytes).await.map_err(|_| {
            ProtocolError::Transport(format!("session closed by {}", self.counterparty.name))
        })
    }

    async fn receive(&self) -> Result<SessionMessage, ProtocolError> {
        let mut inbound = self.inbound.lock().await;
        let bytes = inbound.recv().await.ok_or_else(|| {
            ProtocolError::Transport(format!("session closed by {}", self.counterparty.name))
        })?;
        bincode::deserialize(&bytes)
            .map_err(|e| ProtocolError::Transport(format!("decode failed: {}", e)))
    }
}

/// Registry routing new sessions to each party's inbox.
#[derive(Default)]
pub struct InMemoryNetwork {
    inboxes: RwLock<HashMap<PartyKey, mpsc::UnboundedSender<Box<dyn Session>>>>,
    opened: AtomicUsize,
}

impl InMemoryNetwork {
    /// Empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `party` reachable; returns the inbox its responder drains.
    pub fn register(&self, party: &Party) -> SessionInbox {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inboxes.write().insert(party.owning_key, tx);
        debug!(party = %party.name, "Registered on network");
        rx
    }

    /// Make `key` unreachable. Existing sessions are unaffected.
    pub fn disconnect(&self, key: &PartyKey) {
        self.inboxes.write().remove(key);
    }

    /// Session opener acting as `me`.
    pub fn opener(self: &Arc<Self>, me: Party) -> NetworkOpener {
        NetworkOpener {
            network: Arc::clone(self),
            me,
        }
    }

    /// Sessions opened so far across the whole network.
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

/// Opens sessions on an [`InMemoryNetwork`] on behalf of one party.
pub struct NetworkOpener {
    network: Arc<InMemoryNetwork>,
    me: Party,
}

#[async_trait]
impl SessionOpener for NetworkOpener {
    async fn open(&self, counterparty: &Party) -> Result<Box<dyn Session>, ProtocolError> {
        let inbox = self
            .network
            .inboxes
            .read()
            .get(&counterparty.owning_key)
            .cloned()
            .ok_or_else(|| {
                ProtocolError::Transport(format!("{} is not reachable", counterparty.name))
            })?;

        let (mine, theirs) = ChannelSession::pair(self.me.clone(), counterparty.clone());
        inbox.send(Box::new(theirs)).map_err(|_| {
            ProtocolError::Transport(format!("{} is not accepting sessions", counterparty.name))
        })?;
        self.network.opened.fetch_add(1, Ordering::SeqCst);
        debug!(from = %self.me.name, to = %counterparty.name, "Session opened");
        Ok(Box::new(mine))
    }
}
