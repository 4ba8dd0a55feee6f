//! Registry of live connections and their outbound queues

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::ws::protocol::ServerMsg;

use super::PlayerId;

/// Message queued for a connection's writer task
pub type Outbound = Arc<ServerMsg>;

/// Why a message could not be queued for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Connection is not registered")]
    UnknownConnection,

    #[error("Outbound queue is full")]
    QueueFull,

    #[error("Connection writer has closed")]
    Closed,
}

impl<T> From<TrySendError<T>> for DeliveryError {
    fn from(err: TrySendError<T>) -> Self {
        match err {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => DeliveryError::Closed,
        }
    }
}

/// Connected clients keyed by id.
///
/// Sends never wait: a full or closed queue drops the message for that
/// connection only.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<PlayerId, mpsc::Sender<Outbound>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. Returns false if the id is already registered.
    pub fn register(&self, id: PlayerId, tx: mpsc::Sender<Outbound>) -> bool {
        use dashmap::mapref::entry::Entry;

        match self.connections.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(tx);
                true
            }
        }
    }

    pub fn unregister(&self, id: &PlayerId) -> bool {
        self.connections.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        self.connections.iter().map(|c| *c.key()).collect()
    }

    /// Queue a message for a single connection
    pub fn send_to(&self, id: &PlayerId, msg: Outbound) -> Result<(), DeliveryError> {
        let tx = self
            .connections
            .get(id)
            .ok_or(DeliveryError::UnknownConnection)?;
        tx.try_send(msg)?;
        Ok(())
    }

    /// Queue a message for every connection. Returns how many accepted it.
    pub fn broadcast(&self, msg: &Outbound) -> usize {
        self.broadcast_filtered(msg, None)
    }

    /// Queue a message for every connection except `excluded`
    pub fn broadcast_except(&self, excluded: &PlayerId, msg: &Outbound) -> usize {
        self.broadcast_filtered(msg, Some(excluded))
    }

    fn broadcast_filtered(&self, msg: &Outbound, excluded: Option<&PlayerId>) -> usize {
        let mut delivered = 0;

        for entry in self.connections.iter() {
            if excluded == Some(entry.key()) {
                continue;
            }

            match entry.value().try_send(Arc::clone(msg)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(player_id = %entry.key(), "Outbound queue full, dropping message");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(player_id = %entry.key(), "Outbound queue closed, skipping");
                }
            }
        }

        delivered
    }
}
