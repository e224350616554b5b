//! ConnectionRegistry: the single owner of per-connection bookkeeping.
//!
//! The registry is shared by every session task (behind an `Arc`) and guards
//! its map with a `tokio::sync::RwLock`:
//!
//! - `add`, `remove`, `begin_close` take the **write** lock.
//! - `live_set`, `get`, `len` take the **read** lock.
//! - `classify_once` reads first and only writes for a connection's first
//!   message.
//!
//! A broadcast therefore sees either the whole entry or none of it.  The hub
//! copies the live set out and releases the lock before sending anything, so
//! slow sends never hold up accepts or disconnects.
//!
//! # HashMap choice
//!
//! Iteration order is irrelevant to fan-out, and lookups by `ConnectionId`
//! happen on every inbound message, so a plain `HashMap` fits.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::classify::classify;
use crate::domain::{Category, ConnectionId, ConnectionRecord, ConnectionState, TransitionError};
use crate::relay::sink::PeerSink;

/// Errors returned by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// One entry of a live-set snapshot.
#[derive(Clone)]
pub struct LivePeer {
    pub id: ConnectionId,
    pub sink: Arc<dyn PeerSink>,
}

impl std::fmt::Debug for LivePeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivePeer").field("id", &self.id).finish_non_exhaustive()
    }
}

struct Entry {
    record: ConnectionRecord,
    sink: Arc<dyn PeerSink>,
}

/// In-memory registry of every connection the relay currently tracks.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<ConnectionId, Entry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection and marks it `Open`.
    ///
    /// The record arrives in `Connecting` (handshake done by the caller) and
    /// leaves `Open` and `Unclassified`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::DuplicateConnection`] if the identity is already
    ///   present; the existing entry is left untouched.
    /// - [`RegistryError::Transition`] if the record is not in `Connecting`.
    pub async fn add(
        &self,
        mut record: ConnectionRecord,
        sink: Arc<dyn PeerSink>,
    ) -> Result<ConnectionId, RegistryError> {
        let id = record.id();
        let mut entries = self.entries.write().await;
        if entries.contains_key(&id) {
            return Err(RegistryError::DuplicateConnection(id));
        }
        record.transition(ConnectionState::Open)?;
        entries.insert(id, Entry { record, sink });
        debug!("connection {id}: registered ({} live)", entries.len());
        Ok(id)
    }

    /// Classifies the connection from `payload` if it has not been classified
    /// yet, and returns its (possibly pre-existing) category.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownConnection`] if `id` is not registered
    /// (for example, a message racing its own disconnect).
    pub async fn classify_once(
        &self,
        id: ConnectionId,
        payload: &str,
    ) -> Result<Category, RegistryError> {
        {
            let entries = self.entries.read().await;
            let entry = entries.get(&id).ok_or(RegistryError::UnknownConnection(id))?;
            if entry.record.category().is_classified() {
                return Ok(entry.record.category());
            }
        }

        // First message: recheck under the write lock, since another caller
        // may have classified in between.
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or(RegistryError::UnknownConnection(id))?;

        if entry.record.category().is_classified() {
            return Ok(entry.record.category());
        }

        let category = entry.record.assign_category(classify(payload));
        info!("connection {id}: client type identified as {category}");
        Ok(category)
    }

    /// Marks an open connection as `Closing`.
    ///
    /// Returns `true` if the state changed.  Unknown identities and
    /// connections already closing are left alone.
    pub async fn begin_close(&self, id: ConnectionId) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&id) {
            Some(entry) if entry.record.state() == ConnectionState::Open => entry
                .record
                .transition(ConnectionState::Closing)
                .is_ok(),
            _ => false,
        }
    }

    /// Removes a connection, returning its final record (state `Closed`).
    ///
    /// Removing an unknown or already-removed identity is a no-op and
    /// returns `None`, so duplicate close/error signals are harmless.
    pub async fn remove(&self, id: ConnectionId) -> Option<ConnectionRecord> {
        let mut entries = self.entries.write().await;
        let Entry { mut record, .. } = entries.remove(&id)?;
        // Open → Closed and Closing → Closed are both legal; a record in the
        // map is never already Closed.
        let _ = record.transition(ConnectionState::Closed);
        debug!("connection {id}: unregistered ({} live)", entries.len());
        Some(record)
    }

    /// Snapshot of every connection currently `Open`.
    pub async fn live_set(&self) -> Vec<LivePeer> {
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|e| e.record.is_open())
            .map(|e| LivePeer {
                id: e.record.id(),
                sink: Arc::clone(&e.sink),
            })
            .collect()
    }

    /// Returns a copy of the record for `id`.
    pub async fn get(&self, id: ConnectionId) -> Option<ConnectionRecord> {
        self.entries.read().await.get(&id).map(|e| e.record.clone())
    }

    /// Number of tracked connections in any state.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
