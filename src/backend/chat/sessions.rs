/**
 * Chat Session Store
 *
 * In-process view of each chat session's lifecycle state, backed by
 * the persistence collaborator. Sessions are created lazily on the
 * first chat request for an occurrence and only ever destroyed
 * logically (OPEN -> CLOSED); the record is retained for history.
 *
 * # Serialization Points
 *
 * - `get_or_create` holds a per-occurrence creation lock, so two
 *   concurrent creators for the same occurrence observe one session.
 * - Every session has a *gate*: an async mutex the router holds across
 *   its open-check plus persistence, and that `close` holds across the
 *   state flip. A send and a close on the same room are therefore
 *   mutually exclusive, and no message lands after closure.
 */

use crate::backend::error::{RelayError, Result};
use crate::backend::store::ChatStore;
use crate::shared::types::{ChatSession, SessionState};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Store of chat session lifecycle state
pub struct ChatSessionStore {
    store: Arc<dyn ChatStore>,
    /// Cache of sessions by chat id
    sessions: DashMap<Uuid, ChatSession>,
    /// Per-session gate serializing sends against close
    gates: DashMap<Uuid, Arc<Mutex<()>>>,
    /// Per-occurrence lock serializing concurrent creators
    creation_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ChatSessionStore {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self {
            store,
            sessions: DashMap::new(),
            gates: DashMap::new(),
            creation_locks: DashMap::new(),
        }
    }

    /// The gate of one session
    ///
    /// Callers that must be atomic with respect to `close` (the send
    /// path) lock this before checking `is_open` and keep it locked
    /// until persistence finished.
    pub fn gate(&self, chat_id: Uuid) -> Arc<Mutex<()>> {
        self.gates
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Return the session for an occurrence, creating it if necessary
    ///
    /// Idempotent: a second call for the same occurrence returns the
    /// existing session. Concurrent callers racing on the same
    /// occurrence are serialized by a per-occurrence lock and observe
    /// the same chat id.
    pub async fn get_or_create(&self, occurrence_id: Uuid, owner_id: Uuid) -> Result<ChatSession> {
        let lock = self
            .creation_locks
            .entry(occurrence_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(existing) = self.store.find_session(occurrence_id).await? {
            self.sessions.insert(existing.id, existing.clone());
            return Ok(existing);
        }

        let session = self.store.create_session(occurrence_id, owner_id).await?;
        tracing::info!(
            "[Chat] Session {} created for occurrence {}",
            session.id,
            occurrence_id
        );
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    /// Look up a session by chat id
    ///
    /// Sessions created by another process instance are pulled into
    /// the cache on first sight.
    pub async fn get(&self, chat_id: Uuid) -> Result<ChatSession> {
        if let Some(cached) = self.sessions.get(&chat_id) {
            return Ok(cached.clone());
        }

        match self.store.get_session(chat_id).await? {
            Some(session) => {
                self.sessions.insert(chat_id, session.clone());
                Ok(session)
            }
            None => Err(RelayError::NotFound(format!("chat {}", chat_id))),
        }
    }

    /// Fast-path guard used by the router before accepting a message
    pub async fn is_open(&self, chat_id: Uuid) -> bool {
        matches!(self.get(chat_id).await, Ok(session) if session.is_open())
    }

    /// Transition a session OPEN -> CLOSED
    ///
    /// Holds the session gate for the whole transition, so in-flight
    /// sends for the room drain first and nothing is accepted after.
    /// Also instructs the collaborator to mark the underlying
    /// occurrence resolved.
    ///
    /// # Errors
    ///
    /// - `AlreadyClosed` if the session was CLOSED before this call;
    ///   callers decide whether to treat that as a no-op
    /// - `NotFound` for an unknown chat id
    pub async fn close(&self, chat_id: Uuid) -> Result<ChatSession> {
        let gate = self.gate(chat_id);
        let _guard = gate.lock().await;

        let session = self.get(chat_id).await?;
        if !session.is_open() {
            return Err(RelayError::AlreadyClosed(chat_id));
        }

        self.store.close_session(chat_id).await?;
        self.store
            .mark_occurrence_resolved(session.occurrence_id)
            .await?;

        let closed = ChatSession {
            state: SessionState::Closed,
            ..session
        };
        self.sessions.insert(chat_id, closed.clone());
        tracing::info!("[Chat] Session {} closed", chat_id);
        Ok(closed)
    }
}
