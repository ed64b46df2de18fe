//! Persistence Collaborator
//!
//! The relay never talks to the database directly; everything it
//! persists or reads goes through the narrow `ChatStore` trait. Two
//! implementations exist: a PostgreSQL store (`postgres`) used when
//! `DATABASE_URL` is configured, and an in-memory store (`memory`)
//! used otherwise and by the test suite.

pub mod memory;
pub mod postgres;

use crate::backend::error::Result;
use crate::shared::types::{ChatMessage, ChatSession, MessageKind, NotificationEvent};
use async_trait::async_trait;
use uuid::Uuid;

/// The persistence/query interface consumed by the relay
///
/// # Contract
///
/// - `create_session` must not create two sessions for the same
///   occurrence; concurrent creators are serialized by the caller and,
///   for the Postgres store, additionally by a unique constraint.
/// - `create_message` is atomic: either the message is durably stored
///   and returned, or an error is returned and no broadcast happens.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Create a new OPEN session for an occurrence
    async fn create_session(&self, occurrence_id: Uuid, owner_id: Uuid) -> Result<ChatSession>;

    /// Find the session bound to an occurrence, if any
    async fn find_session(&self, occurrence_id: Uuid) -> Result<Option<ChatSession>>;

    /// Look up a session by its chat id
    async fn get_session(&self, chat_id: Uuid) -> Result<Option<ChatSession>>;

    /// Flip a session to CLOSED
    async fn close_session(&self, chat_id: Uuid) -> Result<()>;

    /// Mark the occurrence behind a closed session as resolved
    async fn mark_occurrence_resolved(&self, occurrence_id: Uuid) -> Result<()>;

    /// Append a message to a chat
    async fn create_message(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        content: &str,
        kind: MessageKind,
    ) -> Result<ChatMessage>;

    /// Message history of a chat, oldest first
    async fn list_messages(&self, chat_id: Uuid) -> Result<Vec<ChatMessage>>;

    /// Store an unread notification for a user
    async fn create_notification(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<NotificationEvent>;
}
