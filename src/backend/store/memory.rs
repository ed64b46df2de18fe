/**
 * In-Memory Store
 *
 * Map-backed `ChatStore` used when no `DATABASE_URL` is configured and
 * by the test suite. The server stays fully functional without a
 * database; history simply does not survive a restart.
 */

use crate::backend::error::{RelayError, Result};
use crate::backend::store::ChatStore;
use crate::shared::types::{
    ChatMessage, ChatSession, MessageKind, NotificationEvent, SessionState,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    /// Sessions by chat id
    sessions: HashMap<Uuid, ChatSession>,
    /// Occurrence id -> chat id (uniqueness index)
    by_occurrence: HashMap<Uuid, Uuid>,
    /// Occurrences flagged resolved
    resolved_occurrences: Vec<Uuid>,
    /// Messages by chat id, append order
    messages: HashMap<Uuid, Vec<ChatMessage>>,
    notifications: Vec<NotificationEvent>,
}

/// In-memory `ChatStore` implementation
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an occurrence has been marked resolved (test helper)
    pub async fn occurrence_resolved(&self, occurrence_id: Uuid) -> bool {
        self.inner
            .lock()
            .await
            .resolved_occurrences
            .contains(&occurrence_id)
    }

    /// Number of messages stored for a chat (test helper)
    pub async fn message_count(&self, chat_id: Uuid) -> usize {
        self.inner
            .lock()
            .await
            .messages
            .get(&chat_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Notifications stored for a user (test helper)
    pub async fn notifications_for(&self, user_id: Uuid) -> Vec<NotificationEvent> {
        self.inner
            .lock()
            .await
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn create_session(&self, occurrence_id: Uuid, owner_id: Uuid) -> Result<ChatSession> {
        let mut inner = self.inner.lock().await;
        if inner.by_occurrence.contains_key(&occurrence_id) {
            // Uniqueness violation, same as the Postgres unique index
            return Err(RelayError::Persistence(format!(
                "session already exists for occurrence {}",
                occurrence_id
            )));
        }

        let session = ChatSession {
            id: Uuid::new_v4(),
            occurrence_id,
            owner_id,
            state: SessionState::Open,
            created_at: Utc::now(),
        };
        inner.by_occurrence.insert(occurrence_id, session.id);
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, occurrence_id: Uuid) -> Result<Option<ChatSession>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .by_occurrence
            .get(&occurrence_id)
            .and_then(|chat_id| inner.sessions.get(chat_id))
            .cloned())
    }

    async fn get_session(&self, chat_id: Uuid) -> Result<Option<ChatSession>> {
        Ok(self.inner.lock().await.sessions.get(&chat_id).cloned())
    }

    async fn close_session(&self, chat_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.sessions.get_mut(&chat_id) {
            Some(session) => {
                session.state = SessionState::Closed;
                Ok(())
            }
            None => Err(RelayError::NotFound(format!("chat {}", chat_id))),
        }
    }

    async fn mark_occurrence_resolved(&self, occurrence_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.resolved_occurrences.contains(&occurrence_id) {
            inner.resolved_occurrences.push(occurrence_id);
        }
        Ok(())
    }

    async fn create_message(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        content: &str,
        kind: MessageKind,
    ) -> Result<ChatMessage> {
        let mut inner = self.inner.lock().await;
        if !inner.sessions.contains_key(&chat_id) {
            return Err(RelayError::NotFound(format!("chat {}", chat_id)));
        }

        let message = ChatMessage {
            id: Uuid::new_v4(),
            chat_id,
            user_id,
            content: content.to_string(),
            kind,
            created_at: Utc::now(),
        };
        inner
            .messages
            .entry(chat_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, chat_id: Uuid) -> Result<Vec<ChatMessage>> {
        Ok(self
            .inner
            .lock()
            .await
            .messages
            .get(&chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_notification(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<NotificationEvent> {
        let notification = NotificationEvent {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            body: body.to_string(),
            read: false,
            created_at: Utc::now(),
        };
        self.inner
            .lock()
            .await
            .notifications
            .push(notification.clone());
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find_session() {
        let store = MemoryStore::new();
        let occurrence_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();

        let session = store.create_session(occurrence_id, owner_id).await.unwrap();
        assert_eq!(session.state, SessionState::Open);
        assert_eq!(session.owner_id, owner_id);

        let found = store.find_session(occurrence_id).await.unwrap().unwrap();
        assert_eq!(found.id, session.id);
    }

    #[tokio::test]
    async fn test_duplicate_session_rejected() {
        let store = MemoryStore::new();
        let occurrence_id = Uuid::new_v4();

        store
            .create_session(occurrence_id, Uuid::new_v4())
            .await
            .unwrap();
        let result = store.create_session(occurrence_id, Uuid::new_v4()).await;
        assert!(matches!(result, Err(RelayError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_close_marks_session_closed() {
        let store = MemoryStore::new();
        let session = store
            .create_session(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();

        store.close_session(session.id).await.unwrap();
        let reloaded = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(reloaded.state, SessionState::Closed);
    }

    #[tokio::test]
    async fn test_messages_preserve_order() {
        let store = MemoryStore::new();
        let session = store
            .create_session(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();
        let author = Uuid::new_v4();

        for i in 0..3 {
            store
                .create_message(session.id, author, &format!("msg-{}", i), MessageKind::Text)
                .await
                .unwrap();
        }

        let messages = store.list_messages(session.id).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "msg-0");
        assert_eq!(messages[2].content, "msg-2");
    }

    #[tokio::test]
    async fn test_message_for_unknown_chat_rejected() {
        let store = MemoryStore::new();
        let result = store
            .create_message(Uuid::new_v4(), Uuid::new_v4(), "hello", MessageKind::Text)
            .await;
        assert!(matches!(result, Err(RelayError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_notifications_filtered_by_user() {
        let store = MemoryStore::new();
        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();

        store
            .create_notification(user_a, "Nearby", "New occurrence near you")
            .await
            .unwrap();
        store
            .create_notification(user_b, "Other", "Not yours")
            .await
            .unwrap();

        let for_a = store.notifications_for(user_a).await;
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].title, "Nearby");
        assert!(!for_a[0].read);
    }
}
