/**
 * PostgreSQL Store
 *
 * sqlx-backed `ChatStore` implementation. Session uniqueness per
 * occurrence is enforced twice: the session store serializes creators
 * in-process, and `chats.occurrence_id` carries a unique index as the
 * last line of defense.
 *
 * The occurrence records themselves belong to the REST backend;
 * resolution is recorded in a relay-owned `occurrence_resolutions`
 * table that the REST layer joins against.
 */

use crate::backend::error::{RelayError, Result};
use crate::backend::store::ChatStore;
use crate::shared::types::{
    ChatMessage, ChatSession, MessageKind, NotificationEvent, SessionState,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// PostgreSQL `ChatStore` implementation
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn session_from_row(row: &sqlx::postgres::PgRow) -> Result<ChatSession> {
    let state_text: String = row.get("state");
    let state = SessionState::from_str(&state_text).ok_or_else(|| {
        RelayError::Persistence(format!("unknown session state '{}'", state_text))
    })?;
    Ok(ChatSession {
        id: row.get("id"),
        occurrence_id: row.get("occurrence_id"),
        owner_id: row.get("owner_id"),
        state,
        created_at: row.get("created_at"),
    })
}

fn message_from_row(row: &sqlx::postgres::PgRow) -> Result<ChatMessage> {
    let kind_text: String = row.get("kind");
    let kind = MessageKind::from_str(&kind_text)
        .ok_or_else(|| RelayError::Persistence(format!("unknown message kind '{}'", kind_text)))?;
    Ok(ChatMessage {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        kind,
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl ChatStore for PgStore {
    async fn create_session(&self, occurrence_id: Uuid, owner_id: Uuid) -> Result<ChatSession> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO chats (id, occurrence_id, owner_id, state, created_at)
            VALUES ($1, $2, $3, 'OPEN', $4)
            "#,
        )
        .bind(id)
        .bind(occurrence_id)
        .bind(owner_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(ChatSession {
            id,
            occurrence_id,
            owner_id,
            state: SessionState::Open,
            created_at: now,
        })
    }

    async fn find_session(&self, occurrence_id: Uuid) -> Result<Option<ChatSession>> {
        let row = sqlx::query(
            r#"
            SELECT id, occurrence_id, owner_id, state, created_at
            FROM chats
            WHERE occurrence_id = $1
            "#,
        )
        .bind(occurrence_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn get_session(&self, chat_id: Uuid) -> Result<Option<ChatSession>> {
        let row = sqlx::query(
            r#"
            SELECT id, occurrence_id, owner_id, state, created_at
            FROM chats
            WHERE id = $1
            "#,
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn close_session(&self, chat_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE chats SET state = 'CLOSED' WHERE id = $1
            "#,
        )
        .bind(chat_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RelayError::NotFound(format!("chat {}", chat_id)));
        }
        Ok(())
    }

    async fn mark_occurrence_resolved(&self, occurrence_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO occurrence_resolutions (occurrence_id, resolved_at)
            VALUES ($1, $2)
            ON CONFLICT (occurrence_id) DO NOTHING
            "#,
        )
        .bind(occurrence_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_message(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        content: &str,
        kind: MessageKind,
    ) -> Result<ChatMessage> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, chat_id, user_id, content, kind, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(chat_id)
        .bind(user_id)
        .bind(content)
        .bind(kind.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(ChatMessage {
            id,
            chat_id,
            user_id,
            content: content.to_string(),
            kind,
            created_at: now,
        })
    }

    async fn list_messages(&self, chat_id: Uuid) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, chat_id, user_id, content, kind, created_at
            FROM chat_messages
            WHERE chat_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn create_notification(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<NotificationEvent> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, body, read, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(body)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(NotificationEvent {
            id,
            user_id,
            title: title.to_string(),
            body: body.to_string(),
            read: false,
            created_at: now,
        })
    }
}
