/**
 * Chat Domain Types
 *
 * This module defines the domain types that ride inside frames and are
 * exchanged with the persistence collaborator: chat sessions, messages,
 * notifications and occurrence summaries.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a chat session
///
/// OPEN is the initial state; CLOSED is terminal. A CLOSED session
/// accepts no further messages but is retained for history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Open,
    Closed,
}

impl SessionState {
    /// Parse from the textual form stored by the collaborator
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(Self::Open),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }

    /// Textual form stored by the collaborator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

/// The messaging channel of one occurrence report
///
/// Sessions are 1:1 with occurrences and outlive the connections
/// attached to them. Room membership is derived from the connection
/// registry, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSession {
    pub id: Uuid,
    /// The occurrence this session belongs to (unique per session)
    pub occurrence_id: Uuid,
    /// The user who reported the occurrence; drives close authorization
    pub owner_id: Uuid,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }
}

/// Kind of a chat message payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    /// `content` carries an opaque image payload (URL or base64)
    Image,
    /// Server-generated event rendered inline in the chat
    System,
}

impl MessageKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::System => "system",
        }
    }
}

/// One chat utterance
///
/// Messages are only appended while their session is OPEN, and the
/// append is atomic with persistence: no broadcast ever happens for a
/// message that failed to persist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    /// Author
    pub user_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
}

/// An out-of-band, per-user notification independent of chat sessions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationEvent {
    pub id: Uuid,
    /// Target user
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Summary of a freshly reported occurrence, broadcast system-wide
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OccurrenceSummary {
    pub id: Uuid,
    /// The reporting user
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
