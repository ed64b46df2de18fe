/**
 * WebSocket Frame Vocabulary
 *
 * This module defines the closed set of frames exchanged over the
 * real-time socket. Inbound frames (`ClientFrame`) and outbound frames
 * (`ServerFrame`) are tagged enums serialized with a `type` field, so
 * dispatch is an exhaustive match instead of a runtime string switch.
 *
 * # Wire Format
 *
 * Every frame is a JSON object carrying a `type` discriminator in
 * SCREAMING_SNAKE_CASE, e.g.:
 *
 * ```json
 * {"type":"SEND_MESSAGE","chat_id":"...","content":"help","kind":"text"}
 * {"type":"NEW_MESSAGE","message":{...}}
 * {"type":"ERROR","code":"SESSION_CLOSED","message":"..."}
 * ```
 */

use crate::shared::types::{ChatMessage, MessageKind, OccurrenceSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Machine-readable error codes carried by `ServerFrame::Error`
///
/// These mirror the relay error taxonomy; transport-level failures are
/// never put on the wire (the broken peer is simply evicted).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Operation attempted before authentication
    Unauthenticated,
    /// Unknown chat or connection
    NotFound,
    /// Write attempted on a CLOSED session
    SessionClosed,
    /// Close attempted on an already CLOSED session
    AlreadyClosed,
    /// Requester is not allowed to perform the operation
    Forbidden,
    /// Collaborator call failed or timed out
    PersistenceFailure,
    /// Inbound frame could not be decoded
    BadFrame,
}

/// Frames sent by clients to the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientFrame {
    /// Authenticate the connection with a JWT issued by the REST layer
    Authenticate { token: String },
    /// Join the room of a chat session
    Join { chat_id: Uuid },
    /// Send a message to the connection's current room
    SendMessage {
        chat_id: Uuid,
        content: String,
        #[serde(default)]
        kind: MessageKind,
    },
    /// Close a chat session (subject to the close authorization policy)
    CloseSession { chat_id: Uuid },
    /// Liveness probe; answered with `Pong`
    Ping,
}

/// Frames sent by the server to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerFrame {
    /// Greeting sent once, right after the transport is accepted
    Welcome {
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// Acknowledges a successful `Authenticate`
    Authenticated { user_id: Uuid },
    /// Acknowledges a successful `Join`, sent to the joiner only
    RoomJoined { chat_id: Uuid },
    /// Ephemeral presence event sent to the rest of the room on join
    PeerJoined { chat_id: Uuid, user_id: Uuid },
    /// A persisted message, fanned out to the whole room (sender included;
    /// clients reconcile by `message.id`)
    NewMessage { message: ChatMessage },
    /// The session was closed; no further messages will be accepted
    SessionClosed { chat_id: Uuid },
    /// System-wide announcement of a freshly reported occurrence
    NewOccurrence { data: OccurrenceSummary },
    /// Out-of-band per-user notification
    Notification {
        title: String,
        body: String,
        timestamp: DateTime<Utc>,
    },
    /// Answer to `Ping`
    Pong { timestamp: DateTime<Utc> },
    /// Recoverable error, delivered only to the originating connection
    Error { code: ErrorCode, message: String },
}

impl ServerFrame {
    /// Build a `Welcome` frame with the standard greeting
    pub fn welcome() -> Self {
        Self::Welcome {
            message: "Connection established".to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Build an `Error` frame
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    /// Build a `Pong` frame stamped with the current time
    pub fn pong() -> Self {
        Self::Pong {
            timestamp: Utc::now(),
        }
    }
}
