/**
 * Shared Types
 *
 * This module contains the types shared between the server and its
 * clients: the WebSocket frame vocabulary and the chat domain types
 * that ride inside frames.
 */

pub mod frame;
pub mod types;

pub use frame::{ClientFrame, ErrorCode, ServerFrame};
pub use types::{
    ChatMessage, ChatSession, MessageKind, NotificationEvent, OccurrenceSummary, SessionState,
};
