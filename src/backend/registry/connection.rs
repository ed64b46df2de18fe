/**
 * Live Connection Handle
 *
 * One `Connection` per accepted transport link. The handle owns the
 * outbound channel to the writer task and the per-connection metadata
 * (authenticated user, role, current room). Metadata is guarded by
 * std locks; no lock is ever held across an await point.
 */

use crate::shared::frame::ServerFrame;
use std::sync::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

/// One live transport-level link from a client
pub struct Connection {
    /// Opaque connection handle
    pub id: Uuid,
    /// Outbound channel drained by the connection's writer task
    sender: mpsc::UnboundedSender<String>,
    /// Set once authentication succeeds, never changed afterwards
    user_id: RwLock<Option<Uuid>>,
    /// Role carried in the JWT claims, if any
    role: RwLock<Option<String>>,
    /// Current room; at most one per connection
    chat_id: RwLock<Option<Uuid>>,
}

impl Connection {
    pub fn new(sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            user_id: RwLock::new(None),
            role: RwLock::new(None),
            chat_id: RwLock::new(None),
        }
    }

    /// Serialize and enqueue a frame for this connection
    ///
    /// Best-effort: returns `false` when the writer side is gone, at
    /// which point the caller evicts the connection instead of retrying.
    pub fn send(&self, frame: &ServerFrame) -> bool {
        let json = match serde_json::to_string(frame) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("[Registry] Failed to serialize frame: {}", e);
                return false;
            }
        };
        self.sender.send(json).is_ok()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        *self.user_id.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn role(&self) -> Option<String> {
        self.role
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn chat_id(&self) -> Option<Uuid> {
        *self.chat_id.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id().is_some()
    }

    pub(super) fn set_identity(&self, user_id: Uuid, role: Option<String>) {
        *self.user_id.write().unwrap_or_else(|e| e.into_inner()) = Some(user_id);
        *self.role.write().unwrap_or_else(|e| e.into_inner()) = role;
    }

    /// Run `f` with exclusive access to the room slot
    ///
    /// The registry updates the slot and the room index together under
    /// this lock, so the two can never be observed disagreeing.
    pub(super) fn with_chat_slot<R>(&self, f: impl FnOnce(&mut Option<Uuid>) -> R) -> R {
        let mut slot = self.chat_id.write().unwrap_or_else(|e| e.into_inner());
        f(&mut slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_connection_is_unauthenticated() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = Connection::new(tx);
        assert!(!conn.is_authenticated());
        assert!(conn.user_id().is_none());
        assert!(conn.chat_id().is_none());
    }

    #[test]
    fn test_send_delivers_serialized_frame() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = Connection::new(tx);

        assert!(conn.send(&ServerFrame::pong()));
        let json = rx.try_recv().unwrap();
        assert!(json.contains("\"type\":\"PONG\""));
    }

    #[test]
    fn test_send_reports_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Connection::new(tx);
        drop(rx);
        assert!(!conn.send(&ServerFrame::pong()));
    }
}
