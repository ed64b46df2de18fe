/**
 * Message Router
 *
 * Decodes inbound frames, validates them against connection and
 * session state, persists through the collaborator and decides the
 * fan-out target. Frames from one connection are processed strictly in
 * arrival order by the connection's reader task; frames from different
 * connections interleave freely.
 *
 * # Error Policy
 *
 * Every validation or persistence error is recovered locally and
 * surfaced as an `ERROR` frame to the originating connection only.
 * Nothing here can take the process down.
 */

use crate::backend::auth::{CloseAuthorizer, TokenVerifier};
use crate::backend::chat::sessions::ChatSessionStore;
use crate::backend::error::{RelayError, Result};
use crate::backend::realtime::broadcast::BroadcastEngine;
use crate::backend::registry::{Connection, ConnectionRegistry};
use crate::backend::store::ChatStore;
use crate::shared::frame::{ClientFrame, ServerFrame};
use crate::shared::types::MessageKind;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Routes inbound frames to their handlers
pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
    sessions: Arc<ChatSessionStore>,
    store: Arc<dyn ChatStore>,
    broadcast: BroadcastEngine,
    verifier: TokenVerifier,
    close_authorizer: CloseAuthorizer,
    /// Upper bound on any single collaborator call
    persist_timeout: Duration,
}

impl MessageRouter {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        sessions: Arc<ChatSessionStore>,
        store: Arc<dyn ChatStore>,
        broadcast: BroadcastEngine,
        verifier: TokenVerifier,
        close_authorizer: CloseAuthorizer,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            sessions,
            store,
            broadcast,
            verifier,
            close_authorizer,
            persist_timeout,
        }
    }

    /// Process one inbound frame from a connection
    ///
    /// Errors never propagate past this point: reportable ones become
    /// an `ERROR` frame to the sender, transport failures are handled
    /// by the broadcast engine's eviction path.
    pub async fn handle_frame(&self, conn: &Arc<Connection>, frame: ClientFrame) {
        let result = match frame {
            ClientFrame::Authenticate { token } => self.handle_authenticate(conn, &token),
            ClientFrame::Join { chat_id } => self.handle_join(conn, chat_id).await,
            ClientFrame::SendMessage {
                chat_id,
                content,
                kind,
            } => self.handle_send(conn, chat_id, &content, kind).await,
            ClientFrame::CloseSession { chat_id } => {
                self.handle_close_frame(conn, chat_id).await
            }
            ClientFrame::Ping => {
                self.broadcast.to_connection(conn, &ServerFrame::pong());
                Ok(())
            }
        };

        if let Err(err) = result {
            self.report(conn, err);
        }
    }

    /// Surface a decode failure for an unparseable inbound payload
    pub fn report_bad_frame(&self, conn: &Arc<Connection>, detail: impl Into<String>) {
        self.report(conn, RelayError::BadFrame(detail.into()));
    }

    /// Authenticate a connection from a JWT
    ///
    /// The REST layer performs token auth in middleware; on a raw
    /// socket the handshake is an explicit frame (or the `token` query
    /// parameter of the upgrade, which funnels into the same path).
    pub fn authenticate(&self, conn: &Arc<Connection>, token: &str) -> Result<Uuid> {
        let (user_id, role) = self.verifier.verify(token)?;
        self.registry.authenticate(conn.id, user_id, role)?;
        Ok(user_id)
    }

    fn handle_authenticate(&self, conn: &Arc<Connection>, token: &str) -> Result<()> {
        let user_id = self.authenticate(conn, token)?;
        self.broadcast
            .to_connection(conn, &ServerFrame::Authenticated { user_id });
        Ok(())
    }

    /// JOIN: resolve the session, enter the room, announce presence
    ///
    /// The joiner gets `ROOM_JOINED`; the rest of the room gets an
    /// ephemeral `PEER_JOINED` that is never persisted.
    async fn handle_join(&self, conn: &Arc<Connection>, chat_id: Uuid) -> Result<()> {
        let user_id = conn
            .user_id()
            .ok_or_else(|| RelayError::Unauthenticated("join requires authentication".into()))?;

        let session = self.sessions.get(chat_id).await?;
        if !session.is_open() {
            return Err(RelayError::SessionClosed(chat_id));
        }

        self.registry.join_room(conn.id, chat_id)?;
        self.broadcast
            .to_connection(conn, &ServerFrame::RoomJoined { chat_id });
        self.broadcast.to_room_except(
            chat_id,
            conn.id,
            &ServerFrame::PeerJoined { chat_id, user_id },
        );
        Ok(())
    }

    /// SEND_MESSAGE: guard, persist, fan out to the whole room
    ///
    /// The session gate is held from the open-check until the fan-out
    /// completed, so a concurrent close can neither slip between the
    /// guard and the write nor evict the room out from under an
    /// accepted message. The sender receives its own message back and
    /// reconciles by message id.
    async fn handle_send(
        &self,
        conn: &Arc<Connection>,
        chat_id: Uuid,
        content: &str,
        kind: MessageKind,
    ) -> Result<()> {
        let user_id = conn
            .user_id()
            .ok_or_else(|| RelayError::Unauthenticated("send requires authentication".into()))?;
        if conn.chat_id() != Some(chat_id) {
            return Err(RelayError::Unauthenticated(
                "connection has not joined this room".into(),
            ));
        }

        let gate = self.sessions.gate(chat_id);
        let _guard = gate.lock().await;

        if !self.sessions.is_open(chat_id).await {
            return Err(RelayError::SessionClosed(chat_id));
        }

        let message = tokio::time::timeout(
            self.persist_timeout,
            self.store.create_message(chat_id, user_id, content, kind),
        )
        .await
        .map_err(|_| RelayError::Persistence("message write timed out".into()))??;

        // Still under the gate: a blocked close cannot flip the state
        // and empty the room index before this message reaches it.
        self.broadcast
            .to_room(chat_id, &ServerFrame::NewMessage { message });
        Ok(())
    }

    async fn handle_close_frame(&self, conn: &Arc<Connection>, chat_id: Uuid) -> Result<()> {
        let user_id = conn
            .user_id()
            .ok_or_else(|| RelayError::Unauthenticated("close requires authentication".into()))?;
        self.close_session(chat_id, user_id, conn.role().as_deref())
            .await
    }

    /// CLOSE_SESSION cascade, shared by the frame handler and the
    /// REST-facing gateway
    ///
    /// Order matters: flip the state first (under the gate, draining
    /// in-flight sends), then notify every remaining room connection,
    /// then evict them from the room index. The transports themselves
    /// stay connected.
    pub async fn close_session(
        &self,
        chat_id: Uuid,
        requester_id: Uuid,
        requester_role: Option<&str>,
    ) -> Result<()> {
        let session = self.sessions.get(chat_id).await?;
        if !self
            .close_authorizer
            .may_close(&session, requester_id, requester_role)
        {
            return Err(RelayError::Forbidden(
                "requester may not close this session".into(),
            ));
        }

        self.sessions.close(chat_id).await?;

        self.broadcast
            .to_room(chat_id, &ServerFrame::SessionClosed { chat_id });
        for member in self.registry.connections_in_room(chat_id) {
            self.registry.leave_room(member.id);
        }
        Ok(())
    }

    fn report(&self, conn: &Arc<Connection>, err: RelayError) {
        match err.error_code() {
            Some(code) => {
                tracing::debug!("[Router] Reporting to {}: {}", conn.id, err);
                self.broadcast
                    .to_connection(conn, &ServerFrame::error(code, err.message()));
            }
            None => {
                // Transport failures are cleaned up, never surfaced
                tracing::warn!("[Router] Transport failure on {}: {}", conn.id, err);
                self.registry.unregister(conn.id);
            }
        }
    }
}
