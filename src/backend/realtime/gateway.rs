/**
 * Realtime Gateway
 *
 * The interface the REST layer calls into the relay: close a session
 * on behalf of an HTTP request, announce a freshly created occurrence
 * to everyone, or push a per-user notification. The REST side never
 * touches the registry or the broadcast engine directly.
 */

use crate::backend::chat::router::MessageRouter;
use crate::backend::error::Result;
use crate::backend::realtime::broadcast::BroadcastEngine;
use crate::backend::store::ChatStore;
use crate::shared::frame::ServerFrame;
use crate::shared::types::{NotificationEvent, OccurrenceSummary};
use std::sync::Arc;
use uuid::Uuid;

/// REST-facing API of the real-time subsystem
pub struct RealtimeGateway {
    router: Arc<MessageRouter>,
    store: Arc<dyn ChatStore>,
    broadcast: BroadcastEngine,
}

impl RealtimeGateway {
    pub fn new(
        router: Arc<MessageRouter>,
        store: Arc<dyn ChatStore>,
        broadcast: BroadcastEngine,
    ) -> Self {
        Self {
            router,
            store,
            broadcast,
        }
    }

    /// Close a session on behalf of a REST request
    ///
    /// Same gate, same broadcasts and same eviction as the socket's
    /// `CLOSE_SESSION` frame; authorization goes through the identical
    /// policy predicate.
    pub async fn request_session_close(
        &self,
        chat_id: Uuid,
        requester_id: Uuid,
        requester_role: Option<&str>,
    ) -> Result<()> {
        self.router
            .close_session(chat_id, requester_id, requester_role)
            .await
    }

    /// Announce a freshly reported occurrence to every connection
    pub fn occurrence_created(&self, summary: OccurrenceSummary) {
        tracing::info!("[Realtime] Announcing occurrence {}", summary.id);
        self.broadcast
            .to_all(&ServerFrame::NewOccurrence { data: summary });
    }

    /// Persist and deliver an out-of-band notification to one user
    ///
    /// Storage comes first: the notification survives even when the
    /// user has no live connection to receive the push.
    pub async fn user_notification(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<NotificationEvent> {
        let notification = self.store.create_notification(user_id, title, body).await?;

        self.broadcast.to_user(
            user_id,
            &ServerFrame::Notification {
                title: notification.title.clone(),
                body: notification.body.clone(),
                timestamp: notification.created_at,
            },
        );
        Ok(notification)
    }
}
