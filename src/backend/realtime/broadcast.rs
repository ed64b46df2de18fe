/**
 * Broadcast Engine
 *
 * Pure fan-out over the connection registry: one primitive (serialize,
 * send to a computed set, evict broken peers) instantiated over four
 * key sets — a single connection, a room, a user, or everyone.
 *
 * No business logic lives here. The engine only reads registry
 * snapshots; a failed send evicts that peer and never interrupts the
 * rest of the delivery.
 */

use crate::backend::registry::{Connection, ConnectionRegistry};
use crate::shared::frame::ServerFrame;
use std::sync::Arc;
use uuid::Uuid;

/// Fans outbound frames out to computed sets of connections
#[derive(Clone)]
pub struct BroadcastEngine {
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastEngine {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Best-effort single send
    ///
    /// A failed send means the transport is closed or broken; the
    /// connection is unregistered immediately rather than retried.
    pub fn to_connection(&self, conn: &Arc<Connection>, frame: &ServerFrame) {
        if !conn.send(frame) {
            tracing::debug!(
                "[Realtime] Send to connection {} failed, evicting",
                conn.id
            );
            self.registry.unregister(conn.id);
        }
    }

    /// Fan out to every connection in a room
    pub fn to_room(&self, chat_id: Uuid, frame: &ServerFrame) {
        self.fan_out(self.registry.connections_in_room(chat_id), frame);
    }

    /// Fan out to a room, skipping one connection (presence events)
    pub fn to_room_except(&self, chat_id: Uuid, except: Uuid, frame: &ServerFrame) {
        let targets = self
            .registry
            .connections_in_room(chat_id)
            .into_iter()
            .filter(|conn| conn.id != except)
            .collect();
        self.fan_out(targets, frame);
    }

    /// Fan out to every connection of one user (all of their tabs)
    pub fn to_user(&self, user_id: Uuid, frame: &ServerFrame) {
        self.fan_out(self.registry.connections_for_user(user_id), frame);
    }

    /// Fan out to every registered connection
    pub fn to_all(&self, frame: &ServerFrame) {
        self.fan_out(self.registry.all_connections(), frame);
    }

    /// Send to each target, evicting the ones whose transport is gone
    ///
    /// Partial failures are isolated per connection: one broken peer
    /// never blocks delivery to the rest.
    fn fan_out(&self, targets: Vec<Arc<Connection>>, frame: &ServerFrame) {
        let mut delivered = 0usize;
        let mut failed = Vec::new();

        for conn in &targets {
            if conn.send(frame) {
                delivered += 1;
            } else {
                failed.push(conn.id);
            }
        }

        for conn_id in failed {
            tracing::debug!("[Realtime] Evicting broken connection {}", conn_id);
            self.registry.unregister(conn_id);
        }

        tracing::debug!(
            "[Realtime] Frame delivered to {}/{} connections",
            delivered,
            targets.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct Peer {
        conn: Arc<Connection>,
        rx: mpsc::UnboundedReceiver<String>,
    }

    fn peer(registry: &ConnectionRegistry) -> Peer {
        let (tx, rx) = mpsc::unbounded_channel();
        Peer {
            conn: registry.register(tx),
            rx,
        }
    }

    fn authed_peer(registry: &ConnectionRegistry, user_id: Uuid) -> Peer {
        let p = peer(registry);
        registry.authenticate(p.conn.id, user_id, None).unwrap();
        p
    }

    #[tokio::test]
    async fn test_to_room_reaches_every_member() {
        let registry = Arc::new(ConnectionRegistry::new());
        let engine = BroadcastEngine::new(registry.clone());
        let room = Uuid::new_v4();

        let mut a = authed_peer(&registry, Uuid::new_v4());
        let mut b = authed_peer(&registry, Uuid::new_v4());
        let mut outsider = authed_peer(&registry, Uuid::new_v4());
        registry.join_room(a.conn.id, room).unwrap();
        registry.join_room(b.conn.id, room).unwrap();

        engine.to_room(room, &ServerFrame::pong());

        assert!(a.rx.try_recv().is_ok());
        assert!(b.rx.try_recv().is_ok());
        assert!(outsider.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_to_room_except_skips_sender() {
        let registry = Arc::new(ConnectionRegistry::new());
        let engine = BroadcastEngine::new(registry.clone());
        let room = Uuid::new_v4();

        let mut a = authed_peer(&registry, Uuid::new_v4());
        let mut b = authed_peer(&registry, Uuid::new_v4());
        registry.join_room(a.conn.id, room).unwrap();
        registry.join_room(b.conn.id, room).unwrap();

        engine.to_room_except(room, a.conn.id, &ServerFrame::pong());

        assert!(a.rx.try_recv().is_err());
        assert!(b.rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_to_user_reaches_every_tab() {
        let registry = Arc::new(ConnectionRegistry::new());
        let engine = BroadcastEngine::new(registry.clone());
        let user_id = Uuid::new_v4();

        let mut tab1 = authed_peer(&registry, user_id);
        let mut tab2 = authed_peer(&registry, user_id);
        let mut other = authed_peer(&registry, Uuid::new_v4());

        engine.to_user(
            user_id,
            &ServerFrame::Notification {
                title: "Nearby".to_string(),
                body: "New occurrence near you".to_string(),
                timestamp: chrono::Utc::now(),
            },
        );

        assert!(tab1.rx.try_recv().is_ok());
        assert!(tab2.rx.try_recv().is_ok());
        assert!(other.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broken_peer_is_evicted_without_blocking_the_rest() {
        let registry = Arc::new(ConnectionRegistry::new());
        let engine = BroadcastEngine::new(registry.clone());
        let room = Uuid::new_v4();

        let mut healthy = authed_peer(&registry, Uuid::new_v4());
        let broken = authed_peer(&registry, Uuid::new_v4());
        registry.join_room(healthy.conn.id, room).unwrap();
        registry.join_room(broken.conn.id, room).unwrap();

        // Simulate an abrupt disconnect: the writer side is gone
        drop(broken.rx);

        engine.to_room(room, &ServerFrame::pong());

        assert!(healthy.rx.try_recv().is_ok());
        assert_eq!(registry.connection_count(), 1);
        assert!(registry.connections_in_room(room).len() == 1);
    }

    #[tokio::test]
    async fn test_to_all_reaches_unauthenticated_connections() {
        let registry = Arc::new(ConnectionRegistry::new());
        let engine = BroadcastEngine::new(registry.clone());

        let mut fresh = peer(&registry);
        engine.to_all(&ServerFrame::pong());
        assert!(fresh.rx.try_recv().is_ok());
    }
}
