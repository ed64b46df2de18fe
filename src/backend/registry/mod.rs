/**
 * Connection Registry
 *
 * Tracks every live connection together with its room and user
 * memberships. The registry exclusively owns connection liveness;
 * everyone else (router, broadcast engine) only reads snapshots.
 *
 * # Lock Discipline
 *
 * All three indices are `DashMap`s, so contention is per shard rather
 * than per registry. Room membership lives in two places (the
 * connection's own slot and the `rooms` index); both are updated under
 * the connection's slot lock so they cannot drift apart. `unregister`
 * is safe to call repeatedly and concurrently with any other
 * operation: every step tolerates the entry already being gone.
 */

pub mod connection;

pub use connection::Connection;

use crate::backend::error::{RelayError, Result};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Registry of live connections with room and user indices
pub struct ConnectionRegistry {
    /// Primary set: connection id -> handle
    connections: DashMap<Uuid, Arc<Connection>>,
    /// Room index: chat id -> member connection ids
    rooms: DashMap<Uuid, HashSet<Uuid>>,
    /// User index: user id -> connection ids (one user, many tabs)
    users: DashMap<Uuid, HashSet<Uuid>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
            users: DashMap::new(),
        }
    }

    /// Register a new, unauthenticated connection. Always succeeds.
    pub fn register(&self, sender: mpsc::UnboundedSender<String>) -> Arc<Connection> {
        let conn = Arc::new(Connection::new(sender));
        self.connections.insert(conn.id, conn.clone());
        tracing::debug!("[Registry] Connection {} registered", conn.id);
        conn
    }

    /// Mark a connection authenticated and index it under its user
    ///
    /// Idempotent when re-authenticating as the same user; rejects an
    /// attempt to switch identity on a live connection.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the handle raced with a disconnect
    /// - `Forbidden` on re-authentication as a different user
    pub fn authenticate(
        &self,
        conn_id: Uuid,
        user_id: Uuid,
        role: Option<String>,
    ) -> Result<()> {
        let conn = self
            .connections
            .get(&conn_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| RelayError::NotFound(format!("connection {}", conn_id)))?;

        if let Some(existing) = conn.user_id() {
            if existing == user_id {
                return Ok(());
            }
            return Err(RelayError::Forbidden(format!(
                "connection {} is already authenticated as another user",
                conn_id
            )));
        }

        conn.set_identity(user_id, role);
        self.users.entry(user_id).or_default().insert(conn_id);
        tracing::debug!(
            "[Registry] Connection {} authenticated as user {}",
            conn_id,
            user_id
        );
        Ok(())
    }

    /// Move a connection into a room, implicitly leaving any previous one
    ///
    /// # Errors
    ///
    /// - `NotFound` if the handle raced with a disconnect
    /// - `Unauthenticated` if the connection has not authenticated yet
    pub fn join_room(&self, conn_id: Uuid, chat_id: Uuid) -> Result<()> {
        let conn = self
            .connections
            .get(&conn_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| RelayError::NotFound(format!("connection {}", conn_id)))?;

        if !conn.is_authenticated() {
            return Err(RelayError::Unauthenticated(
                "join requires authentication".to_string(),
            ));
        }

        conn.with_chat_slot(|slot| {
            // Re-check liveness under the slot lock: the handle may
            // have been unregistered since the lookup above, and an
            // insert now would leave a dead id in the room set.
            if !self.connections.contains_key(&conn_id) {
                return Err(RelayError::NotFound(format!("connection {}", conn_id)));
            }

            // One room per connection: leaving the old room first
            if let Some(previous) = slot.take() {
                if previous != chat_id {
                    self.remove_from_room(conn_id, previous);
                }
            }

            *slot = Some(chat_id);
            self.rooms.entry(chat_id).or_default().insert(conn_id);
            Ok(())
        })?;

        tracing::debug!("[Registry] Connection {} joined room {}", conn_id, chat_id);
        Ok(())
    }

    /// Remove a connection from its room. Idempotent.
    pub fn leave_room(&self, conn_id: Uuid) {
        if let Some(conn) = self.connections.get(&conn_id).map(|entry| entry.clone()) {
            conn.with_chat_slot(|slot| {
                if let Some(chat_id) = slot.take() {
                    self.remove_from_room(conn_id, chat_id);
                }
            });
        }
    }

    /// Remove a connection from every index
    ///
    /// Safe to call more than once and concurrently with any other
    /// operation on the same or different handles.
    pub fn unregister(&self, conn_id: Uuid) {
        if let Some((_, conn)) = self.connections.remove(&conn_id) {
            if let Some(user_id) = conn.user_id() {
                if let Some(mut user_conns) = self.users.get_mut(&user_id) {
                    user_conns.remove(&conn_id);
                    if user_conns.is_empty() {
                        drop(user_conns);
                        self.users.remove_if(&user_id, |_, conns| conns.is_empty());
                    }
                }
            }
            // The handle is already out of `connections`, so a racing
            // join_room fails its liveness re-check; taking the slot
            // lock here settles any join that had already won it.
            conn.with_chat_slot(|slot| {
                if let Some(chat_id) = slot.take() {
                    self.remove_from_room(conn_id, chat_id);
                }
            });
            tracing::debug!("[Registry] Connection {} unregistered", conn_id);
        }
    }

    /// Point-in-time snapshot of a room's live connections
    pub fn connections_in_room(&self, chat_id: Uuid) -> Vec<Arc<Connection>> {
        let ids: Vec<Uuid> = self
            .rooms
            .get(&chat_id)
            .map(|entry| entry.iter().copied().collect())
            .unwrap_or_default();

        // A handle mid-unregister is absent from `connections` and
        // silently skipped, so no returned handle is already dead.
        ids.iter()
            .filter_map(|id| self.connections.get(id).map(|entry| entry.clone()))
            .collect()
    }

    /// Point-in-time snapshot of one user's live connections
    pub fn connections_for_user(&self, user_id: Uuid) -> Vec<Arc<Connection>> {
        let ids: Vec<Uuid> = self
            .users
            .get(&user_id)
            .map(|entry| entry.iter().copied().collect())
            .unwrap_or_default();

        ids.iter()
            .filter_map(|id| self.connections.get(id).map(|entry| entry.clone()))
            .collect()
    }

    /// Snapshot of every registered connection
    pub fn all_connections(&self) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn remove_from_room(&self, conn_id: Uuid, chat_id: Uuid) {
        if let Some(mut room) = self.rooms.get_mut(&chat_id) {
            room.remove(&conn_id);
            if room.is_empty() {
                drop(room);
                self.rooms.remove_if(&chat_id, |_, conns| conns.is_empty());
            }
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_one(registry: &ConnectionRegistry) -> Arc<Connection> {
        let (tx, rx) = mpsc::unbounded_channel();
        // Receiver leaked on purpose so sends keep succeeding
        std::mem::forget(rx);
        registry.register(tx)
    }

    #[test]
    fn test_register_and_count() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.connection_count(), 0);
        let _a = register_one(&registry);
        let _b = register_one(&registry);
        assert_eq!(registry.connection_count(), 2);
    }

    #[test]
    fn test_authenticate_indexes_user() {
        let registry = ConnectionRegistry::new();
        let conn = register_one(&registry);
        let user_id = Uuid::new_v4();

        registry.authenticate(conn.id, user_id, None).unwrap();
        assert!(conn.is_authenticated());
        assert_eq!(registry.connections_for_user(user_id).len(), 1);
    }

    #[test]
    fn test_authenticate_is_idempotent_for_same_user() {
        let registry = ConnectionRegistry::new();
        let conn = register_one(&registry);
        let user_id = Uuid::new_v4();

        registry.authenticate(conn.id, user_id, None).unwrap();
        registry.authenticate(conn.id, user_id, None).unwrap();
        assert_eq!(registry.connections_for_user(user_id).len(), 1);
    }

    #[test]
    fn test_reauthenticate_as_other_user_rejected() {
        let registry = ConnectionRegistry::new();
        let conn = register_one(&registry);

        registry.authenticate(conn.id, Uuid::new_v4(), None).unwrap();
        let result = registry.authenticate(conn.id, Uuid::new_v4(), None);
        assert!(matches!(result, Err(RelayError::Forbidden(_))));
    }

    #[test]
    fn test_authenticate_unknown_handle() {
        let registry = ConnectionRegistry::new();
        let result = registry.authenticate(Uuid::new_v4(), Uuid::new_v4(), None);
        assert!(matches!(result, Err(RelayError::NotFound(_))));
    }

    #[test]
    fn test_join_requires_authentication() {
        let registry = ConnectionRegistry::new();
        let conn = register_one(&registry);

        let result = registry.join_room(conn.id, Uuid::new_v4());
        assert!(matches!(result, Err(RelayError::Unauthenticated(_))));
    }

    #[test]
    fn test_join_switches_rooms() {
        let registry = ConnectionRegistry::new();
        let conn = register_one(&registry);
        registry.authenticate(conn.id, Uuid::new_v4(), None).unwrap();

        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();

        registry.join_room(conn.id, room_a).unwrap();
        assert_eq!(registry.connections_in_room(room_a).len(), 1);

        // Joining a new room implicitly leaves the previous one
        registry.join_room(conn.id, room_b).unwrap();
        assert_eq!(registry.connections_in_room(room_a).len(), 0);
        assert_eq!(registry.connections_in_room(room_b).len(), 1);
        assert_eq!(conn.chat_id(), Some(room_b));
    }

    #[test]
    fn test_leave_room_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let conn = register_one(&registry);
        registry.authenticate(conn.id, Uuid::new_v4(), None).unwrap();

        let room = Uuid::new_v4();
        registry.join_room(conn.id, room).unwrap();
        registry.leave_room(conn.id);
        registry.leave_room(conn.id);
        assert!(registry.connections_in_room(room).is_empty());
        assert!(conn.chat_id().is_none());
    }

    #[test]
    fn test_unregister_cleans_every_index() {
        let registry = ConnectionRegistry::new();
        let conn = register_one(&registry);
        let user_id = Uuid::new_v4();
        let room = Uuid::new_v4();

        registry.authenticate(conn.id, user_id, None).unwrap();
        registry.join_room(conn.id, room).unwrap();

        registry.unregister(conn.id);
        assert_eq!(registry.connection_count(), 0);
        assert!(registry.connections_in_room(room).is_empty());
        assert!(registry.connections_for_user(user_id).is_empty());

        // Safe to call again
        registry.unregister(conn.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_join_racing_unregister_leaves_no_dead_room_entry() {
        let room = Uuid::new_v4();
        for _ in 0..64 {
            let registry = Arc::new(ConnectionRegistry::new());
            let conn = register_one(&registry);
            registry.authenticate(conn.id, Uuid::new_v4(), None).unwrap();

            let joiner = {
                let registry = registry.clone();
                let conn_id = conn.id;
                tokio::spawn(async move { registry.join_room(conn_id, room) })
            };
            let closer = {
                let registry = registry.clone();
                let conn_id = conn.id;
                tokio::spawn(async move { registry.unregister(conn_id) })
            };
            let _ = joiner.await.unwrap(); // NotFound when unregister won
            closer.await.unwrap();
            registry.unregister(conn.id);

            let stale = registry
                .rooms
                .get(&room)
                .map(|members| members.contains(&conn.id))
                .unwrap_or(false);
            assert!(!stale, "dead connection id left behind in the room index");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_leave_racing_join_keeps_slot_and_index_agreeing() {
        for _ in 0..64 {
            let registry = Arc::new(ConnectionRegistry::new());
            let conn = register_one(&registry);
            registry.authenticate(conn.id, Uuid::new_v4(), None).unwrap();

            let room_a = Uuid::new_v4();
            let room_b = Uuid::new_v4();
            registry.join_room(conn.id, room_a).unwrap();

            let joiner = {
                let registry = registry.clone();
                let conn_id = conn.id;
                tokio::spawn(async move { registry.join_room(conn_id, room_b) })
            };
            let leaver = {
                let registry = registry.clone();
                let conn_id = conn.id;
                tokio::spawn(async move { registry.leave_room(conn_id) })
            };
            joiner.await.unwrap().unwrap();
            leaver.await.unwrap();

            // Whichever order won, the slot and the index must agree
            let in_a = !registry.connections_in_room(room_a).is_empty();
            let in_b = !registry.connections_in_room(room_b).is_empty();
            match conn.chat_id() {
                Some(room) => {
                    assert_eq!(room, room_b);
                    assert!(in_b && !in_a);
                }
                None => assert!(!in_a && !in_b),
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_unregister_is_safe() {
        let registry = Arc::new(ConnectionRegistry::new());
        let conn = register_one(&registry);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            let conn_id = conn.id;
            handles.push(tokio::spawn(async move {
                registry.unregister(conn_id);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(registry.connection_count(), 0);
    }
}
