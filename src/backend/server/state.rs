/**
 * Application State
 *
 * Central state container for the Axum application. Everything the
 * handlers and the socket lifecycle need hangs off `AppState`, which
 * is cheap to clone (all fields are `Arc`s or small handles).
 *
 * # Thread Safety
 *
 * - The connection registry and session store do their own per-key
 *   locking; the state itself holds no locks.
 * - `FromRef` implementations let handlers extract just the piece of
 *   state they need.
 */

use crate::backend::auth::TokenVerifier;
use crate::backend::chat::{ChatSessionStore, MessageRouter};
use crate::backend::realtime::{BroadcastEngine, RealtimeGateway};
use crate::backend::registry::ConnectionRegistry;
use crate::backend::store::ChatStore;
use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;

/// Application state shared by every handler and connection task
#[derive(Clone)]
pub struct AppState {
    /// Live connection registry (rooms, users, primary set)
    pub registry: Arc<ConnectionRegistry>,
    /// Chat session lifecycle store
    pub sessions: Arc<ChatSessionStore>,
    /// Persistence collaborator
    pub store: Arc<dyn ChatStore>,
    /// Fan-out engine over the registry
    pub broadcast: BroadcastEngine,
    /// Inbound frame router
    pub router: Arc<MessageRouter>,
    /// REST-facing gateway
    pub gateway: Arc<RealtimeGateway>,
    /// JWT verification capability
    pub verifier: TokenVerifier,
    /// Connection pool, `None` when running on the in-memory store
    pub db_pool: Option<PgPool>,
}

impl FromRef<AppState> for Arc<ConnectionRegistry> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.registry.clone()
    }
}

impl FromRef<AppState> for Arc<RealtimeGateway> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.gateway.clone()
    }
}

impl FromRef<AppState> for TokenVerifier {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.verifier.clone()
    }
}

impl FromRef<AppState> for Option<PgPool> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}
