/**
 * Server Initialization
 *
 * Wires the subsystem together: configuration, the optional database,
 * the registries, the router and the gateway, then the Axum router.
 *
 * # Initialization Steps
 *
 * 1. Load configuration from the environment
 * 2. Load the database pool (or fall back to the in-memory store)
 * 3. Build the connection registry and broadcast engine
 * 4. Build the session store, message router and gateway
 * 5. Assemble the Axum router
 */

use crate::backend::auth::TokenVerifier;
use crate::backend::chat::{ChatSessionStore, MessageRouter};
use crate::backend::realtime::{BroadcastEngine, RealtimeGateway};
use crate::backend::registry::ConnectionRegistry;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_database, ServerConfig};
use crate::backend::server::state::AppState;
use crate::backend::store::{memory::MemoryStore, postgres::PgStore, ChatStore};
use axum::Router;
use std::sync::Arc;

/// Create and configure the Axum application
pub async fn create_app() -> Router<()> {
    let config = ServerConfig::from_env();
    create_app_with_config(config).await
}

/// Create the application with explicit configuration
pub async fn create_app_with_config(config: ServerConfig) -> Router<()> {
    tracing::info!("Initializing vigia relay server");

    // Step 1: persistence collaborator
    let db_pool = load_database().await;
    let store: Arc<dyn ChatStore> = match &db_pool {
        Some(pool) => Arc::new(PgStore::new(pool.clone())),
        None => Arc::new(MemoryStore::new()),
    };

    // Step 2: shared registries
    let registry = Arc::new(ConnectionRegistry::new());
    let broadcast = BroadcastEngine::new(registry.clone());
    let sessions = Arc::new(ChatSessionStore::new(store.clone()));

    // Step 3: router and gateway
    let verifier = TokenVerifier::new(config.jwt_secret.clone());
    let router = Arc::new(MessageRouter::new(
        registry.clone(),
        sessions.clone(),
        store.clone(),
        broadcast.clone(),
        verifier.clone(),
        config.close_authorizer,
        config.persist_timeout,
    ));
    let gateway = Arc::new(RealtimeGateway::new(
        router.clone(),
        store.clone(),
        broadcast.clone(),
    ));

    tracing::info!(
        "Relay initialized (close policy: {:?}, persistence timeout: {:?})",
        config.close_authorizer,
        config.persist_timeout
    );

    let app_state = AppState {
        registry,
        sessions,
        store,
        broadcast,
        router,
        gateway,
        verifier,
        db_pool,
    };

    create_router(app_state)
}
