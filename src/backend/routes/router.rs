/**
 * Router Configuration
 *
 * Combines the WebSocket endpoint and the gateway HTTP routes into one
 * Axum router.
 *
 * # Routes
 *
 * - `GET  /ws`                                - WebSocket upgrade
 * - `POST /ocurrences/{occurrence_id}/chat`   - get or create session
 * - `GET  /chats/{chat_id}/messages`          - message history
 * - `GET  /chats/{chat_id}/status`            - session status
 * - `POST /chats/{chat_id}/close`             - close cascade
 * - `POST /notifications`                     - per-user notification
 * - `POST /ocurrences/announce`               - system-wide announcement
 *
 * The WebSocket route authenticates in-band (query token or
 * AUTHENTICATE frame); every HTTP route sits behind the Bearer-token
 * middleware.
 */

use crate::backend::chat::handlers;
use crate::backend::middleware::auth::auth_middleware;
use crate::backend::realtime::socket::ws_handler;
use crate::backend::server::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let gateway_routes = Router::new()
        .route(
            "/ocurrences/{occurrence_id}/chat",
            post(handlers::create_chat),
        )
        .route("/ocurrences/announce", post(handlers::announce_occurrence))
        .route("/chats/{chat_id}/messages", get(handlers::get_chat_messages))
        .route("/chats/{chat_id}/status", get(handlers::get_chat_status))
        .route("/chats/{chat_id}/close", post(handlers::close_chat))
        .route("/notifications", post(handlers::notify_user))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/ws", get(ws_handler))
        .merge(gateway_routes)
        .layer(TraceLayer::new_for_http())
        .fallback(|| async { "404 Not Found" })
        .with_state(app_state)
}
