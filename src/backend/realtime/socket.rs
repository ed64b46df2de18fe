/**
 * WebSocket Lifecycle Handler
 *
 * Implements the per-connection state machine
 * CONNECTED -> AUTHENTICATED -> IN_ROOM -> CLOSED over an axum
 * WebSocket upgrade at `GET /ws`.
 *
 * One writer task drains the connection's outbound channel; the reader
 * loop processes inbound frames strictly in arrival order. Graceful
 * close, transport error and writer failure all funnel into
 * `Registry::unregister` — sessions outlive their connections.
 */

use crate::backend::server::state::AppState;
use crate::shared::frame::{ClientFrame, ServerFrame};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

/// Query parameters of the upgrade request
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Optional JWT; clients may instead send an `AUTHENTICATE` frame
    /// after the upgrade
    pub token: Option<String>,
}

/// Handle the WebSocket upgrade (GET /ws)
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.token))
}

/// Drive one connection from accept to cleanup
async fn handle_socket(socket: WebSocket, state: AppState, token: Option<String>) {
    let (mut sink, mut stream) = socket.split();

    // Outbound path: everything addressed to this connection goes
    // through the channel and out via this single writer task.
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let conn = state.registry.register(tx);
    let conn_id = conn.id;

    let writer = tokio::spawn(async move {
        while let Some(json) = rx.recv().await {
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    tracing::info!("[Realtime] Connection {} accepted", conn_id);
    state.broadcast.to_connection(&conn, &ServerFrame::welcome());

    // A token on the upgrade query authenticates immediately, through
    // the same path as the explicit frame.
    if let Some(token) = token {
        state
            .router
            .handle_frame(&conn, ClientFrame::Authenticate { token })
            .await;
    }

    // Inbound path: frames from this connection, in arrival order
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(text.as_str()) {
                Ok(frame) => state.router.handle_frame(&conn, frame).await,
                Err(e) => state.router.report_bad_frame(&conn, e.to_string()),
            },
            Ok(Message::Close(_)) => {
                tracing::debug!("[Realtime] Connection {} closed gracefully", conn_id);
                break;
            }
            // Protocol pings/pongs are answered by axum; binary is not
            // part of the frame vocabulary
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("[Realtime] Connection {} transport error: {}", conn_id, e);
                break;
            }
        }
    }

    // Cleanup runs for graceful and abrupt disconnects alike. Aborting
    // the writer cancels only this connection's in-flight sends.
    state.registry.unregister(conn_id);
    writer.abort();
    tracing::info!("[Realtime] Connection {} cleaned up", conn_id);
}
