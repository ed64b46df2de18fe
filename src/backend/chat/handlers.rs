/**
 * Chat Gateway Handlers
 *
 * Thin HTTP handlers over the session store and the realtime gateway.
 * All routes sit behind the Bearer-token middleware.
 *
 * # Routes
 *
 * - `POST /ocurrences/{occurrence_id}/chat` - get or create the session
 * - `GET  /chats/{chat_id}/messages`        - message history
 * - `GET  /chats/{chat_id}/status`          - existence and open/closed
 * - `POST /chats/{chat_id}/close`           - close cascade
 * - `POST /notifications`                   - per-user notification push
 * - `POST /ocurrences/announce`             - system-wide announcement
 */

use crate::backend::error::RelayError;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::types::OccurrenceSummary;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use uuid::Uuid;

/// POST /ocurrences/{occurrence_id}/chat
///
/// Idempotent: returns the existing session (200) or creates a new
/// OPEN one (201). The requesting user becomes the session owner.
pub async fn create_chat(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(occurrence_id): Path<Uuid>,
) -> Result<impl IntoResponse, RelayError> {
    let existed = state.store.find_session(occurrence_id).await?.is_some();
    let session = state
        .sessions
        .get_or_create(occurrence_id, user.user_id)
        .await?;

    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(session)))
}

/// GET /chats/{chat_id}/messages
pub async fn get_chat_messages(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(chat_id): Path<Uuid>,
) -> Result<impl IntoResponse, RelayError> {
    // Resolve first so an unknown chat is a 404, not an empty list
    state.sessions.get(chat_id).await?;
    let messages = state.store.list_messages(chat_id).await?;
    Ok(Json(messages))
}

/// GET /chats/{chat_id}/status
pub async fn get_chat_status(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(chat_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.sessions.get(chat_id).await {
        Ok(session) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "exists": true,
                "open": session.is_open(),
            })),
        ),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "exists": false,
                "open": false,
            })),
        ),
    }
}

/// POST /chats/{chat_id}/close
///
/// Runs the full close cascade. A session that is already closed is a
/// safe no-op here; the caller got what it asked for.
pub async fn close_chat(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(chat_id): Path<Uuid>,
) -> Result<impl IntoResponse, RelayError> {
    match state
        .gateway
        .request_session_close(chat_id, user.user_id, user.role.as_deref())
        .await
    {
        Ok(()) | Err(RelayError::AlreadyClosed(_)) => Ok(Json(serde_json::json!({
            "message": "Chat closed",
        }))),
        Err(err) => Err(err),
    }
}

/// Body of POST /notifications
#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
}

/// POST /notifications
pub async fn notify_user(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(req): Json<NotifyRequest>,
) -> Result<impl IntoResponse, RelayError> {
    let notification = state
        .gateway
        .user_notification(req.user_id, &req.title, &req.body)
        .await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

/// POST /ocurrences/announce
///
/// Called by the occurrence controller after a report is stored.
pub async fn announce_occurrence(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(summary): Json<OccurrenceSummary>,
) -> impl IntoResponse {
    state.gateway.occurrence_created(summary);
    StatusCode::ACCEPTED
}
