/**
 * Relay Error Types
 *
 * This module defines the error taxonomy of the real-time subsystem.
 * Every error is recoverable: validation and state errors are surfaced
 * as an `ERROR` frame to the originating connection, transport failures
 * are logged and the broken peer is evicted, and nothing here may crash
 * the process.
 */

use crate::shared::frame::ErrorCode;
use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the real-time relay
///
/// # Propagation Policy
///
/// - `Unauthenticated`, `NotFound`, `SessionClosed`, `AlreadyClosed`,
///   `Forbidden`, `Persistence` and `BadFrame` are reported to the
///   sender as an `ERROR` frame; the connection stays open.
/// - `Transport` is never put on the wire: the peer whose send failed
///   is silently unregistered and the rest of the fan-out continues.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Operation attempted before authentication succeeded
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Unknown chat session or connection handle
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write attempted on a CLOSED session
    #[error("Session {0} is closed")]
    SessionClosed(Uuid),

    /// Close attempted on a session that is already CLOSED
    ///
    /// Signaled separately from `SessionClosed` so callers can decide
    /// whether to re-broadcast; the REST close handler treats it as a
    /// safe no-op.
    #[error("Session {0} is already closed")]
    AlreadyClosed(Uuid),

    /// Requester is not authorized for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Collaborator call failed or exceeded its timeout
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Send to a peer failed (closed or broken transport)
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Inbound frame could not be decoded
    #[error("Bad frame: {0}")]
    BadFrame(String),

    /// JSON serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelayError {
    /// Wire-level error code for this error, if it is reportable
    ///
    /// # Returns
    ///
    /// `None` for transport failures, which are cleaned up silently
    /// instead of being surfaced to the room.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Unauthenticated(_) => Some(ErrorCode::Unauthenticated),
            Self::NotFound(_) => Some(ErrorCode::NotFound),
            Self::SessionClosed(_) => Some(ErrorCode::SessionClosed),
            Self::AlreadyClosed(_) => Some(ErrorCode::AlreadyClosed),
            Self::Forbidden(_) => Some(ErrorCode::Forbidden),
            Self::Persistence(_) => Some(ErrorCode::PersistenceFailure),
            Self::BadFrame(_) | Self::Serialization(_) => Some(ErrorCode::BadFrame),
            Self::Transport(_) => None,
        }
    }

    /// HTTP status code for the gateway surface
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::SessionClosed(_) | Self::AlreadyClosed(_) | Self::BadFrame(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Persistence(_) | Self::Transport(_) | Self::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Human-readable error message
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<sqlx::Error> for RelayError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}
