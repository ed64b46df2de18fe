//! Backend Server
//!
//! The real-time transport subsystem of the incident reporting
//! backend: connection registry, chat session store, message router,
//! broadcast engine and the WebSocket lifecycle, plus the thin gateway
//! surface the REST layer calls into.

pub mod auth;
pub mod chat;
pub mod error;
pub mod middleware;
pub mod realtime;
pub mod registry;
pub mod routes;
pub mod server;
pub mod store;
