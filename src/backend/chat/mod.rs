//! Chat Core
//!
//! Session lifecycle state (`sessions`), inbound frame routing
//! (`router`) and the gateway HTTP handlers (`handlers`).

pub mod handlers;
pub mod router;
pub mod sessions;

pub use router::MessageRouter;
pub use sessions::ChatSessionStore;
