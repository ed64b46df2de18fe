//! Real-time Delivery
//!
//! Fan-out (`broadcast`), the WebSocket lifecycle handler (`socket`)
//! and the REST-facing gateway (`gateway`).

pub mod broadcast;
pub mod gateway;
pub mod socket;

pub use broadcast::BroadcastEngine;
pub use gateway::RealtimeGateway;
