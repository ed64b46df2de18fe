//! vigia - real-time transport subsystem for citizen incident reporting
//!
//! Keeps a registry of live client connections, associates them with
//! chat sessions tied to occurrence reports, routes inbound events,
//! persists messages through the store collaborator and fans events
//! out to the correct set of subscribers.

pub mod backend;
pub mod shared;
