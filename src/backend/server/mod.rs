//! Server Wiring
//!
//! Configuration loading, application state and startup assembly.

pub mod config;
pub mod init;
pub mod state;

pub use state::AppState;
