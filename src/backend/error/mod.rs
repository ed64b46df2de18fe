//! Relay Error Module
//!
//! This module defines the error taxonomy of the real-time subsystem
//! and its conversions to wire error codes and HTTP responses.
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports
//! ├── types.rs      - Error type definitions and code mappings
//! └── conversion.rs - IntoResponse implementation for gateway handlers
//! ```

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use types::RelayError;

/// Convenience alias used throughout the backend
pub type Result<T> = std::result::Result<T, RelayError>;
