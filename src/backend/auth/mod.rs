//! Authentication Capability
//!
//! The relay consumes authentication as a capability: JWT verification
//! (`sessions`) and the close authorization predicate (`policy`). It
//! never stores credentials or issues production tokens.

pub mod policy;
pub mod sessions;

pub use policy::CloseAuthorizer;
pub use sessions::{Claims, TokenVerifier};
