//! Authentication and authorization for Wildwatch
//!
//! Provides:
//! - Session JWT verification
//! - The role/capability policy consulted by every engine operation
//! - The `Actor` passed into each call

pub mod actor;
pub mod jwt;
pub mod permissions;

pub use actor::Actor;
pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use permissions::{can, can_access_owned, Capability, Operation, Role};
