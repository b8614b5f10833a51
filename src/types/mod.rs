//! Shared types for Wildwatch

pub mod error;

pub use error::{Result, WildwatchError};
