//! HTTP server for Wildwatch

pub mod http;

pub use http::{run, AppState};
