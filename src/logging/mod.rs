//! Logging infrastructure for Wildwatch
//!
//! Diagnostics go through `tracing`; committed lifecycle changes are also
//! written to a JSONL audit trail.

pub mod audit;

pub use audit::{AuditEvent, AuditEventType, AuditLogger};
