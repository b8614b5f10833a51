//! Wildwatch - case and investigation lifecycle engine for wildlife threat reports
//!
//! Citizens submit threat reports; officers review them, open cases, work
//! them through NEW → IN_PROGRESS → UNDER_INVESTIGATION → RESOLVED → CLOSED
//! and keep an append-only investigation ledger on each case. Lifecycle
//! events notify the officers involved.
//!
//! ## Components
//!
//! - **ReportIntake**: report submission and review
//! - **CaseLifecycle**: the case state machine, assignment and updates
//! - **InvestigationLedger**: findings, actions and evidence
//! - **NotificationDispatcher**: lifecycle notifications and read state
//! - **Directory**: accounts, staff profiles and the access policy inputs

pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod logging;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use services::Engine;
pub use types::{Result, WildwatchError};
