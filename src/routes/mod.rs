//! HTTP routes for Wildwatch

pub mod cases;
pub mod common;
pub mod health;
pub mod notifications;
pub mod reports;
pub mod staff;

pub use cases::handle_cases_request;
pub use common::{authenticate, error_response, json_response, FullBody};
pub use health::{health_check, readiness_check, version_info};
pub use notifications::handle_notifications_request;
pub use reports::handle_reports_request;
pub use staff::{handle_staff_request, handle_users_request};
