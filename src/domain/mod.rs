//! Domain model for the lifecycle engine
//!
//! Plain data types shared by the stores, services and routes. State machine
//! rules live next to the types they govern (see [`case::CaseStatus`]).

pub mod case;
pub mod investigation;
pub mod notification;
pub mod report;
pub mod staff;

use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::types::{Result, WildwatchError};

pub use case::{
    Case, CaseFilter, CasePatch, CaseQuery, CaseStats, CaseStatus, NewCase, Priority, Resolution,
    ResolutionInput, SortDir, SortField, StatusCount, TransitionRequest,
};
pub use investigation::{
    ActionInput, ActionTaken, Evidence, EvidenceInput, EvidenceType, Finding, FindingInput,
    Investigation, LedgerAppend, LedgerEntry, LedgerInput,
};
pub use notification::{Notification, NotificationStats, NotificationType};
pub use report::{
    Location, MediaItem, MediaType, NewReport, ReportFilter, ReportStatus, Reporter,
    ReporterInput, ReviewDecision, ThreatReport, ThreatType, UrgencyLevel,
};
pub use staff::{Department, NewStaffMember, StaffMember, StaffPatch, UserAccount};

static LAST_MICROS: AtomicI64 = AtomicI64::new(0);

/// Current time, strictly increasing within the process.
///
/// Ledger entries, notifications and cases are ordered by their timestamps,
/// so two events recorded in the same microsecond must still compare apart.
pub fn now() -> DateTime<Utc> {
    let wall = Utc::now().timestamp_micros();
    let mut prev = LAST_MICROS.load(Ordering::Relaxed);
    loop {
        let next = if wall > prev { wall } else { prev + 1 };
        match LAST_MICROS.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return DateTime::from_timestamp_micros(next).unwrap_or_else(Utc::now),
            Err(actual) => prev = actual,
        }
    }
}

/// Parse a client-supplied date/time.
///
/// Accepts RFC 3339 and the `YYYY-MM-DDTHH:MM[:SS]` form produced by HTML
/// datetime-local inputs (interpreted as UTC).
pub fn parse_date_time(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(WildwatchError::Validation("dateTime is required".into()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(WildwatchError::Validation(format!(
        "dateTime '{}' is not a valid date/time",
        raw
    )))
}

/// Trim an optional string, dropping it when blank
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_strictly_increasing() {
        let mut last = now();
        for _ in 0..1000 {
            let next = now();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn test_parse_date_time_formats() {
        assert!(parse_date_time("2026-03-01T10:15:00Z").is_ok());
        assert!(parse_date_time("2026-03-01T10:15:00+02:00").is_ok());
        assert!(parse_date_time("2026-03-01T10:15").is_ok());
        assert!(parse_date_time("2026-03-01T10:15:30").is_ok());
        assert!(parse_date_time("yesterday").is_err());
        assert!(parse_date_time("  ").is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ".into())), Some("x".into()));
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
    }
}
