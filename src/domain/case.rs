//! Cases and the status state machine
//!
//! ```text
//! NEW ──► IN_PROGRESS ──► UNDER_INVESTIGATION ──► RESOLVED ──► CLOSED
//! ```
//!
//! The graph is a single forward chain. CLOSED is terminal and is reachable
//! only from RESOLVED, so an unresolved case can never be closed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::investigation::Investigation;
use super::report::{Location, Reporter, ReporterInput, ThreatType};
use crate::types::{Result, WildwatchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    New,
    InProgress,
    UnderInvestigation,
    Resolved,
    Closed,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 5] = [
        CaseStatus::New,
        CaseStatus::InProgress,
        CaseStatus::UnderInvestigation,
        CaseStatus::Resolved,
        CaseStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::New => "NEW",
            CaseStatus::InProgress => "IN_PROGRESS",
            CaseStatus::UnderInvestigation => "UNDER_INVESTIGATION",
            CaseStatus::Resolved => "RESOLVED",
            CaseStatus::Closed => "CLOSED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(raw.trim()))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::Closed)
    }

    /// The only status reachable from this one, if any
    pub fn successor(&self) -> Option<CaseStatus> {
        match self {
            CaseStatus::New => Some(CaseStatus::InProgress),
            CaseStatus::InProgress => Some(CaseStatus::UnderInvestigation),
            CaseStatus::UnderInvestigation => Some(CaseStatus::Resolved),
            CaseStatus::Resolved => Some(CaseStatus::Closed),
            CaseStatus::Closed => None,
        }
    }

    pub fn can_transition_to(&self, target: CaseStatus) -> bool {
        self.successor() == Some(target)
    }

    /// Statuses in which a resolution record must be present
    pub fn requires_resolution(&self) -> bool {
        matches!(self, CaseStatus::Resolved | CaseStatus::Closed)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case priority; also the urgency scale of threat reports
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub action_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    pub resolved_at: DateTime<Utc>,
    pub resolved_by: String,
}

/// Resolution payload supplied by the resolving officer
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionInput {
    #[serde(default)]
    pub action_summary: String,
    #[serde(default)]
    pub outcome: Option<String>,
}

/// A tracked case
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub case_id: String,
    /// Soft back-reference; the report may since have been deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_report_id: Option<String>,
    pub threat_type: ThreatType,
    #[serde(default)]
    pub description: String,
    pub location: Location,
    /// Reporter snapshot taken when the case was opened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<Reporter>,
    /// Account of the identified reporter, for ownership and notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_by: Option<String>,
    pub date_time: DateTime<Utc>,
    pub priority: Priority,
    pub status: CaseStatus,
    #[serde(default)]
    pub assigned_officer: Option<String>,
    #[serde(default)]
    pub assigned_team: Option<String>,
    #[serde(default)]
    pub investigation: Investigation,
    #[serde(default)]
    pub resolution: Option<Resolution>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl Case {
    /// `resolution` is present exactly when the status demands it
    pub fn invariants_hold(&self) -> bool {
        self.resolution.is_some() == self.status.requires_resolution()
    }

    /// Compute the case after moving to `target`.
    ///
    /// Pure: the caller commits the result. `resolution` is required (and only
    /// used) when entering RESOLVED; the existing resolution is carried into
    /// CLOSED unchanged.
    pub fn transitioned(
        &self,
        target: CaseStatus,
        resolution: Option<Resolution>,
        at: DateTime<Utc>,
    ) -> Result<Case> {
        if !self.status.can_transition_to(target) {
            let reason = match self.status.successor() {
                None => "case is closed".to_string(),
                Some(next) => format!("the only allowed next status is {}", next),
            };
            return Err(WildwatchError::InvalidTransition {
                from: self.status,
                to: target,
                reason,
            });
        }

        let mut next = self.clone();
        match target {
            CaseStatus::InProgress if self.assigned_officer.is_none() => {
                return Err(WildwatchError::InvalidTransition {
                    from: self.status,
                    to: target,
                    reason: "an officer must be assigned first".into(),
                });
            }
            CaseStatus::Resolved => match resolution {
                Some(r) => next.resolution = Some(r),
                None => {
                    return Err(WildwatchError::InvalidTransition {
                        from: self.status,
                        to: target,
                        reason: "a resolution is required".into(),
                    })
                }
            },
            _ => {}
        }

        next.status = target;
        next.updated_at = at;
        debug_assert!(next.invariants_hold());
        Ok(next)
    }

    /// Case-insensitive free-text match used by listings
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.case_id.to_lowercase().contains(&needle)
            || self.threat_type.as_str().to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self
                .location
                .address
                .as_deref()
                .map(|a| a.to_lowercase().contains(&needle))
                .unwrap_or(false)
    }
}

/// Case creation body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCase {
    #[serde(default)]
    pub source_report_id: Option<String>,
    #[serde(default)]
    pub threat_type: Option<ThreatType>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub reporter_info: Option<ReporterInput>,
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assigned_team: Option<String>,
}

/// Non-status case fields an officer may edit.
///
/// Unknown keys are rejected, which keeps `status`, `investigation`,
/// `assignedOfficer` and `resolution` out of plain updates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CasePatch {
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub threat_type: Option<ThreatType>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub assigned_team: Option<String>,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl CasePatch {
    pub fn is_empty(&self) -> bool {
        self.priority.is_none()
            && self.threat_type.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.date_time.is_none()
            && self.assigned_team.is_none()
    }
}

/// Body of `PATCH /cases/{id}/transition`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub status: CaseStatus,
    #[serde(default)]
    pub resolution: Option<ResolutionInput>,
    /// Assign this officer as part of NEW → IN_PROGRESS
    #[serde(default)]
    pub officer_id: Option<String>,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl TransitionRequest {
    pub fn to(status: CaseStatus) -> Self {
        Self {
            status,
            resolution: None,
            officer_id: None,
            expected_version: None,
        }
    }

    pub fn with_resolution(mut self, summary: &str, outcome: Option<&str>) -> Self {
        self.resolution = Some(ResolutionInput {
            action_summary: summary.to_string(),
            outcome: outcome.map(str::to_string),
        });
        self
    }

    pub fn with_officer(mut self, officer_id: &str) -> Self {
        self.officer_id = Some(officer_id.to_string());
        self
    }
}

/// Listing filters. All present criteria must match.
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    pub priority: Option<Priority>,
    pub threat_type: Option<ThreatType>,
    pub search: Option<String>,
    pub reported_by: Option<String>,
    pub source_report_id: Option<String>,
}

impl CaseFilter {
    pub fn matches(&self, case: &Case) -> bool {
        if self.status.is_some_and(|s| s != case.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != case.priority) {
            return false;
        }
        if self.threat_type.is_some_and(|t| t != case.threat_type) {
            return false;
        }
        if let Some(ref reporter) = self.reported_by {
            if case.reported_by.as_deref() != Some(reporter.as_str()) {
                return false;
            }
        }
        if let Some(ref report_id) = self.source_report_id {
            if case.source_report_id.as_deref() != Some(report_id.as_str()) {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => case.matches_text(needle),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Priority,
}

impl SortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" | "created_at" => Some(SortField::CreatedAt),
            "updatedAt" | "updated_at" => Some(SortField::UpdatedAt),
            "priority" => Some(SortField::Priority),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

/// Listing request: filter, ordering and page window
#[derive(Debug, Clone)]
pub struct CaseQuery {
    pub filter: CaseFilter,
    pub sort_by: SortField,
    pub sort_dir: SortDir,
    pub page: u32,
    pub limit: u32,
}

impl Default for CaseQuery {
    fn default() -> Self {
        Self {
            filter: CaseFilter::default(),
            sort_by: SortField::CreatedAt,
            sort_dir: SortDir::Desc,
            page: 1,
            limit: 50,
        }
    }
}

impl CaseQuery {
    /// Parse `status=..&priority=..&threatType=..&search=..&sortBy=..` style queries.
    /// Unknown enum values are rejected rather than silently ignored.
    pub fn from_query_string(query: Option<&str>) -> Result<Self> {
        let mut params = Self::default();

        if let Some(q) = query {
            for pair in q.split('&') {
                let Some((key, value)) = pair.split_once('=') else {
                    continue;
                };
                let value = urlencoding::decode(&value.replace('+', " "))
                    .map(|v| v.into_owned())
                    .unwrap_or_default();
                if value.is_empty() {
                    continue;
                }
                match key {
                    "status" => {
                        params.filter.status = Some(CaseStatus::parse(&value).ok_or_else(
                            || WildwatchError::Validation(format!("unknown status '{}'", value)),
                        )?)
                    }
                    "priority" => {
                        params.filter.priority = Some(Priority::parse(&value).ok_or_else(
                            || WildwatchError::Validation(format!("unknown priority '{}'", value)),
                        )?)
                    }
                    "threatType" | "threat_type" => {
                        params.filter.threat_type =
                            Some(ThreatType::parse(&value).ok_or_else(|| {
                                WildwatchError::Validation(format!(
                                    "unknown threatType '{}'",
                                    value
                                ))
                            })?)
                    }
                    "search" | "q" => params.filter.search = Some(value),
                    "sortBy" | "sort_by" => {
                        params.sort_by = SortField::parse(&value).ok_or_else(|| {
                            WildwatchError::Validation(format!("cannot sort by '{}'", value))
                        })?
                    }
                    "sortDir" | "sort_dir" => {
                        params.sort_dir = match value.to_ascii_lowercase().as_str() {
                            "asc" => SortDir::Asc,
                            "desc" => SortDir::Desc,
                            _ => {
                                return Err(WildwatchError::Validation(format!(
                                    "sortDir must be asc or desc, not '{}'",
                                    value
                                )))
                            }
                        }
                    }
                    "page" => params.page = value.parse().unwrap_or(1).max(1),
                    "limit" => params.limit = value.parse().unwrap_or(50).clamp(1, 200),
                    _ => {}
                }
            }
        }

        Ok(params)
    }

    /// Sort `cases` in place according to this query. Ties keep creation order.
    pub fn sort(&self, cases: &mut [Case]) {
        cases.sort_by(|a, b| {
            let ord = match self.sort_by {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortField::Priority => a
                    .priority
                    .cmp(&b.priority)
                    .then(a.created_at.cmp(&b.created_at)),
            };
            match self.sort_dir {
                SortDir::Asc => ord,
                SortDir::Desc => ord.reverse(),
            }
        });
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

/// Case overview counts, recomputed on every call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStats {
    pub total: u64,
    pub status_breakdown: Vec<StatusCount>,
    pub priority_breakdown: Vec<StatusCount>,
}

impl CaseStats {
    pub fn from_cases(cases: &[Case]) -> Self {
        let status_breakdown = CaseStatus::ALL
            .into_iter()
            .map(|s| StatusCount {
                status: s.as_str().to_string(),
                count: cases.iter().filter(|c| c.status == s).count() as u64,
            })
            .collect();
        let priority_breakdown = Priority::ALL
            .into_iter()
            .map(|p| StatusCount {
                status: p.as_str().to_string(),
                count: cases.iter().filter(|c| c.priority == p).count() as u64,
            })
            .collect();
        Self {
            total: cases.len() as u64,
            status_breakdown,
            priority_breakdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::now;

    fn sample_case(status: CaseStatus) -> Case {
        let at = now();
        Case {
            case_id: "CASE-20260101-0000ABCD".into(),
            source_report_id: None,
            threat_type: ThreatType::Poaching,
            description: "snare line near the river".into(),
            location: Location {
                lat: -2.3,
                lng: 34.8,
                address: Some("Mara North".into()),
            },
            reporter: Some(Reporter::Anonymous),
            reported_by: None,
            date_time: at,
            priority: Priority::Medium,
            status,
            assigned_officer: Some("officer-1".into()),
            assigned_team: None,
            investigation: Investigation::default(),
            resolution: None,
            created_at: at,
            updated_at: at,
            version: 0,
        }
    }

    fn resolution() -> Resolution {
        Resolution {
            action_summary: "snares removed".into(),
            outcome: None,
            resolved_at: now(),
            resolved_by: "officer-1".into(),
        }
    }

    #[test]
    fn test_forward_chain_only() {
        for from in CaseStatus::ALL {
            for to in CaseStatus::ALL {
                assert_eq!(from.can_transition_to(to), from.successor() == Some(to));
            }
        }
        assert!(!CaseStatus::New.can_transition_to(CaseStatus::Resolved));
        assert!(!CaseStatus::UnderInvestigation.can_transition_to(CaseStatus::Closed));
        assert!(CaseStatus::Closed.successor().is_none());
    }

    #[test]
    fn test_new_to_in_progress_requires_officer() {
        let mut case = sample_case(CaseStatus::New);
        case.assigned_officer = None;
        let err = case
            .transitioned(CaseStatus::InProgress, None, now())
            .unwrap_err();
        assert!(matches!(err, WildwatchError::InvalidTransition { .. }));
    }

    #[test]
    fn test_resolved_requires_resolution() {
        let case = sample_case(CaseStatus::UnderInvestigation);
        assert!(case.transitioned(CaseStatus::Resolved, None, now()).is_err());

        let resolved = case
            .transitioned(CaseStatus::Resolved, Some(resolution()), now())
            .unwrap();
        assert_eq!(resolved.status, CaseStatus::Resolved);
        assert!(resolved.invariants_hold());

        let closed = resolved
            .transitioned(CaseStatus::Closed, None, now())
            .unwrap();
        assert_eq!(closed.resolution, resolved.resolution);
        assert!(closed.invariants_hold());
    }

    #[test]
    fn test_nothing_leaves_closed() {
        let mut case = sample_case(CaseStatus::Closed);
        case.resolution = Some(resolution());
        for target in CaseStatus::ALL {
            assert!(case.transitioned(target, None, now()).is_err());
        }
    }

    #[test]
    fn test_query_parsing() {
        let q = CaseQuery::from_query_string(Some(
            "status=under_investigation&priority=HIGH&threatType=POACHING&search=mara%20north&sortBy=priority&sortDir=asc&page=2&limit=10",
        ))
        .unwrap();
        assert_eq!(q.filter.status, Some(CaseStatus::UnderInvestigation));
        assert_eq!(q.filter.priority, Some(Priority::High));
        assert_eq!(q.filter.threat_type, Some(ThreatType::Poaching));
        assert_eq!(q.filter.search.as_deref(), Some("mara north"));
        assert_eq!(q.sort_by, SortField::Priority);
        assert_eq!(q.sort_dir, SortDir::Asc);
        assert_eq!((q.page, q.limit), (2, 10));

        assert!(CaseQuery::from_query_string(Some("status=LOST")).is_err());
    }

    #[test]
    fn test_sort_direction_must_be_known() {
        let q = CaseQuery::from_query_string(Some("sortDir=DESC")).unwrap();
        assert_eq!(q.sort_dir, SortDir::Desc);
        assert!(matches!(
            CaseQuery::from_query_string(Some("sortDir=sideways")),
            Err(WildwatchError::Validation(_))
        ));
    }

    #[test]
    fn test_filter_combines_with_and() {
        let case = sample_case(CaseStatus::New);
        let mut filter = CaseFilter {
            status: Some(CaseStatus::New),
            search: Some("MARA".into()),
            ..Default::default()
        };
        assert!(filter.matches(&case));
        filter.priority = Some(Priority::Critical);
        assert!(!filter.matches(&case));
    }

    #[test]
    fn test_patch_rejects_status_key() {
        let res: std::result::Result<CasePatch, _> =
            serde_json::from_value(serde_json::json!({"status": "CLOSED"}));
        assert!(res.is_err());
        let res: std::result::Result<CasePatch, _> =
            serde_json::from_value(serde_json::json!({"investigation": {}}));
        assert!(res.is_err());
        let ok: CasePatch =
            serde_json::from_value(serde_json::json!({"priority": "HIGH"})).unwrap();
        assert_eq!(ok.priority, Some(Priority::High));
    }
}
