//! Case lifecycle: creation, assignment, transitions and updates
//!
//! Every header write follows the same shape: load, check policy and state,
//! compute the next case, then commit with a compare-and-swap on `version`.
//! Of two racing writers only one commits; the other sees
//! `ConcurrentModification`. Notifications go out after the commit.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::directory::Directory;
use super::dispatcher::NotificationDispatcher;
use crate::auth::{Actor, Operation};
use crate::db::Stores;
use crate::domain::{
    non_blank, now, parse_date_time, Case, CasePatch, CaseQuery, CaseStats, CaseStatus,
    Investigation, NewCase, NotificationType, Priority, Resolution, ResolutionInput,
    TransitionRequest,
};
use crate::logging::{AuditEvent, AuditEventType, AuditLogger};
use crate::types::{Result, WildwatchError};

/// Body of `PATCH /cases/{id}/assign`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub officer_id: String,
    #[serde(default)]
    pub assigned_team: Option<String>,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl AssignRequest {
    pub fn officer(officer_id: &str) -> Self {
        Self {
            officer_id: officer_id.to_string(),
            assigned_team: None,
            expected_version: None,
        }
    }
}

/// One page of a case listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CasePage {
    pub cases: Vec<Case>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

/// Human-readable case id, e.g. `CASE-20260314-9F1C2A7B`
pub fn generate_case_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("CASE-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

#[derive(Clone)]
pub struct CaseLifecycle {
    stores: Stores,
    directory: Directory,
    dispatcher: NotificationDispatcher,
    audit: AuditLogger,
}

impl CaseLifecycle {
    pub fn new(
        stores: Stores,
        directory: Directory,
        dispatcher: NotificationDispatcher,
        audit: AuditLogger,
    ) -> Self {
        Self {
            stores,
            directory,
            dispatcher,
            audit,
        }
    }

    /// Open a case, optionally snapshotting a source report
    pub async fn create(&self, actor: &Actor, input: NewCase) -> Result<Case> {
        actor.require(Operation::CreateCase)?;

        let source_report_id = non_blank(input.source_report_id);
        let source = match source_report_id.as_deref() {
            Some(report_id) => {
                let report = self.stores.reports.get_report(report_id).await?;
                if report.is_none() {
                    warn!(
                        report_id = %report_id,
                        "Source report not found, opening case from supplied fields"
                    );
                }
                report
            }
            None => None,
        };

        let reporter = match (&source, input.reporter_info) {
            (Some(report), _) => Some(report.reporter.clone()),
            (None, Some(info)) => Some(info.into_reporter()?),
            (None, None) => None,
        };
        let threat_type = source
            .as_ref()
            .map(|r| r.threat_type)
            .or(input.threat_type)
            .ok_or_else(|| WildwatchError::Validation("threatType is required".into()))?;
        let location = source
            .as_ref()
            .map(|r| r.location.clone())
            .or(input.location)
            .ok_or_else(|| WildwatchError::Validation("location is required".into()))?;
        location.validate()?;
        let date_time = match (&source, input.date_time.as_deref()) {
            (Some(report), _) => report.date_time,
            (None, Some(raw)) => parse_date_time(raw)?,
            (None, None) => now(),
        };
        let description = non_blank(input.description)
            .or_else(|| source.as_ref().map(|r| r.description.clone()))
            .unwrap_or_default();
        let priority = input
            .priority
            .or_else(|| source.as_ref().map(|r| r.urgency_level))
            .unwrap_or_default();

        let at = now();
        let case = Case {
            case_id: generate_case_id(),
            source_report_id,
            threat_type,
            description,
            location,
            reporter,
            reported_by: source.as_ref().and_then(|r| r.submitted_by.clone()),
            date_time,
            priority,
            status: CaseStatus::New,
            assigned_officer: None,
            assigned_team: non_blank(input.assigned_team),
            investigation: Investigation::default(),
            resolution: None,
            created_at: at,
            updated_at: at,
            version: 0,
        };
        self.stores.cases.insert_case(&case).await?;

        info!(
            case_id = %case.case_id,
            source_report = ?case.source_report_id,
            priority = %case.priority,
            "Case opened"
        );
        self.audit
            .log(AuditEvent::new(AuditEventType::CaseCreated, actor).with_case(&case.case_id))
            .await;

        if case.priority == Priority::Critical {
            self.urgent_alert(&case, &actor.id).await;
        }
        Ok(case)
    }

    /// Assign an officer; allowed in every state except CLOSED
    pub async fn assign(&self, actor: &Actor, case_id: &str, request: AssignRequest) -> Result<Case> {
        actor.require(Operation::AssignCase)?;
        let case = self.load(case_id).await?;
        if case.status.is_terminal() {
            return Err(WildwatchError::InvalidState(format!(
                "case {} is closed and cannot be reassigned",
                case_id
            )));
        }
        check_version(&case, request.expected_version)?;
        let officer = self.directory.officer(&request.officer_id).await?;

        let mut next = case.clone();
        next.assigned_officer = Some(officer.id.clone());
        if let Some(team) = non_blank(request.assigned_team) {
            next.assigned_team = Some(team);
        }
        next.updated_at = now();
        self.stores.cases.commit_case(&next, case.version).await?;

        info!(case_id = %case_id, officer = %officer.id, by = %actor.id, "Case assigned");
        self.audit
            .log(
                AuditEvent::new(AuditEventType::CaseAssigned, actor)
                    .with_case(case_id)
                    .with_metadata(serde_json::json!({ "officerId": officer.id })),
            )
            .await;
        self.dispatcher
            .fan_out(
                [officer.id.clone()],
                &actor.id,
                NotificationType::CaseAssigned,
                &format!("You have been assigned case {}", case_id),
                Some(case_id),
            )
            .await;

        self.reload(next).await
    }

    /// Move a case along the status chain
    pub async fn transition(
        &self,
        actor: &Actor,
        case_id: &str,
        request: TransitionRequest,
    ) -> Result<Case> {
        actor.require(Operation::TransitionCase)?;
        let case = self.load(case_id).await?;
        check_version(&case, request.expected_version)?;
        let target = request.status;

        let mut working = case.clone();
        let mut newly_assigned = None;
        if let Some(officer_id) = non_blank(request.officer_id) {
            if !(case.status == CaseStatus::New && target == CaseStatus::InProgress) {
                return Err(WildwatchError::Validation(
                    "officerId can only accompany NEW -> IN_PROGRESS".into(),
                ));
            }
            let officer = self.directory.officer(&officer_id).await?;
            if working.assigned_officer.as_deref() != Some(officer.id.as_str()) {
                newly_assigned = Some(officer.id.clone());
            }
            working.assigned_officer = Some(officer.id);
        }

        let resolution = match request.resolution {
            Some(input) if target == CaseStatus::Resolved && case.status.can_transition_to(target) => {
                Some(build_resolution(input, &actor.id)?)
            }
            _ => None,
        };

        let next = working.transitioned(target, resolution, now())?;
        self.stores.cases.commit_case(&next, case.version).await?;

        info!(
            case_id = %case_id,
            from = %case.status,
            to = %target,
            by = %actor.id,
            "Case status changed"
        );
        self.audit
            .log(
                AuditEvent::new(AuditEventType::CaseTransitioned, actor)
                    .with_case(case_id)
                    .with_transition(case.status, target),
            )
            .await;

        if let Some(officer_id) = newly_assigned {
            self.dispatcher
                .fan_out(
                    [officer_id],
                    &actor.id,
                    NotificationType::CaseAssigned,
                    &format!("You have been assigned case {}", case_id),
                    Some(case_id),
                )
                .await;
        }

        let (kind, message) = if target == CaseStatus::Resolved {
            (
                NotificationType::Resolution,
                format!("Case {} has been resolved", case_id),
            )
        } else {
            (
                NotificationType::StatusUpdate,
                format!("Case {} status changed from {} to {}", case_id, case.status, target),
            )
        };
        let recipients = next
            .reported_by
            .iter()
            .chain(next.assigned_officer.iter())
            .cloned()
            .collect::<Vec<_>>();
        self.dispatcher
            .fan_out(recipients, &actor.id, kind, &message, Some(case_id))
            .await;

        self.reload(next).await
    }

    /// Shorthand for a transition to RESOLVED
    pub async fn resolve(
        &self,
        actor: &Actor,
        case_id: &str,
        resolution: ResolutionInput,
        expected_version: Option<u64>,
    ) -> Result<Case> {
        let request = TransitionRequest {
            status: CaseStatus::Resolved,
            resolution: Some(resolution),
            officer_id: None,
            expected_version,
        };
        self.transition(actor, case_id, request).await
    }

    /// Edit non-status fields
    pub async fn update(&self, actor: &Actor, case_id: &str, patch: CasePatch) -> Result<Case> {
        actor.require(Operation::UpdateCase)?;
        let case = self.load(case_id).await?;
        if case.status.is_terminal() {
            return Err(WildwatchError::InvalidState(format!(
                "case {} is closed",
                case_id
            )));
        }
        if patch.is_empty() {
            return Err(WildwatchError::Validation("nothing to update".into()));
        }
        check_version(&case, patch.expected_version)?;

        let mut next = case.clone();
        if let Some(priority) = patch.priority {
            next.priority = priority;
        }
        if let Some(threat_type) = patch.threat_type {
            next.threat_type = threat_type;
        }
        if let Some(description) = patch.description {
            next.description = description.trim().to_string();
        }
        if let Some(location) = patch.location {
            location.validate()?;
            next.location = location;
        }
        if let Some(raw) = patch.date_time.as_deref() {
            next.date_time = parse_date_time(raw)?;
        }
        if let Some(team) = patch.assigned_team {
            next.assigned_team = non_blank(Some(team));
        }
        next.updated_at = now();
        self.stores.cases.commit_case(&next, case.version).await?;

        self.audit
            .log(AuditEvent::new(AuditEventType::CaseUpdated, actor).with_case(case_id))
            .await;

        if next.priority == Priority::Critical && case.priority != Priority::Critical {
            self.urgent_alert(&next, &actor.id).await;
        }
        self.reload(next).await
    }

    pub async fn get(&self, actor: &Actor, case_id: &str) -> Result<Case> {
        let case = self.load(case_id).await?;
        actor.require_owned(
            Operation::ReadAllCases,
            Operation::ReadOwnCases,
            case.reported_by.as_deref(),
        )?;
        Ok(case)
    }

    /// Filtered, sorted and paged listing. Citizens only see their own cases.
    pub async fn list(&self, actor: &Actor, mut query: CaseQuery) -> Result<CasePage> {
        if !actor.can(Operation::ReadAllCases) {
            actor.require(Operation::ReadOwnCases)?;
            query.filter.reported_by = Some(actor.id.clone());
        }
        let mut cases = self.stores.cases.list_cases(&query.filter).await?;
        query.sort(&mut cases);

        let total = cases.len();
        let page = query.page.max(1);
        let limit = query.limit.max(1);
        let start = ((page - 1) as usize).saturating_mul(limit as usize);
        let cases = cases
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .collect();

        Ok(CasePage {
            cases,
            total,
            page,
            limit,
        })
    }

    pub async fn stats(&self, actor: &Actor) -> Result<CaseStats> {
        actor.require(Operation::ViewCaseStats)?;
        let cases = self
            .stores
            .cases
            .list_cases(&Default::default())
            .await?;
        Ok(CaseStats::from_cases(&cases))
    }

    /// Hard delete. The ledger goes with the case; notifications stay.
    pub async fn delete(&self, actor: &Actor, case_id: &str) -> Result<()> {
        actor.require(Operation::DeleteCase)?;
        if !self.stores.cases.delete_case(case_id).await? {
            return Err(WildwatchError::not_found("case", case_id));
        }
        info!(case_id = %case_id, by = %actor.id, "Case deleted");
        self.audit
            .log(AuditEvent::new(AuditEventType::CaseDeleted, actor).with_case(case_id))
            .await;
        Ok(())
    }

    async fn load(&self, case_id: &str) -> Result<Case> {
        self.stores
            .cases
            .get_case(case_id)
            .await?
            .ok_or_else(|| WildwatchError::not_found("case", case_id))
    }

    /// Stored state after a commit, including ledger entries appended meanwhile
    async fn reload(&self, committed: Case) -> Result<Case> {
        match self.stores.cases.get_case(&committed.case_id).await? {
            Some(case) => Ok(case),
            None => Err(WildwatchError::not_found("case", &committed.case_id)),
        }
    }

    /// Runs after the commit; failures are logged, never returned
    async fn urgent_alert(&self, case: &Case, actor_id: &str) {
        let recipients = match case.assigned_officer.clone() {
            Some(officer) => vec![officer],
            None => match self.directory.alert_recipients().await {
                Ok(recipients) => recipients,
                Err(e) => {
                    warn!(
                        case_id = %case.case_id,
                        error = %e,
                        "Could not look up alert recipients"
                    );
                    return;
                }
            },
        };
        let sent = self
            .dispatcher
            .fan_out(
                recipients,
                actor_id,
                NotificationType::UrgentAlert,
                &format!(
                    "URGENT: {} case {} needs attention",
                    case.threat_type, case.case_id
                ),
                Some(&case.case_id),
            )
            .await;
        info!(case_id = %case.case_id, recipients = sent, "Urgent alert dispatched");
    }
}

fn check_version(case: &Case, expected: Option<u64>) -> Result<()> {
    match expected {
        Some(v) if v != case.version => Err(WildwatchError::ConcurrentModification(format!(
            "case {} is at version {}, not {}",
            case.case_id, case.version, v
        ))),
        _ => Ok(()),
    }
}

fn build_resolution(input: ResolutionInput, actor_id: &str) -> Result<Resolution> {
    let action_summary = non_blank(Some(input.action_summary))
        .ok_or_else(|| WildwatchError::Validation("resolution.actionSummary is required".into()))?;
    Ok(Resolution {
        action_summary,
        outcome: non_blank(input.outcome),
        resolved_at: now(),
        resolved_by: actor_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_id_shape() {
        let id = generate_case_id();
        let parts: Vec<_> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "CASE");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_blank_summary_is_validation() {
        let input = ResolutionInput {
            action_summary: "  ".into(),
            outcome: None,
        };
        assert!(matches!(
            build_resolution(input, "o1"),
            Err(WildwatchError::Validation(_))
        ));
    }

    #[test]
    fn test_version_check() {
        let case: Case = serde_json::from_value(serde_json::json!({
            "caseId": "CASE-1",
            "threatType": "OTHER",
            "location": {"lat": 0.0, "lng": 0.0},
            "dateTime": "2026-01-01T00:00:00Z",
            "priority": "LOW",
            "status": "NEW",
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:00Z",
            "version": 3
        }))
        .unwrap();
        assert!(check_version(&case, None).is_ok());
        assert!(check_version(&case, Some(3)).is_ok());
        assert!(matches!(
            check_version(&case, Some(2)),
            Err(WildwatchError::ConcurrentModification(_))
        ));
    }
}
