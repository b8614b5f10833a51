//! Threat report intake and review

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{Actor, Operation};
use crate::db::Stores;
use crate::domain::{
    non_blank, now, parse_date_time, CaseFilter, NewReport, ReportFilter, ReportStatus,
    ReviewDecision, ThreatReport,
};
use crate::logging::{AuditEvent, AuditEventType, AuditLogger};
use crate::types::{Result, WildwatchError};

/// Outcome of a hard delete
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedReport {
    pub report_id: String,
    /// Cases opened from the report; they keep their snapshot
    pub referencing_cases: Vec<String>,
}

#[derive(Clone)]
pub struct ReportIntake {
    stores: Stores,
    audit: AuditLogger,
}

impl ReportIntake {
    pub fn new(stores: Stores, audit: AuditLogger) -> Self {
        Self { stores, audit }
    }

    /// Validate and store a new report as PENDING
    pub async fn submit(&self, actor: &Actor, input: NewReport) -> Result<ThreatReport> {
        actor.require(Operation::SubmitReport)?;

        let threat_type = input
            .threat_type
            .ok_or_else(|| WildwatchError::Validation("threatType is required".into()))?;
        let description = non_blank(input.description)
            .ok_or_else(|| WildwatchError::Validation("description is required".into()))?;
        let date_time = parse_date_time(input.date_time.as_deref().unwrap_or_default())?;
        let location = input
            .location
            .ok_or_else(|| WildwatchError::Validation("location is required".into()))?;
        location.validate()?;
        let reporter = input
            .reporter_info
            .ok_or_else(|| WildwatchError::Validation("reporterInfo is required".into()))?
            .into_reporter()?;
        if let Some(item) = input.media.iter().find(|m| m.url.trim().is_empty()) {
            return Err(WildwatchError::Validation(format!(
                "media item of type {:?} has no url",
                item.media_type
            )));
        }

        // Anonymous submissions are not linked to the submitting account
        let submitted_by = if reporter.is_anonymous() {
            None
        } else {
            Some(actor.id.clone())
        };

        let report = ThreatReport {
            report_id: Uuid::new_v4().to_string(),
            threat_type,
            description,
            date_time,
            urgency_level: input.urgency_level.unwrap_or_default(),
            location,
            reporter,
            submitted_by,
            media: input.media,
            status: ReportStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now(),
        };
        self.stores.reports.insert_report(&report).await?;

        info!(
            report_id = %report.report_id,
            threat_type = %report.threat_type,
            urgency = %report.urgency_level,
            anonymous = report.reporter.is_anonymous(),
            "Threat report submitted"
        );
        self.audit
            .log(AuditEvent::new(AuditEventType::ReportSubmitted, actor).with_report(&report.report_id))
            .await;
        Ok(report)
    }

    /// Validate or reject a PENDING report
    pub async fn review(
        &self,
        actor: &Actor,
        report_id: &str,
        decision: ReviewDecision,
    ) -> Result<ThreatReport> {
        actor.require(Operation::ReviewReport)?;
        let report = self.load(report_id).await?;
        if report.status != ReportStatus::Pending {
            return Err(WildwatchError::InvalidReportTransition(format!(
                "report {} is already {}",
                report_id, report.status
            )));
        }

        let mut reviewed = report;
        reviewed.status = decision.target_status();
        reviewed.reviewed_by = Some(actor.id.clone());
        reviewed.reviewed_at = Some(now());

        if !self.stores.reports.commit_review(&reviewed).await? {
            return Err(WildwatchError::InvalidReportTransition(format!(
                "report {} was reviewed concurrently",
                report_id
            )));
        }

        info!(report_id = %report_id, status = %reviewed.status, by = %actor.id, "Report reviewed");
        self.audit
            .log(
                AuditEvent::new(AuditEventType::ReportReviewed, actor)
                    .with_report(report_id)
                    .with_metadata(serde_json::json!({ "status": reviewed.status })),
            )
            .await;
        Ok(reviewed)
    }

    pub async fn get(&self, actor: &Actor, report_id: &str) -> Result<ThreatReport> {
        let report = self.load(report_id).await?;
        actor.require_owned(
            Operation::ReadAllReports,
            Operation::ReadOwnReports,
            report.submitted_by.as_deref(),
        )?;
        Ok(report)
    }

    /// Reports visible to the actor, newest first. `mine` narrows staff
    /// listings to their own submissions; citizens only ever see theirs.
    pub async fn list(
        &self,
        actor: &Actor,
        status: Option<ReportStatus>,
        mine: bool,
    ) -> Result<Vec<ThreatReport>> {
        let mut filter = ReportFilter {
            status,
            submitted_by: None,
        };
        if mine || !actor.can(Operation::ReadAllReports) {
            actor.require(Operation::ReadOwnReports)?;
            filter.submitted_by = Some(actor.id.clone());
        }
        self.stores.reports.list_reports(&filter).await
    }

    /// Hard delete. Cases opened from the report keep their snapshot.
    pub async fn delete(&self, actor: &Actor, report_id: &str) -> Result<DeletedReport> {
        actor.require(Operation::DeleteReport)?;
        self.load(report_id).await?;

        let referencing_cases: Vec<String> = self
            .stores
            .cases
            .list_cases(&CaseFilter {
                source_report_id: Some(report_id.to_string()),
                ..Default::default()
            })
            .await?
            .into_iter()
            .map(|c| c.case_id)
            .collect();

        if !self.stores.reports.delete_report(report_id).await? {
            return Err(WildwatchError::not_found("report", report_id));
        }

        if !referencing_cases.is_empty() {
            warn!(
                report_id = %report_id,
                cases = ?referencing_cases,
                "Deleted report is still referenced by cases"
            );
        }
        self.audit
            .log(AuditEvent::new(AuditEventType::ReportDeleted, actor).with_report(report_id))
            .await;
        Ok(DeletedReport {
            report_id: report_id.to_string(),
            referencing_cases,
        })
    }

    async fn load(&self, report_id: &str) -> Result<ThreatReport> {
        self.stores
            .reports
            .get_report(report_id)
            .await?
            .ok_or_else(|| WildwatchError::not_found("report", report_id))
    }
}
