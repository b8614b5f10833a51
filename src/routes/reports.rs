//! Threat report routes
//!
//! - `POST   /reports`       submit a report (any signed-in user)
//! - `GET    /reports`       list (`status`, `mine`)
//! - `GET    /reports/{id}`  fetch one
//! - `PATCH  /reports/{id}`  review (`decision`, optional `openCase`)
//! - `DELETE /reports/{id}`  hard delete (admin)

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::common::{
    error_response, method_not_allowed, no_route, query_flag, query_params, query_value,
    read_json, respond, split_id, ErrorResponse, FullBody,
};
use crate::auth::Actor;
use crate::domain::{Case, NewCase, NewReport, Priority, ReportStatus, ReviewDecision, ThreatReport};
use crate::server::AppState;
use crate::types::{Result, WildwatchError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    /// Open a case from the report once it is validated
    #[serde(default)]
    pub open_case: bool,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assigned_team: Option<String>,
}

/// The review itself has committed once this is returned. A case that could
/// not be opened is reported in `caseError`; the client opens it separately
/// with `POST /cases`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub report: ThreatReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<Case>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_error: Option<ErrorResponse>,
}

impl ReviewResponse {
    fn reviewed(report: ThreatReport) -> Self {
        Self {
            report,
            case: None,
            case_error: None,
        }
    }

    fn with_case(mut self, opened: Result<Case>) -> Self {
        match opened {
            Ok(case) => self.case = Some(case),
            Err(e) => {
                warn!(
                    report_id = %self.report.report_id,
                    error = %e,
                    "Report validated but case could not be opened"
                );
                self.case_error = Some(ErrorResponse::from(&e));
            }
        }
        self
    }
}

#[derive(Debug, Serialize)]
pub struct ReportList {
    pub reports: Vec<ThreatReport>,
    pub total: usize,
}

pub async fn handle_reports_request(
    req: Request<Incoming>,
    state: &AppState,
    actor: &Actor,
) -> Response<FullBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if path == "/reports" {
        return match method {
            Method::POST => respond(StatusCode::CREATED, submit(req, state, actor).await),
            Method::GET => respond(StatusCode::OK, list(&req, state, actor).await),
            _ => error_response(&method_not_allowed(&method, &path)),
        };
    }

    let Some((report_id, "")) = split_id(&path, "/reports") else {
        return error_response(&no_route(&path));
    };

    match method {
        Method::GET => respond(StatusCode::OK, state.engine.reports.get(actor, report_id).await),
        Method::PATCH => respond(StatusCode::OK, review(req, state, actor, report_id).await),
        Method::DELETE => respond(
            StatusCode::OK,
            state.engine.reports.delete(actor, report_id).await,
        ),
        _ => error_response(&method_not_allowed(&method, &path)),
    }
}

async fn submit(req: Request<Incoming>, state: &AppState, actor: &Actor) -> Result<ThreatReport> {
    let input: NewReport = read_json(req).await?;
    state.engine.reports.submit(actor, input).await
}

async fn list(req: &Request<Incoming>, state: &AppState, actor: &Actor) -> Result<ReportList> {
    let params = query_params(req.uri().query());
    let status = match query_value(&params, "status") {
        Some(raw) => Some(
            ReportStatus::parse(raw)
                .ok_or_else(|| WildwatchError::Validation(format!("unknown status '{}'", raw)))?,
        ),
        None => None,
    };
    let reports = state
        .engine
        .reports
        .list(actor, status, query_flag(&params, "mine"))
        .await?;
    Ok(ReportList {
        total: reports.len(),
        reports,
    })
}

async fn review(
    req: Request<Incoming>,
    state: &AppState,
    actor: &Actor,
    report_id: &str,
) -> Result<ReviewResponse> {
    let request: ReviewRequest = read_json(req).await?;
    let report = state
        .engine
        .reports
        .review(actor, report_id, request.decision)
        .await?;

    if !(request.open_case && request.decision == ReviewDecision::Validate) {
        return Ok(ReviewResponse::reviewed(report));
    }
    let input = NewCase {
        source_report_id: Some(report.report_id.clone()),
        priority: request.priority,
        assigned_team: request.assigned_team,
        ..Default::default()
    };
    let opened = state.engine.cases.create(actor, input).await;
    Ok(ReviewResponse::reviewed(report).with_case(opened))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_request_defaults() {
        let request: ReviewRequest = serde_json::from_str(r#"{"decision":"VALIDATE"}"#).unwrap();
        assert_eq!(request.decision, ReviewDecision::Validate);
        assert!(!request.open_case);

        let request: ReviewRequest =
            serde_json::from_str(r#"{"decision":"REJECT","openCase":true}"#).unwrap();
        assert!(request.open_case);
        assert!(serde_json::from_str::<ReviewRequest>(r#"{"decision":"MAYBE"}"#).is_err());
    }

    #[test]
    fn test_failed_case_open_keeps_reviewed_report() {
        let report: ThreatReport = serde_json::from_value(serde_json::json!({
            "reportId": "RPT-1",
            "threatType": "POACHING",
            "description": "Snares along the river",
            "dateTime": "2026-03-14T06:30:00Z",
            "urgencyLevel": "HIGH",
            "location": {"lat": -2.3, "lng": 34.8},
            "reporter": {"kind": "ANONYMOUS"},
            "status": "VALIDATED",
            "createdAt": "2026-03-14T06:35:00Z"
        }))
        .unwrap();

        let response = ReviewResponse::reviewed(report).with_case(Err(
            WildwatchError::DependencyUnavailable("database: timed out".into()),
        ));
        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["report"]["status"], "VALIDATED");
        assert!(body.get("case").is_none());
        assert_eq!(body["caseError"]["error"], "DEPENDENCY_UNAVAILABLE");
        assert_eq!(body["caseError"]["retryable"], true);
    }
}
