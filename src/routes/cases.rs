//! Case and investigation routes
//!
//! - `POST   /cases`                      open a case
//! - `GET    /cases`                      filtered, sorted, paged listing
//! - `GET    /cases/stats/overview`       status and priority breakdown
//! - `GET    /cases/{id}`                 fetch one
//! - `PATCH  /cases/{id}`                 edit non-status fields
//! - `PATCH  /cases/{id}/assign`          assign an officer
//! - `PATCH  /cases/{id}/transition`      move along the status chain
//! - `PATCH  /cases/{id}/resolve`         transition to RESOLVED
//! - `DELETE /cases/{id}`                 hard delete (admin)
//! - `PUT    /cases/{id}/investigation`   append one ledger entry
//! - `GET    /cases/{id}/investigation`   read the ledger

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::common::{
    error_response, method_not_allowed, no_route, read_json, respond, split_id, FullBody,
};
use crate::auth::Actor;
use crate::domain::{
    Case, CasePatch, CaseQuery, Investigation, LedgerInput, NewCase, ResolutionInput,
    TransitionRequest,
};
use crate::server::AppState;
use crate::services::AssignRequest;
use crate::types::Result;

/// Body of `PATCH /cases/{id}/resolve`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    #[serde(flatten)]
    pub resolution: ResolutionInput,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// The ledger of one case
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestigationResponse {
    pub case_id: String,
    pub investigation: Investigation,
}

pub async fn handle_cases_request(
    req: Request<Incoming>,
    state: &AppState,
    actor: &Actor,
) -> Response<FullBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    // Literal paths first so "stats" is never taken for a case id
    match (method.clone(), path.as_str()) {
        (Method::POST, "/cases") => {
            return respond(StatusCode::CREATED, create(req, state, actor).await)
        }
        (Method::GET, "/cases") => {
            let result = match CaseQuery::from_query_string(req.uri().query()) {
                Ok(query) => state.engine.cases.list(actor, query).await,
                Err(err) => Err(err),
            };
            return respond(StatusCode::OK, result);
        }
        (Method::GET, "/cases/stats/overview") => {
            return respond(StatusCode::OK, state.engine.cases.stats(actor).await)
        }
        (_, "/cases") | (_, "/cases/stats/overview") => {
            return error_response(&method_not_allowed(&method, &path))
        }
        _ => {}
    }

    let Some((case_id, rest)) = split_id(&path, "/cases") else {
        return error_response(&no_route(&path));
    };

    match (method, rest) {
        (Method::GET, "") => respond(StatusCode::OK, state.engine.cases.get(actor, case_id).await),
        (Method::PATCH, "") => respond(StatusCode::OK, update(req, state, actor, case_id).await),
        (Method::DELETE, "") => match state.engine.cases.delete(actor, case_id).await {
            Ok(()) => respond(
                StatusCode::OK,
                Ok(serde_json::json!({ "deleted": true, "caseId": case_id })),
            ),
            Err(err) => error_response(&err),
        },
        (Method::PATCH, "assign") => {
            respond(StatusCode::OK, assign(req, state, actor, case_id).await)
        }
        (Method::PATCH, "transition") => {
            respond(StatusCode::OK, transition(req, state, actor, case_id).await)
        }
        (Method::PATCH, "resolve") | (Method::PUT, "resolve") => {
            respond(StatusCode::OK, resolve(req, state, actor, case_id).await)
        }
        (Method::PUT, "investigation") => {
            respond(StatusCode::OK, append(req, state, actor, case_id).await)
        }
        (Method::GET, "investigation") => respond(
            StatusCode::OK,
            state
                .engine
                .ledger
                .get(actor, case_id)
                .await
                .map(|investigation| InvestigationResponse {
                    case_id: case_id.to_string(),
                    investigation,
                }),
        ),
        (method, _) => error_response(&method_not_allowed(&method, &path)),
    }
}

async fn create(req: Request<Incoming>, state: &AppState, actor: &Actor) -> Result<Case> {
    let input: NewCase = read_json(req).await?;
    state.engine.cases.create(actor, input).await
}

async fn update(req: Request<Incoming>, state: &AppState, actor: &Actor, case_id: &str) -> Result<Case> {
    let patch: CasePatch = read_json(req).await?;
    state.engine.cases.update(actor, case_id, patch).await
}

async fn assign(req: Request<Incoming>, state: &AppState, actor: &Actor, case_id: &str) -> Result<Case> {
    let request: AssignRequest = read_json(req).await?;
    state.engine.cases.assign(actor, case_id, request).await
}

async fn transition(
    req: Request<Incoming>,
    state: &AppState,
    actor: &Actor,
    case_id: &str,
) -> Result<Case> {
    let request: TransitionRequest = read_json(req).await?;
    state.engine.cases.transition(actor, case_id, request).await
}

async fn resolve(req: Request<Incoming>, state: &AppState, actor: &Actor, case_id: &str) -> Result<Case> {
    let request: ResolveRequest = read_json(req).await?;
    state
        .engine
        .cases
        .resolve(actor, case_id, request.resolution, request.expected_version)
        .await
}

async fn append(
    req: Request<Incoming>,
    state: &AppState,
    actor: &Actor,
    case_id: &str,
) -> Result<InvestigationResponse> {
    let input: LedgerInput = read_json(req).await?;
    state.engine.ledger.append_input(actor, case_id, input).await?;
    let investigation = state.engine.ledger.get(actor, case_id).await?;
    Ok(InvestigationResponse {
        case_id: case_id.to_string(),
        investigation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_request_is_flat() {
        let request: ResolveRequest = serde_json::from_str(
            r#"{"actionSummary":"Snares removed","outcome":"Arrest made","expectedVersion":4}"#,
        )
        .unwrap();
        assert_eq!(request.resolution.action_summary, "Snares removed");
        assert_eq!(request.resolution.outcome.as_deref(), Some("Arrest made"));
        assert_eq!(request.expected_version, Some(4));
    }
}
