//! Staff directory and account routes
//!
//! - `GET    /staff`             list staff profiles (staff)
//! - `POST   /staff`             create a profile (admin)
//! - `PATCH  /staff/{id}`        change department or permissions (admin)
//! - `DELETE /staff/{id}`        remove a profile (admin)
//! - `GET    /users`             list accounts (admin)
//! - `PATCH  /users/{id}/role`   change an account's role (admin)

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;

use super::common::{
    error_response, method_not_allowed, no_route, read_json, respond, split_id, FullBody,
};
use crate::auth::Actor;
use crate::domain::{NewStaffMember, StaffMember, StaffPatch, UserAccount};
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Deserialize)]
pub struct RoleChangeRequest {
    pub role: String,
}

pub async fn handle_staff_request(
    req: Request<Incoming>,
    state: &AppState,
    actor: &Actor,
) -> Response<FullBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let directory = &state.engine.directory;

    if path == "/staff" {
        return match method {
            Method::GET => respond(StatusCode::OK, directory.list_staff(actor).await),
            Method::POST => respond(StatusCode::CREATED, create_staff(req, state, actor).await),
            _ => error_response(&method_not_allowed(&method, &path)),
        };
    }

    let Some((staff_id, "")) = split_id(&path, "/staff") else {
        return error_response(&no_route(&path));
    };

    match method {
        Method::PATCH => respond(StatusCode::OK, update_staff(req, state, actor, staff_id).await),
        Method::DELETE => {
            let result = directory
                .remove_staff(actor, staff_id)
                .await
                .map(|()| serde_json::json!({ "deleted": true, "id": staff_id }));
            respond(StatusCode::OK, result)
        }
        _ => error_response(&method_not_allowed(&method, &path)),
    }
}

pub async fn handle_users_request(
    req: Request<Incoming>,
    state: &AppState,
    actor: &Actor,
) -> Response<FullBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if path == "/users" {
        return match method {
            Method::GET => respond(StatusCode::OK, state.engine.directory.list_users(actor).await),
            _ => error_response(&method_not_allowed(&method, &path)),
        };
    }

    match (method, split_id(&path, "/users")) {
        (Method::PATCH, Some((user_id, "role"))) | (Method::PUT, Some((user_id, "role"))) => {
            respond(StatusCode::OK, change_role(req, state, actor, user_id).await)
        }
        _ => error_response(&no_route(&path)),
    }
}

async fn create_staff(req: Request<Incoming>, state: &AppState, actor: &Actor) -> Result<StaffMember> {
    let input: NewStaffMember = read_json(req).await?;
    state.engine.directory.create_staff(actor, input).await
}

async fn update_staff(
    req: Request<Incoming>,
    state: &AppState,
    actor: &Actor,
    staff_id: &str,
) -> Result<StaffMember> {
    let patch: StaffPatch = read_json(req).await?;
    state.engine.directory.update_staff(actor, staff_id, patch).await
}

async fn change_role(
    req: Request<Incoming>,
    state: &AppState,
    actor: &Actor,
    user_id: &str,
) -> Result<UserAccount> {
    let request: RoleChangeRequest = read_json(req).await?;
    state.engine.directory.set_role(actor, user_id, &request.role).await
}
