//! Notification routes, always scoped to the calling user
//!
//! - `GET    /notifications`               list (`unreadOnly`, `limit`)
//! - `GET    /notifications/unread-count`  polled badge count
//! - `GET    /notifications/stats`         counts by read state and type
//! - `PATCH  /notifications/{id}/read`     mark one read
//! - `PATCH  /notifications/read-all`      mark all read
//! - `DELETE /notifications/{id}`          delete (recipient or admin)

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;

use super::common::{
    error_response, method_not_allowed, no_route, query_flag, query_params, query_value, respond,
    split_id, FullBody,
};
use crate::auth::Actor;
use crate::domain::Notification;
use crate::server::AppState;
use crate::types::{Result, WildwatchError};

/// A notification plus whether its case can still be opened
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub case_available: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub notifications: Vec<NotificationView>,
    pub unread_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub count: u64,
    /// Clients poll no more often than this
    pub refresh_interval_secs: u64,
}

pub async fn handle_notifications_request(
    req: Request<Incoming>,
    state: &AppState,
    actor: &Actor,
) -> Response<FullBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let dispatcher = &state.engine.notifications;

    match (method.clone(), path.as_str()) {
        (Method::GET, "/notifications") => {
            return respond(StatusCode::OK, list(&req, state, actor).await)
        }
        (Method::GET, "/notifications/unread-count") => {
            let result = dispatcher.unread_count(actor).await.map(|count| UnreadCount {
                count,
                refresh_interval_secs: state.args.unread_refresh_secs,
            });
            return respond(StatusCode::OK, result);
        }
        (Method::GET, "/notifications/stats") => {
            return respond(StatusCode::OK, dispatcher.stats(actor).await)
        }
        (Method::PATCH, "/notifications/read-all") | (Method::PUT, "/notifications/read-all") => {
            let result = dispatcher
                .mark_all_read(actor)
                .await
                .map(|updated| serde_json::json!({ "updated": updated }));
            return respond(StatusCode::OK, result);
        }
        _ => {}
    }

    let Some((id, rest)) = split_id(&path, "/notifications") else {
        return error_response(&no_route(&path));
    };

    match (method, rest) {
        (Method::PATCH, "read") | (Method::PUT, "read") => {
            let result = dispatcher
                .mark_read(actor, id)
                .await
                .map(|()| serde_json::json!({ "id": id, "read": true }));
            respond(StatusCode::OK, result)
        }
        (Method::DELETE, "") => {
            let result = dispatcher
                .delete(actor, id)
                .await
                .map(|()| serde_json::json!({ "deleted": true, "id": id }));
            respond(StatusCode::OK, result)
        }
        (method, _) => error_response(&method_not_allowed(&method, &path)),
    }
}

async fn list(req: &Request<Incoming>, state: &AppState, actor: &Actor) -> Result<NotificationList> {
    let params = query_params(req.uri().query());
    let limit = match query_value(&params, "limit") {
        Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
            WildwatchError::Validation(format!("limit must be a non-negative integer, got '{}'", raw))
        })?),
        None => None,
    };
    let dispatcher = &state.engine.notifications;
    let items = dispatcher
        .list_for(actor, query_flag(&params, "unreadOnly"), limit)
        .await?;

    let mut notifications = Vec::with_capacity(items.len());
    for notification in items {
        let case_available = dispatcher.case_available(&notification).await?;
        notifications.push(NotificationView {
            notification,
            case_available,
        });
    }
    Ok(NotificationList {
        notifications,
        unread_count: dispatcher.unread_count(actor).await?,
    })
}
