//! Notifications emitted on lifecycle events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    CaseAssigned,
    StatusUpdate,
    Resolution,
    UrgentAlert,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::CaseAssigned => "CASE_ASSIGNED",
            NotificationType::StatusUpdate => "STATUS_UPDATE",
            NotificationType::Resolution => "RESOLUTION",
            NotificationType::UrgentAlert => "URGENT_ALERT",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub message: String,
    /// Soft reference; the case may have been deleted since
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    pub read: bool,
    pub sent_at: DateTime<Utc>,
}

/// Per-recipient counts, derived from the notification set on every call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStats {
    pub total: u64,
    pub read: u64,
    pub unread: u64,
    pub by_type: BTreeMap<String, u64>,
}

impl NotificationStats {
    pub fn from_notifications<'a>(items: impl IntoIterator<Item = &'a Notification>) -> Self {
        let mut stats = NotificationStats::default();
        for n in items {
            stats.total += 1;
            if n.read {
                stats.read += 1;
            } else {
                stats.unread += 1;
            }
            *stats
                .by_type
                .entry(n.notification_type.as_str().to_string())
                .or_insert(0) += 1;
        }
        stats
    }
}
