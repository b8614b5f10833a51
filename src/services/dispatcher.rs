//! Notification dispatch and per-recipient read state
//!
//! Counts and stats are always recomputed from the stored set; there are no
//! counters to drift.

use std::collections::BTreeSet;
use tracing::{debug, warn};
use uuid::Uuid;

use super::directory::Directory;
use crate::auth::{Actor, Operation};
use crate::db::Stores;
use crate::domain::{now, Notification, NotificationStats, NotificationType};
use crate::types::{Result, WildwatchError};

#[derive(Clone)]
pub struct NotificationDispatcher {
    stores: Stores,
    directory: Directory,
}

impl NotificationDispatcher {
    pub fn new(stores: Stores, directory: Directory) -> Self {
        Self { stores, directory }
    }

    /// Create a notification. Fails only when the recipient is unknown.
    pub async fn notify(
        &self,
        recipient_id: &str,
        kind: NotificationType,
        message: impl Into<String>,
        case_id: Option<&str>,
    ) -> Result<Notification> {
        if !self.directory.user_exists(recipient_id).await? {
            return Err(WildwatchError::not_found("recipient", recipient_id));
        }
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            recipient_id: recipient_id.to_string(),
            notification_type: kind,
            message: message.into(),
            case_id: case_id.map(str::to_string),
            read: false,
            sent_at: now(),
        };
        self.stores
            .notifications
            .insert_notification(&notification)
            .await?;
        debug!(
            recipient = %recipient_id,
            kind = %kind,
            case_id = ?case_id,
            "Notification sent"
        );
        Ok(notification)
    }

    /// Notify each distinct recipient except the acting user.
    ///
    /// Runs after the triggering change has committed, so delivery failures
    /// are logged per recipient rather than returned.
    pub(crate) async fn fan_out(
        &self,
        recipients: impl IntoIterator<Item = String>,
        actor_id: &str,
        kind: NotificationType,
        message: &str,
        case_id: Option<&str>,
    ) -> usize {
        let unique: BTreeSet<String> = recipients
            .into_iter()
            .filter(|r| r != actor_id)
            .collect();
        let mut delivered = 0;
        for recipient in unique {
            match self.notify(&recipient, kind, message, case_id).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!(
                    recipient = %recipient,
                    kind = %kind,
                    error = %e,
                    "Failed to deliver notification"
                ),
            }
        }
        delivered
    }

    /// Mark one notification read. Repeating the call is a no-op.
    pub async fn mark_read(&self, actor: &Actor, id: &str) -> Result<()> {
        actor.require(Operation::ManageOwnNotifications)?;
        let notification = self.owned(actor, id).await?;
        if notification.read {
            return Ok(());
        }
        self.stores.notifications.mark_read(id).await?;
        Ok(())
    }

    pub async fn mark_all_read(&self, actor: &Actor) -> Result<u64> {
        actor.require(Operation::ManageOwnNotifications)?;
        self.stores.notifications.mark_all_read(&actor.id).await
    }

    /// The actor's notifications, newest first
    pub async fn list_for(
        &self,
        actor: &Actor,
        unread_only: bool,
        limit: Option<usize>,
    ) -> Result<Vec<Notification>> {
        actor.require(Operation::ManageOwnNotifications)?;
        let mut items = self
            .stores
            .notifications
            .list_notifications(&actor.id, unread_only)
            .await?;
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    pub async fn unread_count(&self, actor: &Actor) -> Result<u64> {
        Ok(self.list_for(actor, true, None).await?.len() as u64)
    }

    pub async fn stats(&self, actor: &Actor) -> Result<NotificationStats> {
        let items = self.list_for(actor, false, None).await?;
        Ok(NotificationStats::from_notifications(&items))
    }

    /// Delete a notification; recipients delete their own, admins any
    pub async fn delete(&self, actor: &Actor, id: &str) -> Result<()> {
        let notification = self
            .stores
            .notifications
            .get_notification(id)
            .await?
            .ok_or_else(|| WildwatchError::not_found("notification", id))?;
        actor.require_owned(
            Operation::DeleteAnyNotification,
            Operation::ManageOwnNotifications,
            Some(notification.recipient_id.as_str()),
        )?;
        if !self.stores.notifications.delete_notification(id).await? {
            return Err(WildwatchError::not_found("notification", id));
        }
        Ok(())
    }

    /// Whether the case a notification points at still exists
    pub async fn case_available(&self, notification: &Notification) -> Result<bool> {
        match notification.case_id.as_deref() {
            Some(case_id) => Ok(self.stores.cases.get_case(case_id).await?.is_some()),
            None => Ok(false),
        }
    }

    async fn owned(&self, actor: &Actor, id: &str) -> Result<Notification> {
        let notification = self
            .stores
            .notifications
            .get_notification(id)
            .await?
            .ok_or_else(|| WildwatchError::not_found("notification", id))?;
        if notification.recipient_id != actor.id {
            return Err(WildwatchError::Forbidden(format!(
                "notification {} belongs to another user",
                id
            )));
        }
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::logging::AuditLogger;

    async fn setup() -> (NotificationDispatcher, Actor, Actor) {
        let stores = Stores::memory();
        let directory = Directory::new(stores.clone(), AuditLogger::new("test"));
        directory.register("alice", "Alice", None, Role::Officer).await.unwrap();
        directory.register("bob", "Bob", None, Role::Citizen).await.unwrap();
        let alice = directory.actor_for("alice").await.unwrap();
        let bob = directory.actor_for("bob").await.unwrap();
        (NotificationDispatcher::new(stores, directory), alice, bob)
    }

    #[tokio::test]
    async fn test_unknown_recipient() {
        let (dispatcher, _, _) = setup().await;
        let err = dispatcher
            .notify("nobody", NotificationType::StatusUpdate, "x", None)
            .await
            .unwrap_err();
        assert!(matches!(err, WildwatchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent_and_owned() {
        let (dispatcher, alice, bob) = setup().await;
        let n = dispatcher
            .notify("alice", NotificationType::CaseAssigned, "assigned", Some("CASE-1"))
            .await
            .unwrap();

        assert!(matches!(
            dispatcher.mark_read(&bob, &n.id).await,
            Err(WildwatchError::Forbidden(_))
        ));
        dispatcher.mark_read(&alice, &n.id).await.unwrap();
        dispatcher.mark_read(&alice, &n.id).await.unwrap();
        assert_eq!(dispatcher.unread_count(&alice).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fan_out_skips_actor_and_duplicates() {
        let (dispatcher, alice, bob) = setup().await;
        let delivered = dispatcher
            .fan_out(
                vec!["alice".into(), "bob".into(), "bob".into(), "ghost".into()],
                "alice",
                NotificationType::StatusUpdate,
                "moved",
                None,
            )
            .await;
        assert_eq!(delivered, 1);
        assert_eq!(dispatcher.list_for(&alice, false, None).await.unwrap().len(), 0);
        assert_eq!(dispatcher.list_for(&bob, false, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stats_match_list() {
        let (dispatcher, alice, _) = setup().await;
        for kind in [
            NotificationType::CaseAssigned,
            NotificationType::StatusUpdate,
            NotificationType::StatusUpdate,
        ] {
            dispatcher.notify("alice", kind, "m", None).await.unwrap();
        }
        let all = dispatcher.list_for(&alice, false, None).await.unwrap();
        dispatcher.mark_read(&alice, &all[0].id).await.unwrap();

        let stats = dispatcher.stats(&alice).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.read, 1);
        assert_eq!(stats.unread, dispatcher.unread_count(&alice).await.unwrap());
        assert_eq!(stats.by_type["STATUS_UPDATE"], 2);

        assert_eq!(dispatcher.mark_all_read(&alice).await.unwrap(), 2);
        assert_eq!(dispatcher.unread_count(&alice).await.unwrap(), 0);
    }
}
