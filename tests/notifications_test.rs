//! Notification read state and dangling case references

mod common;

use common::Fixture;
use wildwatch::domain::{CaseStatus, NotificationType, ThreatType, TransitionRequest};
use wildwatch::services::AssignRequest;
use wildwatch::WildwatchError;

/// Officer o1 ends up with three notifications on one case
async fn busy_officer(fx: &Fixture) -> (wildwatch::auth::Actor, String) {
    let citizen = fx.citizen("c1").await;
    let officer = fx.officer("o1", &[]).await;
    let id = fx.open_case(&citizen, ThreatType::Poaching).await.case_id;
    fx.engine
        .cases
        .assign(&fx.admin, &id, AssignRequest::officer("o1"))
        .await
        .unwrap();
    for status in [CaseStatus::InProgress, CaseStatus::UnderInvestigation] {
        fx.engine
            .cases
            .transition(&fx.admin, &id, TransitionRequest::to(status))
            .await
            .unwrap();
    }
    (officer, id)
}

#[tokio::test]
async fn test_unread_count_matches_unread_listing() {
    let fx = Fixture::new().await;
    let (officer, _) = busy_officer(&fx).await;
    let dispatcher = &fx.engine.notifications;

    let all = dispatcher.list_for(&officer, false, None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(dispatcher.unread_count(&officer).await.unwrap(), 3);

    dispatcher.mark_read(&officer, &all[0].id).await.unwrap();
    let unread = dispatcher.list_for(&officer, true, None).await.unwrap();
    assert_eq!(dispatcher.unread_count(&officer).await.unwrap(), unread.len() as u64);
    assert_eq!(unread.len(), 2);

    let stats = dispatcher.stats(&officer).await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.read, 1);
    assert_eq!(stats.unread, 2);
    assert_eq!(stats.by_type.get("STATUS_UPDATE"), Some(&2));

    assert_eq!(dispatcher.mark_all_read(&officer).await.unwrap(), 2);
    assert_eq!(dispatcher.unread_count(&officer).await.unwrap(), 0);
    assert!(dispatcher.list_for(&officer, true, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mark_read_is_idempotent_and_owned() {
    let fx = Fixture::new().await;
    let (officer, _) = busy_officer(&fx).await;
    let other = fx.officer("o2", &[]).await;
    let dispatcher = &fx.engine.notifications;
    let first = dispatcher.list_for(&officer, false, Some(1)).await.unwrap();
    assert_eq!(first.len(), 1);
    let id = first[0].id.clone();

    dispatcher.mark_read(&officer, &id).await.unwrap();
    dispatcher.mark_read(&officer, &id).await.unwrap();
    assert_eq!(dispatcher.unread_count(&officer).await.unwrap(), 2);

    assert!(matches!(
        dispatcher.mark_read(&other, &id).await,
        Err(WildwatchError::Forbidden(_))
    ));
    assert!(matches!(
        dispatcher.mark_read(&officer, "no-such-notification").await,
        Err(WildwatchError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_notifications_outlive_deleted_case() {
    let fx = Fixture::new().await;
    let (officer, id) = busy_officer(&fx).await;
    let dispatcher = &fx.engine.notifications;

    let before = dispatcher.list_for(&officer, false, None).await.unwrap();
    assert!(dispatcher.case_available(&before[0]).await.unwrap());

    fx.engine.cases.delete(&fx.admin, &id).await.unwrap();

    let after = dispatcher.list_for(&officer, false, None).await.unwrap();
    assert_eq!(after.len(), 3);
    assert_eq!(after[0].case_id.as_deref(), Some(id.as_str()));
    assert!(!dispatcher.case_available(&after[0]).await.unwrap());
}

#[tokio::test]
async fn test_actor_is_never_notified_of_own_action() {
    let fx = Fixture::new().await;
    let citizen = fx.citizen("c1").await;
    let officer = fx.officer("o1", &[]).await;
    let id = fx.open_case(&citizen, ThreatType::ForestFire).await.case_id;

    // The officer assigns themselves while starting work
    fx.engine
        .cases
        .transition(
            &officer,
            &id,
            TransitionRequest::to(CaseStatus::InProgress).with_officer("o1"),
        )
        .await
        .unwrap();

    assert!(fx
        .engine
        .notifications
        .list_for(&officer, false, None)
        .await
        .unwrap()
        .is_empty());
    let citizen_inbox = fx
        .engine
        .notifications
        .list_for(&citizen, false, None)
        .await
        .unwrap();
    assert_eq!(citizen_inbox.len(), 1);
    assert_eq!(citizen_inbox[0].notification_type, NotificationType::StatusUpdate);
}

#[tokio::test]
async fn test_recipient_or_admin_may_delete() {
    let fx = Fixture::new().await;
    let (officer, _) = busy_officer(&fx).await;
    let other = fx.officer("o2", &[]).await;
    let dispatcher = &fx.engine.notifications;
    let items = dispatcher.list_for(&officer, false, None).await.unwrap();

    assert!(matches!(
        dispatcher.delete(&other, &items[0].id).await,
        Err(WildwatchError::Forbidden(_))
    ));
    dispatcher.delete(&officer, &items[0].id).await.unwrap();
    dispatcher.delete(&fx.admin, &items[1].id).await.unwrap();
    assert_eq!(dispatcher.list_for(&officer, false, None).await.unwrap().len(), 1);
}
