//! Cases keep a snapshot of their source report

mod common;

use common::Fixture;
use wildwatch::domain::{Location, NewCase, ReporterInput, ThreatType};
use wildwatch::WildwatchError;

#[tokio::test]
async fn test_case_survives_report_deletion() {
    let fx = Fixture::new().await;
    let citizen = fx.citizen("c1").await;
    let case = fx.open_case(&citizen, ThreatType::Poaching).await;
    let report_id = case.source_report_id.clone().unwrap();

    let deleted = fx.engine.reports.delete(&fx.admin, &report_id).await.unwrap();
    assert_eq!(deleted.referencing_cases, vec![case.case_id.clone()]);
    assert!(matches!(
        fx.engine.reports.get(&fx.admin, &report_id).await,
        Err(WildwatchError::NotFound(_))
    ));

    let kept = fx.engine.cases.get(&fx.admin, &case.case_id).await.unwrap();
    assert_eq!(kept.source_report_id.as_deref(), Some(report_id.as_str()));
    assert_eq!(kept.threat_type, ThreatType::Poaching);
    assert_eq!(kept.description, case.description);
    assert_eq!(kept.location, case.location);
    assert_eq!(kept.reporter, case.reporter);
    assert_eq!(kept.reported_by.as_deref(), Some("c1"));
}

#[tokio::test]
async fn test_missing_source_report_falls_back_to_fields() {
    let fx = Fixture::new().await;
    let case = fx
        .engine
        .cases
        .create(
            &fx.admin,
            NewCase {
                source_report_id: Some("gone".into()),
                threat_type: Some(ThreatType::InjuredAnimal),
                description: Some("Limping giraffe by the airstrip".into()),
                location: Some(Location {
                    lat: -1.4,
                    lng: 35.1,
                    address: None,
                }),
                reporter_info: Some(ReporterInput {
                    is_anonymous: true,
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(case.threat_type, ThreatType::InjuredAnimal);
    assert!(case.reporter.as_ref().unwrap().is_anonymous());
    assert!(case.reported_by.is_none());
}

#[tokio::test]
async fn test_case_without_report_needs_threat_type_and_location() {
    let fx = Fixture::new().await;
    let result = fx
        .engine
        .cases
        .create(
            &fx.admin,
            NewCase {
                description: Some("Something happened".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(WildwatchError::Validation(_))));
}

#[tokio::test]
async fn test_anonymous_report_leaves_no_trace_of_submitter() {
    let fx = Fixture::new().await;
    let citizen = fx.citizen("c1").await;
    let mut input = common::report_input(ThreatType::Poaching);
    input.reporter_info = Some(ReporterInput {
        name: Some("Should be dropped".into()),
        is_anonymous: true,
        ..Default::default()
    });
    let report = fx.engine.reports.submit(&citizen, input).await.unwrap();
    assert!(report.submitted_by.is_none());

    // Anonymous submissions are not listed as the citizen's own
    let mine = fx.engine.reports.list(&citizen, None, true).await.unwrap();
    assert!(mine.is_empty());
}
