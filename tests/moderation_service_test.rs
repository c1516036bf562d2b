use zenshell_bot::model::PunishmentType;
use zenshell_bot::service::moderation_service::WarnEscalation;

mod common;

#[tokio::test]
async fn test_warn_escalates_at_thresholds() {
    let (services, _db, db_path) = common::setup_services().await;
    let moderation = &services.moderation;

    let mut escalations = Vec::new();
    for _ in 0..7 {
        let (_, escalation) = moderation.warn(100, 5, 1, "spam").await.unwrap();
        escalations.push(escalation);
    }
    assert_eq!(
        escalations,
        vec![
            None,
            None,
            Some(WarnEscalation::Timeout),
            None,
            Some(WarnEscalation::Kick),
            None,
            Some(WarnEscalation::Ban),
        ]
    );

    // Warnings in another guild start from zero.
    let (count, escalation) = moderation.warn(200, 5, 1, "spam").await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(escalation, None);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_warnings_are_limited_but_counted() {
    let (services, _db, db_path) = common::setup_services().await;
    let moderation = &services.moderation;
    for i in 0..4 {
        moderation
            .warn(100, 5, 1, &format!("reason {i}"))
            .await
            .unwrap();
    }

    let (list, total) = moderation.warnings(100, 5, 2).await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(total, 4);

    assert_eq!(moderation.clear_warnings(100, 5).await.unwrap(), 4);
    let (list, total) = moderation.warnings(100, 5, 10).await.unwrap();
    assert!(list.is_empty());
    assert_eq!(total, 0);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_clear_warnings_keeps_other_punishments() {
    let (services, db, db_path) = common::setup_services().await;
    let moderation = &services.moderation;

    moderation.warn(100, 5, 1, "spam").await.unwrap();
    moderation
        .record(100, 5, 1, PunishmentType::Kick, "rude", None)
        .await
        .unwrap();
    moderation.clear_warnings(100, 5).await.unwrap();

    let kicks = db
        .punishment
        .count_by_member(100, 5, PunishmentType::Kick)
        .await
        .unwrap();
    assert_eq!(kicks, 1);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_record_ban_if_missing_only_once() {
    let (services, _db, db_path) = common::setup_services().await;
    let moderation = &services.moderation;

    assert!(
        moderation
            .record_ban_if_missing(100, 5, 1, "Found on ban list")
            .await
            .unwrap()
    );
    assert!(
        !moderation
            .record_ban_if_missing(100, 5, 1, "Found on ban list")
            .await
            .unwrap()
    );

    common::teardown_db(db_path).await;
}
