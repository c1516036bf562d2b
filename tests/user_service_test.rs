use zenshell_bot::model::LeaderboardKind;
use zenshell_bot::model::LeaderboardOptBuilder;
use zenshell_bot::repository::table::Table;
use zenshell_bot::service::error::ServiceError;
use zenshell_bot::service::user_service::MAX_MESSAGE_CONTENT;

mod common;

#[tokio::test]
async fn test_get_or_create_user() {
    let (services, _db, db_path) = common::setup_services().await;
    let users = &services.user;

    let created = users.get_or_create_user(1, "alice").await.unwrap();
    assert_eq!(created.level, 1);
    assert_eq!(created.xp, 0);

    // An existing row is returned untouched.
    let again = users.get_or_create_user(1, "renamed").await.unwrap();
    assert_eq!(again.username, "alice");

    assert!(!users.ensure_user(1, "alice").await.unwrap());
    assert!(users.ensure_user(2, "bob").await.unwrap());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_add_xp_levels_up_across_thresholds() {
    let (services, _db, db_path) = common::setup_services().await;
    let users = &services.user;
    users.ensure_user(1, "alice").await.unwrap();

    let outcome = users.add_xp(1, 150).await.unwrap();
    assert!(outcome.leveled_up);
    assert_eq!(outcome.previous_level, 1);
    assert_eq!(outcome.level, 2);
    assert_eq!(outcome.xp, 50);

    // Level 2 needs another 400 on top of the 50 carried over.
    let outcome = users.add_xp(1, 350).await.unwrap();
    assert_eq!(outcome.level, 3);
    assert_eq!(outcome.xp, 0);

    let outcome = users.add_xp(1, 10).await.unwrap();
    assert!(!outcome.leveled_up);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_add_xp_requires_registered_user() {
    let (services, _db, db_path) = common::setup_services().await;
    let err = services.user.add_xp(99, 10).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_record_message_truncates_and_counts() {
    let (services, db, db_path) = common::setup_services().await;
    let users = &services.user;
    users.ensure_user(1, "alice").await.unwrap();

    let long = "x".repeat(MAX_MESSAGE_CONTENT + 100);
    users.record_message(1, &long).await.unwrap();
    users.record_message(1, "hi").await.unwrap();

    assert_eq!(users.message_count(1).await.unwrap(), 2);
    let stored = db.message.select_all().await.unwrap();
    assert!(
        stored
            .iter()
            .all(|m| m.content.chars().count() <= MAX_MESSAGE_CONTENT)
    );

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_achievements_are_granted_once() {
    let (services, _db, db_path) = common::setup_services().await;
    let users = &services.user;
    users.ensure_user(1, "alice").await.unwrap();

    assert!(users.add_achievement(1, "Chatty").await.unwrap());
    assert!(!users.add_achievement(1, "Chatty").await.unwrap());
    assert!(users.add_achievement(1, "Reached Level 5").await.unwrap());

    let names: Vec<String> = users
        .achievements(1)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.achievement_name)
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Chatty".to_string()));

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_leaderboard_and_rank() {
    let (services, _db, db_path) = common::setup_services().await;
    let users = &services.user;
    for (id, xp) in [(1u64, 50i64), (2, 1_000), (3, 200)] {
        users.ensure_user(id, &format!("user{id}")).await.unwrap();
        users.add_xp(id, xp).await.unwrap();
    }

    let opts = LeaderboardOptBuilder::default()
        .kind(LeaderboardKind::Level)
        .limit(Some(2))
        .build()
        .unwrap();
    let (entries, total) = users.leaderboard(&opts).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].user_id, 2);

    assert_eq!(users.rank_of(2).await.unwrap(), Some(1));
    assert_eq!(users.rank_of(1).await.unwrap(), Some(3));

    common::teardown_db(db_path).await;
}
