use zenshell_bot::service::error::ServiceError;
use zenshell_bot::service::status_service::StatusEntry;
use zenshell_bot::service::status_service::StatusKind;
use zenshell_bot::service::status_service::default_rotation;

mod common;

#[tokio::test]
async fn test_settings_default_when_missing() {
    let (services, _db, db_path) = common::setup_services().await;

    let settings = services.settings.get_server_settings(100).await.unwrap();
    assert!(!settings.greetings.welcome_enabled);
    assert!(!settings.greetings.welcome_messages.is_empty());
    assert!(settings.leveling.level_roles.is_empty());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_settings_modify_persists_per_guild() {
    let (services, _db, db_path) = common::setup_services().await;
    let settings = &services.settings;

    let count = settings
        .modify(100, |s| {
            s.greetings.welcome_enabled = true;
            s.greetings.welcome_channel = Some(55);
            s.leveling.level_roles.insert(5, 900);
            s.leveling.level_roles.len()
        })
        .await
        .unwrap();
    assert_eq!(count, 1);

    let stored = settings.get_server_settings(100).await.unwrap();
    assert!(stored.greetings.welcome_enabled);
    assert_eq!(stored.greetings.welcome_channel, Some(55));
    assert_eq!(stored.leveling.level_roles.get(&5), Some(&900));

    let other = settings.get_server_settings(200).await.unwrap();
    assert!(!other.greetings.welcome_enabled);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_status_rotation_add_and_remove() {
    let (services, _db, db_path) = common::setup_services().await;
    let status = &services.status;

    assert_eq!(status.rotation().await.unwrap(), default_rotation());

    let entry = StatusEntry::new(StatusKind::Watching, "the logs");
    assert_eq!(status.add(entry.clone()).await.unwrap(), 11);
    assert_eq!(status.rotation().await.unwrap().last(), Some(&entry));

    let (removed, len) = status.remove(11).await.unwrap();
    assert_eq!(removed, entry);
    assert_eq!(len, 10);

    for index in [0, 11] {
        assert!(matches!(
            status.remove(index).await.unwrap_err(),
            ServiceError::InvalidArgument(_)
        ));
    }

    common::teardown_db(db_path).await;
}
