use chrono::Duration;
use chrono::Utc;
use zenshell_bot::service::custom_command_service::CustomCommandService;
use zenshell_bot::service::error::ServiceError;
use zenshell_bot::service::giveaway_service::GiveawayService;

mod common;

fn options(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_poll_create_validates_option_count() {
    let (services, _db, db_path) = common::setup_services().await;
    let polls = &services.poll;

    let err = polls
        .create(1, 100, 10, 7, "Lunch?", options(&["pizza"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidArgument(_)));

    let many: Vec<String> = (0..11).map(|i| format!("option {i}")).collect();
    assert!(polls.create(1, 100, 10, 7, "Lunch?", many).await.is_err());

    let poll = polls
        .create(1, 100, 10, 7, "Lunch?", options(&["pizza", "sushi"]))
        .await
        .unwrap();
    assert!(!poll.ended);
    assert_eq!(polls.active(100).await.unwrap().len(), 1);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_poll_vote_moves_previous_choice() {
    let (services, _db, db_path) = common::setup_services().await;
    let polls = &services.poll;
    polls
        .create(1, 100, 10, 7, "Lunch?", options(&["pizza", "sushi", "tacos"]))
        .await
        .unwrap();

    polls.vote(1, 42, 0).await.unwrap();
    let poll = polls.vote(1, 42, 2).await.unwrap();
    assert_eq!(poll.votes.0.len(), 1);
    assert_eq!(poll.votes.0.get(&42), Some(&2));

    assert!(matches!(
        polls.vote(1, 42, 3).await.unwrap_err(),
        ServiceError::InvalidArgument(_)
    ));
    assert!(matches!(
        polls.vote(999, 42, 0).await.unwrap_err(),
        ServiceError::NotFound(_)
    ));

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_concurrent_poll_votes_are_all_counted() {
    let (services, _db, db_path) = common::setup_services().await;
    services
        .poll
        .create(1, 100, 10, 7, "Lunch?", options(&["pizza", "sushi"]))
        .await
        .unwrap();

    let handles: Vec<_> = (0..8u64)
        .map(|voter| {
            let services = services.clone();
            tokio::spawn(async move {
                services
                    .poll
                    .vote(1, 1000 + voter, (voter % 2) as usize)
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let poll = services.poll.get(1).await.unwrap();
    assert_eq!(poll.votes.0.len(), 8);
    assert_eq!(poll.votes.0.get(&1003), Some(&1));

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_poll_end_permissions() {
    let (services, _db, db_path) = common::setup_services().await;
    let polls = &services.poll;
    polls
        .create(1, 100, 10, 7, "Lunch?", options(&["pizza", "sushi"]))
        .await
        .unwrap();

    assert!(matches!(
        polls.end(100, 1, 8, false).await.unwrap_err(),
        ServiceError::Forbidden(_)
    ));
    assert!(matches!(
        polls.end(200, 1, 7, true).await.unwrap_err(),
        ServiceError::NotFound(_)
    ));

    let ended = polls.end(100, 1, 8, true).await.unwrap();
    assert!(ended.ended);
    assert!(polls.active(100).await.unwrap().is_empty());

    assert!(matches!(
        polls.end(100, 1, 7, false).await.unwrap_err(),
        ServiceError::InvalidArgument(_)
    ));
    assert!(matches!(
        polls.vote(1, 42, 0).await.unwrap_err(),
        ServiceError::Forbidden(_)
    ));

    common::teardown_db(db_path).await;
}

#[test]
fn test_giveaway_validate_start() {
    let now = Utc::now();
    let end = GiveawayService::validate_start("1h30m", 2, now).unwrap();
    assert_eq!(end, now + Duration::minutes(90));

    assert!(GiveawayService::validate_start("30s", 1, now).is_err());
    assert!(GiveawayService::validate_start("soon", 1, now).is_err());
    assert!(GiveawayService::validate_start("1h", 0, now).is_err());
}

#[tokio::test]
async fn test_giveaway_lifecycle() {
    let (services, _db, db_path) = common::setup_services().await;
    let giveaways = &services.giveaway;
    let now = Utc::now();

    giveaways
        .create(1, 100, 10, 7, "Nitro", 1, now - Duration::minutes(1))
        .await
        .unwrap();
    giveaways
        .create(2, 100, 10, 7, "Sticker", 1, now + Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(giveaways.active(100).await.unwrap().len(), 2);
    let due = giveaways.due(now).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].prize, "Nitro");

    let mut giveaway = giveaways.get(100, 1).await.unwrap();
    giveaways.finish(&mut giveaway, vec![42]).await.unwrap();
    assert!(giveaways.due(now).await.unwrap().is_empty());
    assert_eq!(giveaways.get(100, 1).await.unwrap().winner_ids.0, vec![42]);

    // Lookups are scoped to the guild.
    assert!(matches!(
        giveaways.get(200, 2).await.unwrap_err(),
        ServiceError::NotFound(_)
    ));

    let other = giveaways.get(100, 2).await.unwrap();
    giveaways.delete(&other).await.unwrap();
    assert!(giveaways.get(100, 2).await.is_err());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_giveaway_end_is_claimed_once() {
    let (services, _db, db_path) = common::setup_services().await;
    let now = Utc::now();
    services
        .giveaway
        .create(1, 100, 10, 7, "Nitro", 1, now - Duration::minutes(1))
        .await
        .unwrap();
    let giveaway = services.giveaway.get(100, 1).await.unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let services = services.clone();
            let giveaway = giveaway.clone();
            tokio::spawn(async move { services.giveaway.claim_end(&giveaway).await })
        })
        .collect();
    let mut claimed = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            claimed += 1;
        }
    }
    assert_eq!(claimed, 1);

    // A claimed giveaway is no longer picked up by the checker.
    assert!(services.giveaway.due(now).await.unwrap().is_empty());
    assert!(!services.giveaway.claim_end(&giveaway).await.unwrap());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_reminder_create_rejects_bad_input() {
    let (services, _db, db_path) = common::setup_services().await;
    let reminders = &services.reminder;
    let now = Utc::now();

    for (time, content) in [
        ("whenever", "stretch"),
        ("2020-01-01 10:00", "stretch"),
        ("1h", "   "),
    ] {
        let err = reminders
            .create(1, None, 10, time, content, false, now)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    let reminder = reminders
        .create(1, Some(100), 10, "1h30m", "stretch", true, now)
        .await
        .unwrap();
    assert_eq!(reminder.due_at, now + Duration::minutes(90));
    assert!(reminder.public);
    assert_eq!(reminders.pending(1).await.unwrap()[0].guild_id, Some(100));

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_reminder_remove_is_owner_only() {
    let (services, _db, db_path) = common::setup_services().await;
    let reminders = &services.reminder;
    let now = Utc::now();

    let first = reminders
        .create(1, None, 10, "2h", "later", false, now)
        .await
        .unwrap();
    reminders
        .create(1, None, 10, "1h", "sooner", false, now)
        .await
        .unwrap();

    let pending = reminders.pending(1).await.unwrap();
    assert_eq!(pending[0].content, "sooner");

    assert!(matches!(
        reminders.remove(2, first.id).await.unwrap_err(),
        ServiceError::Forbidden(_)
    ));
    assert_eq!(reminders.remove(1, first.id).await.unwrap().content, "later");
    assert!(matches!(
        reminders.remove(1, first.id).await.unwrap_err(),
        ServiceError::NotFound(_)
    ));

    assert_eq!(reminders.clear(1).await.unwrap(), 1);
    assert!(reminders.pending(1).await.unwrap().is_empty());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_todo_positions_stay_contiguous() {
    let (services, _db, db_path) = common::setup_services().await;
    let reminders = &services.reminder;

    for task in ["a", "b", "c", "d"] {
        reminders.add_todo(1, task).await.unwrap();
    }
    // Another user's list is numbered on its own.
    assert_eq!(reminders.add_todo(2, "other").await.unwrap(), 1);

    reminders.remove_todo(1, 2).await.unwrap();
    reminders.set_todo_completed(1, 1, true).await.unwrap();
    reminders.clear_todos(1, true).await.unwrap();

    let todos = reminders.todos(1).await.unwrap();
    let listed: Vec<(i64, &str)> = todos
        .iter()
        .map(|t| (t.position, t.content.as_str()))
        .collect();
    assert_eq!(listed, vec![(1, "c"), (2, "d")]);
    assert_eq!(reminders.add_todo(1, "e").await.unwrap(), 3);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_todos_use_one_based_positions() {
    let (services, _db, db_path) = common::setup_services().await;
    let reminders = &services.reminder;

    assert!(matches!(
        reminders.set_todo_completed(1, 1, true).await.unwrap_err(),
        ServiceError::InvalidArgument(_)
    ));
    assert!(reminders.add_todo(1, "  ").await.is_err());

    assert_eq!(reminders.add_todo(1, "write tests").await.unwrap(), 1);
    assert_eq!(reminders.add_todo(1, "ship it").await.unwrap(), 2);
    assert_eq!(reminders.add_todo(1, "celebrate").await.unwrap(), 3);

    let done = reminders.set_todo_completed(1, 2, true).await.unwrap();
    assert_eq!(done.content, "ship it");
    assert!(reminders.set_todo_completed(1, 0, true).await.is_err());
    assert!(reminders.set_todo_completed(1, 4, true).await.is_err());

    let removed = reminders.remove_todo(1, 1).await.unwrap();
    assert_eq!(removed.content, "write tests");

    let todos = reminders.todos(1).await.unwrap();
    assert_eq!(todos.len(), 2);
    assert!(todos[0].completed);

    let undone = reminders.set_todo_completed(1, 1, false).await.unwrap();
    assert!(!undone.completed);
    reminders.set_todo_completed(1, 2, true).await.unwrap();

    assert_eq!(reminders.clear_todos(1, true).await.unwrap(), 1);
    assert_eq!(reminders.todos(1).await.unwrap()[0].content, "ship it");
    assert_eq!(reminders.add_todo(1, "rest").await.unwrap(), 2);
    assert_eq!(reminders.clear_todos(1, false).await.unwrap(), 2);
    assert!(reminders.todos(1).await.unwrap().is_empty());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_custom_commands_are_unique_and_owned() {
    let (services, _db, db_path) = common::setup_services().await;
    let commands = &services.custom_command;

    let created = commands.create(100, 7, "!Rules", "Be nice.").await.unwrap();
    assert_eq!(created.name, "rules");

    assert!(matches!(
        commands.create(100, 8, "rules", "Other").await.unwrap_err(),
        ServiceError::InvalidArgument(_)
    ));
    // The same name is free in another guild.
    assert!(commands.create(200, 8, "rules", "Other").await.is_ok());
    assert!(commands.create(100, 7, "two words", "x").await.is_err());

    assert!(matches!(
        commands.edit(100, 8, "rules", "Hijacked").await.unwrap_err(),
        ServiceError::Forbidden(_)
    ));
    commands.edit(100, 7, "RULES", "Be kind.").await.unwrap();
    let stored = commands.get(100, "rules").await.unwrap().unwrap();
    assert_eq!(stored.response, "Be kind.");

    assert!(commands.delete(100, 8, "rules").await.is_err());
    commands.delete(100, 7, "rules").await.unwrap();
    assert!(commands.get(100, "rules").await.unwrap().is_none());
    assert!(matches!(
        commands.delete(100, 7, "rules").await.unwrap_err(),
        ServiceError::NotFound(_)
    ));
    assert_eq!(CustomCommandService::normalize("!Hi"), "hi");

    common::teardown_db(db_path).await;
}
