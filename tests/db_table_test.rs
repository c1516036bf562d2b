use chrono::Duration;
use chrono::Utc;
use zenshell_bot::model::AchievementModel;
use zenshell_bot::model::LeaderboardKind;
use zenshell_bot::model::LeaderboardOptBuilder;
use zenshell_bot::model::PunishmentModel;
use zenshell_bot::model::PunishmentType;
use zenshell_bot::model::ReminderModel;
use zenshell_bot::model::UserModel;
use zenshell_bot::repository::table::Table;

mod common;

// --- 1. Test Harness Macro ---
macro_rules! db_test {
    ($name:ident, |$db:ident| $body:block) => {
        #[tokio::test]
        async fn $name() {
            let ($db, db_path) = common::setup_db().await;

            $body

            common::teardown_db(db_path).await;
        }
    };
}

// --- 2. Data Fixture Macros ---
macro_rules! create_user {
    ($db:expr, $id:expr) => {
        create_user!($db, $id, {})
    };
    ($db:expr, $id:expr, { $($field:ident : $val:expr),* }) => {
        {
            #[allow(unused_mut)]
            let mut user = UserModel {
                discord_id: $id,
                username: format!("user{}", $id),
                last_active: Utc::now(),
                ..Default::default()
            };
            $(user.$field = $val.into();)*
            $db.user.insert_if_absent(&user).await.expect("Failed to insert user")
        }
    };
}

macro_rules! create_warning {
    ($db:expr, $guild:expr, $user:expr) => {
        $db.punishment
            .insert(&PunishmentModel {
                guild_id: $guild,
                user_id: $user,
                moderator_id: 1,
                punishment_type: PunishmentType::Warn,
                reason: "test".to_string(),
                timestamp: Utc::now(),
                ..Default::default()
            })
            .await
            .expect("Failed to insert punishment")
    };
}

// --- 3. Tests ---

db_test!(test_user_insert_if_absent_keeps_first_row, |db| {
    assert!(create_user!(db, 10, { xp: 50i64 }));
    assert!(!create_user!(db, 10, { xp: 999i64 }));

    let user = db.user.select(&10).await.unwrap().unwrap();
    assert_eq!(user.xp, 50);
    assert_eq!(user.username, "user10");
});

db_test!(test_leaderboard_orders_by_level_then_xp, |db| {
    create_user!(db, 1, { level: 3i64, xp: 10i64 });
    create_user!(db, 2, { level: 5i64, xp: 0i64 });
    create_user!(db, 3, { level: 3i64, xp: 90i64 });

    let opts = LeaderboardOptBuilder::default()
        .kind(LeaderboardKind::Level)
        .build()
        .unwrap();
    let rows = db.user.select_leaderboard(&opts).await.unwrap();
    let ids: Vec<u64> = rows.iter().map(|r| r.user_id).collect();
    assert_eq!(ids, vec![2, 3, 1]);

    assert_eq!(db.user.rank_of(3).await.unwrap(), Some(2));
    assert_eq!(db.user.rank_of(404).await.unwrap(), None);
});

db_test!(test_leaderboard_filters_to_user_ids, |db| {
    create_user!(db, 1, { level: 9i64 });
    create_user!(db, 2, { level: 4i64 });
    create_user!(db, 3, { level: 7i64 });

    let opts = LeaderboardOptBuilder::default()
        .kind(LeaderboardKind::Level)
        .user_ids(Some(vec![2, 3]))
        .build()
        .unwrap();
    let rows = db.user.select_leaderboard(&opts).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].user_id, 3);
    assert_eq!(db.user.count_leaderboard(&opts).await.unwrap(), 2);

    let empty = LeaderboardOptBuilder::default()
        .user_ids(Some(vec![]))
        .build()
        .unwrap();
    assert!(db.user.select_leaderboard(&empty).await.unwrap().is_empty());
});

db_test!(test_leaderboard_pages_with_offset, |db| {
    for id in 1..=5u64 {
        create_user!(db, id, { xp: (id * 10) as i64 });
    }
    let opts = LeaderboardOptBuilder::default()
        .kind(LeaderboardKind::Xp)
        .offset(Some(2))
        .limit(Some(2))
        .build()
        .unwrap();
    let rows = db.user.select_leaderboard(&opts).await.unwrap();
    let ids: Vec<u64> = rows.iter().map(|r| r.user_id).collect();
    assert_eq!(ids, vec![3, 2]);
    assert_eq!(db.user.count_leaderboard(&opts).await.unwrap(), 5);
});

db_test!(test_coins_leaderboard_includes_wallets_without_profile, |db| {
    create_user!(db, 1, { level: 2i64 });
    db.economy.add_balance(1, 100).await.unwrap();
    db.economy.add_balance(2, 500).await.unwrap();

    let rows = db.user.top(LeaderboardKind::Coins, 10).await.unwrap();
    assert_eq!(rows[0].user_id, 2);
    assert_eq!(rows[0].value, 500);
    assert_eq!(rows[0].level, 1);
    assert_eq!(rows[1].level, 2);
});

db_test!(test_achievements_are_unique_per_user, |db| {
    create_user!(db, 1);
    let achievement = AchievementModel {
        user_id: 1,
        achievement_name: "Chatty".to_string(),
        date_achieved: Utc::now(),
        ..Default::default()
    };
    assert!(db.achievement.insert_if_absent(&achievement).await.unwrap());
    assert!(!db.achievement.insert_if_absent(&achievement).await.unwrap());
    assert_eq!(db.achievement.select_by_user(1).await.unwrap().len(), 1);
});

db_test!(test_economy_try_debit_never_goes_negative, |db| {
    assert_eq!(db.economy.add_balance(7, 100).await.unwrap(), 100);
    assert_eq!(db.economy.try_debit(7, 60).await.unwrap(), Some(40));
    assert_eq!(db.economy.try_debit(7, 60).await.unwrap(), None);
    assert_eq!(db.economy.try_debit(8, 1).await.unwrap(), None);
});

db_test!(test_economy_transfer_is_atomic, |db| {
    db.economy.add_balance(1, 50).await.unwrap();

    assert!(!db.economy.transfer(1, 2, 80).await.unwrap());
    assert_eq!(db.economy.select(&1).await.unwrap().unwrap().balance, 50);
    assert!(db.economy.select(&2).await.unwrap().is_none());

    assert!(db.economy.transfer(1, 2, 30).await.unwrap());
    assert_eq!(db.economy.select(&1).await.unwrap().unwrap().balance, 20);
    assert_eq!(db.economy.select(&2).await.unwrap().unwrap().balance, 30);
});

db_test!(test_punishments_are_scoped_per_guild, |db| {
    create_warning!(db, 100, 5);
    create_warning!(db, 100, 5);
    create_warning!(db, 200, 5);

    let count = db
        .punishment
        .count_by_member(100, 5, PunishmentType::Warn)
        .await
        .unwrap();
    assert_eq!(count, 2);

    let removed = db
        .punishment
        .delete_by_member(100, 5, PunishmentType::Warn)
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(
        db.punishment
            .count_by_member(200, 5, PunishmentType::Warn)
            .await
            .unwrap(),
        1
    );
});

db_test!(test_reminders_due_and_completed, |db| {
    let now = Utc::now();
    let due = ReminderModel {
        user_id: 1,
        channel_id: 2,
        content: "due".to_string(),
        created_at: now - Duration::hours(1),
        due_at: now - Duration::minutes(1),
        ..Default::default()
    };
    let later = ReminderModel {
        content: "later".to_string(),
        due_at: now + Duration::hours(1),
        ..due.clone()
    };
    let due_id = db.reminder.insert(&due).await.unwrap();
    db.reminder.insert(&later).await.unwrap();

    let rows = db.reminder.select_due(&now).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content, "due");

    db.reminder.mark_completed(due_id).await.unwrap();
    assert!(db.reminder.select_due(&now).await.unwrap().is_empty());

    let pending = db.reminder.select_pending_by_user(1).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].content, "later");
});
