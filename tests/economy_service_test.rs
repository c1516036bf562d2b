use chrono::Duration;
use chrono::Utc;
use zenshell_bot::service::economy_service::DAILY_BASE_REWARD;
use zenshell_bot::service::economy_service::ShopEntry;
use zenshell_bot::service::error::ServiceError;

mod common;

#[tokio::test]
async fn test_daily_streak_continues_within_grace() {
    let (services, _db, db_path) = common::setup_services().await;
    let economy = &services.economy;
    let start = Utc::now();

    let first = economy.claim_daily(1, start).await.unwrap();
    assert_eq!(first.streak, 1);
    assert_eq!(first.base, DAILY_BASE_REWARD);
    assert_eq!(first.balance, first.total());

    // Claiming again before 24h is refused.
    let err = economy
        .claim_daily(1, start + Duration::hours(23))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::OnCooldown(_)));

    let second = economy
        .claim_daily(1, start + Duration::hours(25))
        .await
        .unwrap();
    assert_eq!(second.streak, 2);
    assert_eq!(second.balance, first.total() + second.total());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_daily_streak_resets_after_grace() {
    let (services, _db, db_path) = common::setup_services().await;
    let economy = &services.economy;
    let start = Utc::now();

    economy.claim_daily(1, start).await.unwrap();
    economy
        .claim_daily(1, start + Duration::hours(25))
        .await
        .unwrap();
    let late = economy
        .claim_daily(1, start + Duration::hours(25 + 49))
        .await
        .unwrap();
    assert_eq!(late.streak, 1);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_concurrent_daily_claims_pay_once() {
    let (services, _db, db_path) = common::setup_services().await;
    let now = Utc::now();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let services = services.clone();
            tokio::spawn(async move { services.economy.claim_daily(1, now).await })
        })
        .collect();

    let mut paid = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(reward) => paid.push(reward),
            Err(err) => assert!(matches!(err, ServiceError::OnCooldown(_))),
        }
    }
    assert_eq!(paid.len(), 1);
    assert_eq!(services.economy.balance(1).await.unwrap(), paid[0].total());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_daily_claim_keeps_coins_credited_meanwhile() {
    let (services, _db, db_path) = common::setup_services().await;
    let economy = &services.economy;
    let now = Utc::now();

    economy.add_coins(1, 500).await.unwrap();
    let daily = economy.claim_daily(1, now).await.unwrap();
    economy.add_coins(1, 5).await.unwrap();
    let shift = economy.work(1, now).await.unwrap();

    assert_eq!(
        economy.balance(1).await.unwrap(),
        500 + daily.total() + 5 + shift.earnings
    );

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_work_has_hourly_cooldown() {
    let (services, _db, db_path) = common::setup_services().await;
    let economy = &services.economy;
    let now = Utc::now();

    let shift = economy.work(1, now).await.unwrap();
    assert!(shift.earnings > 0);
    assert_eq!(economy.balance(1).await.unwrap(), shift.earnings);

    let err = economy
        .work(1, now + Duration::minutes(30))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::OnCooldown(_)));

    assert!(economy.work(1, now + Duration::minutes(61)).await.is_ok());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_gamble_requires_funds() {
    let (services, _db, db_path) = common::setup_services().await;
    let economy = &services.economy;

    let err = economy.gamble(1, 0).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidArgument(_)));

    let err = economy.gamble(1, 50).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InsufficientFunds {
            needed: 50,
            balance: 0
        }
    ));

    economy.add_coins(1, 100).await.unwrap();
    let result = economy.gamble(1, 100).await.unwrap();
    assert_eq!(result.balance, result.payout);
    assert!(result.balance >= 0);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_concurrent_gambles_never_overdraw() {
    let (services, _db, db_path) = common::setup_services().await;
    services.economy.add_coins(1, 100).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let services = services.clone();
            tokio::spawn(async move { services.economy.gamble(1, 100).await })
        })
        .collect();

    for handle in handles {
        match handle.await.unwrap() {
            Ok(result) => assert!(result.balance >= 0),
            Err(err) => assert!(matches!(err, ServiceError::InsufficientFunds { .. })),
        }
    }
    assert!(services.economy.balance(1).await.unwrap() >= 0);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_give_moves_coins() {
    let (services, _db, db_path) = common::setup_services().await;
    let economy = &services.economy;

    assert!(economy.give(1, 1, 10).await.is_err());
    assert!(economy.give(1, 2, 10).await.is_err());

    economy.add_coins(1, 100).await.unwrap();
    economy.give(1, 2, 40).await.unwrap();
    assert_eq!(economy.balance(1).await.unwrap(), 60);
    assert_eq!(economy.balance(2).await.unwrap(), 40);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_remove_coins_clamps_at_zero() {
    let (services, _db, db_path) = common::setup_services().await;
    let economy = &services.economy;

    economy.add_coins(1, 30).await.unwrap();
    let (removed, balance) = economy.remove_coins(1, 100).await.unwrap();
    assert_eq!(removed, 30);
    assert_eq!(balance, 0);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_debit_and_refund() {
    let (services, _db, db_path) = common::setup_services().await;
    let economy = &services.economy;

    economy.add_coins(1, 100).await.unwrap();
    assert_eq!(economy.debit(1, 70).await.unwrap(), 30);
    assert!(matches!(
        economy.debit(1, 70).await.unwrap_err(),
        ServiceError::InsufficientFunds { balance: 30, .. }
    ));
    assert_eq!(economy.refund(1, 70).await.unwrap(), 100);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_shop_ids_follow_highest_existing() {
    let (services, _db, db_path) = common::setup_services().await;
    let economy = &services.economy;
    let guild = 500;

    // The default shop carries items 1 and 2.
    let id = economy
        .add_shop_item(guild, "Sticker", 50, "A shiny sticker")
        .await
        .unwrap();
    assert_eq!(id, "3");

    let role_id = economy.add_shop_role(guild, 42, "Gold", 1000).await.unwrap();
    assert_eq!(role_id, "1");

    match economy.shop_entry(guild, "1").await.unwrap() {
        ShopEntry::Role(role) => assert_eq!(role.role_id, 42),
        ShopEntry::Item(_) => panic!("role ids take precedence"),
    }

    let removed = economy.remove_shop_item(guild, "3").await.unwrap();
    assert_eq!(removed.name, "Sticker");
    assert!(matches!(
        economy.remove_shop_item(guild, "3").await.unwrap_err(),
        ServiceError::NotFound(_)
    ));
    assert!(economy.add_shop_role(guild, 43, "Free", 0).await.is_err());

    // Shops are per guild.
    assert!(matches!(
        economy.shop_entry(guild + 1, "3").await.unwrap_err(),
        ServiceError::NotFound(_)
    ));

    common::teardown_db(db_path).await;
}
