//! Coins, daily rewards, jobs, gambling and the per-guild shop.

use std::sync::Arc;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use rand::Rng;

use crate::model::EconomyModel;
use crate::model::ShopItem;
use crate::model::ShopItemKind;
use crate::model::ShopRole;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;
use crate::service::settings_service::SettingsService;

pub const DAILY_COOLDOWN_HOURS: i64 = 24;
/// A claim within this window of the previous one keeps the streak alive.
pub const STREAK_GRACE_HOURS: i64 = 48;
pub const WORK_COOLDOWN_HOURS: i64 = 1;

pub const DAILY_BASE_REWARD: i64 = 100;
pub const DAILY_STREAK_BONUS_CAP: i64 = 200;

/// Job name with its inclusive pay range.
pub const JOBS: [(&str, i64, i64); 10] = [
    ("Software Developer", 150, 300),
    ("Teacher", 100, 250),
    ("Chef", 120, 280),
    ("Delivery Driver", 80, 200),
    ("Streamer", 50, 500),
    ("Artist", 100, 400),
    ("Doctor", 200, 350),
    ("Lawyer", 180, 320),
    ("Musician", 90, 280),
    ("Astronaut", 250, 400),
];

/// Breakdown of a daily claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyReward {
    pub streak: i64,
    pub base: i64,
    pub streak_bonus: i64,
    /// Extra coins for hitting a 7 or 30 day streak.
    pub milestone_bonus: Option<i64>,
    pub balance: i64,
}

impl DailyReward {
    pub fn total(&self) -> i64 {
        self.base + self.streak_bonus + self.milestone_bonus.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkResult {
    pub job: &'static str,
    pub earnings: i64,
    pub balance: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GambleOutcome {
    Lose,
    BreakEven,
    /// 1.5x the bet back.
    Win,
    /// 2x the bet back.
    Jackpot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GambleResult {
    pub roll: u32,
    pub outcome: GambleOutcome,
    /// Change to the balance. Negative on a loss.
    pub net: i64,
    /// Total paid back, including the bet.
    pub payout: i64,
    pub balance: i64,
}

/// Streak after a claim at `now`, given the previous claim.
pub fn next_streak(last_claim: Option<DateTime<Utc>>, streak: i64, now: DateTime<Utc>) -> i64 {
    match last_claim {
        Some(last) if now - last < Duration::hours(STREAK_GRACE_HOURS) => streak + 1,
        _ => 1,
    }
}

/// `(streak bonus, milestone bonus)` for a streak length.
pub fn daily_bonus(streak: i64) -> (i64, Option<i64>) {
    let streak_bonus = (streak * 10).min(DAILY_STREAK_BONUS_CAP);
    let milestone = match streak {
        7 => Some(500),
        30 => Some(2000),
        _ => None,
    };
    (streak_bonus, milestone)
}

/// Maps a 1-100 roll onto an outcome and the coins paid back for `amount`.
pub fn gamble_outcome(roll: u32, amount: i64) -> (GambleOutcome, i64) {
    match roll {
        0..=40 => (GambleOutcome::Lose, 0),
        41..=60 => (GambleOutcome::BreakEven, amount),
        61..=90 => (GambleOutcome::Win, amount * 3 / 2),
        _ => (GambleOutcome::Jackpot, amount * 2),
    }
}

/// `"5 hours 3 minutes 2 seconds"`, used for cooldown messages.
pub fn format_cooldown(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{} hour{}", hours, if hours != 1 { "s" } else { "" }));
    }
    if minutes > 0 {
        parts.push(format!("{} minute{}", minutes, if minutes != 1 { "s" } else { "" }));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{} second{}", seconds, if seconds != 1 { "s" } else { "" }));
    }
    parts.join(" ")
}

fn daily_ready(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if let Some(last) = last {
        let ready_at = last + Duration::hours(DAILY_COOLDOWN_HOURS);
        if now < ready_at {
            return Err(ServiceError::OnCooldown(format!(
                "You've already claimed your daily reward. Try again in {}.",
                format_cooldown(ready_at - now)
            )));
        }
    }
    Ok(())
}

fn work_ready(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if let Some(last) = last {
        let ready_at = last + Duration::hours(WORK_COOLDOWN_HOURS);
        if now < ready_at {
            return Err(ServiceError::OnCooldown(format!(
                "You're still on break. You can work again in {}.",
                format_cooldown(ready_at - now)
            )));
        }
    }
    Ok(())
}

/// Next free numeric id in a shop map. Ids of removed entries are not reused.
pub fn next_shop_id<V>(map: &std::collections::BTreeMap<String, V>) -> String {
    let max = map
        .keys()
        .filter_map(|k| k.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    (max + 1).to_string()
}

/// What a shop id resolved to.
#[derive(Debug, Clone)]
pub enum ShopEntry {
    Role(ShopRole),
    Item(ShopItem),
}

impl ShopEntry {
    pub fn price(&self) -> i64 {
        match self {
            ShopEntry::Role(role) => role.price,
            ShopEntry::Item(item) => item.price,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ShopEntry::Role(role) => &role.name,
            ShopEntry::Item(item) => &item.name,
        }
    }

    pub fn item_kind(&self) -> Option<ShopItemKind> {
        match self {
            ShopEntry::Role(_) => None,
            ShopEntry::Item(item) => Some(item.kind),
        }
    }
}

pub struct EconomyService {
    db: Arc<Repository>,
    settings: Arc<SettingsService>,
}

impl EconomyService {
    pub fn new(db: Arc<Repository>, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    async fn wallet(&self, user_id: u64) -> Result<EconomyModel, ServiceError> {
        Ok(self.db.economy.select(&user_id).await?.unwrap_or(EconomyModel {
            user_id,
            ..Default::default()
        }))
    }

    /// Current balance, 0 for users without a wallet.
    ///
    /// # Performance
    /// * DB calls: 1
    pub async fn balance(&self, user_id: u64) -> Result<i64, ServiceError> {
        Ok(self.wallet(user_id).await?.balance)
    }

    /// Claims the daily reward, continuing or resetting the streak.
    ///
    /// The credit only lands if `last_daily` is unchanged since it was read,
    /// so concurrent claims pay out once.
    ///
    /// # Performance
    /// * DB calls: 3
    pub async fn claim_daily(
        &self,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> Result<DailyReward, ServiceError> {
        self.db.economy.ensure_wallet(user_id).await?;
        let wallet = self.wallet(user_id).await?;
        daily_ready(wallet.last_daily, now)?;

        let streak = next_streak(wallet.last_daily, wallet.daily_streak, now);
        let (streak_bonus, milestone_bonus) = daily_bonus(streak);
        let mut reward = DailyReward {
            streak,
            base: DAILY_BASE_REWARD,
            streak_bonus,
            milestone_bonus,
            balance: 0,
        };

        let Some(balance) = self
            .db
            .economy
            .claim_daily(
                user_id,
                reward.total(),
                streak,
                wallet.last_daily.as_ref(),
                &now,
            )
            .await?
        else {
            let last = self.wallet(user_id).await?.last_daily;
            daily_ready(last, now)?;
            return Err(ServiceError::OnCooldown(
                "You've already claimed your daily reward.".to_string(),
            ));
        };

        reward.balance = balance;
        Ok(reward)
    }

    /// Works a random job once per hour.
    ///
    /// # Performance
    /// * DB calls: 3
    pub async fn work(&self, user_id: u64, now: DateTime<Utc>) -> Result<WorkResult, ServiceError> {
        self.db.economy.ensure_wallet(user_id).await?;
        let wallet = self.wallet(user_id).await?;
        work_ready(wallet.last_work, now)?;

        let (job, earnings) = {
            let mut rng = rand::thread_rng();
            let (job, min, max) = JOBS[rng.gen_range(0..JOBS.len())];
            (job, rng.gen_range(min..=max))
        };

        let Some(balance) = self
            .db
            .economy
            .claim_work(user_id, earnings, wallet.last_work.as_ref(), &now)
            .await?
        else {
            let last = self.wallet(user_id).await?.last_work;
            work_ready(last, now)?;
            return Err(ServiceError::OnCooldown(
                "You're already working a shift.".to_string(),
            ));
        };

        Ok(WorkResult {
            job,
            earnings,
            balance,
        })
    }

    /// Bets `amount` on a 1-100 roll.
    pub async fn gamble(&self, user_id: u64, amount: i64) -> Result<GambleResult, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::InvalidArgument(
                "You must bet a positive amount of coins.".to_string(),
            ));
        }
        if self.db.economy.try_debit(user_id, amount).await?.is_none() {
            return Err(ServiceError::InsufficientFunds {
                needed: amount,
                balance: self.balance(user_id).await?,
            });
        }

        let roll = rand::thread_rng().gen_range(1..=100);
        let (outcome, payout) = gamble_outcome(roll, amount);
        let net = payout - amount;
        let balance = self.db.economy.add_balance(user_id, payout).await?;

        Ok(GambleResult {
            roll,
            outcome,
            net,
            payout,
            balance,
        })
    }

    /// Moves coins from one user to another atomically.
    pub async fn give(&self, from: u64, to: u64, amount: i64) -> Result<(), ServiceError> {
        if from == to {
            return Err(ServiceError::InvalidArgument(
                "You can't give coins to yourself.".to_string(),
            ));
        }
        if amount <= 0 {
            return Err(ServiceError::InvalidArgument(
                "You must give a positive amount of coins.".to_string(),
            ));
        }
        if !self.db.economy.transfer(from, to, amount).await? {
            return Err(ServiceError::InvalidArgument(
                "You don't have enough coins to give that amount.".to_string(),
            ));
        }
        Ok(())
    }

    /// Adds coins. Returns the new balance.
    pub async fn add_coins(&self, user_id: u64, amount: i64) -> Result<i64, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::InvalidArgument(
                "Amount must be positive.".to_string(),
            ));
        }
        Ok(self.db.economy.add_balance(user_id, amount).await?)
    }

    /// Removes up to `amount` coins, never going below zero.
    ///
    /// Returns `(removed, new balance)`.
    pub async fn remove_coins(&self, user_id: u64, amount: i64) -> Result<(i64, i64), ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::InvalidArgument(
                "Amount must be positive.".to_string(),
            ));
        }
        let balance = self.balance(user_id).await?;
        let removed = amount.min(balance);
        let new_balance = self.db.economy.add_balance(user_id, -removed).await?;
        Ok((removed, new_balance))
    }

    /// Takes `amount` coins or fails without touching the balance.
    pub async fn debit(&self, user_id: u64, amount: i64) -> Result<i64, ServiceError> {
        match self.db.economy.try_debit(user_id, amount).await? {
            Some(balance) => Ok(balance),
            None => Err(ServiceError::InsufficientFunds {
                needed: amount,
                balance: self.balance(user_id).await?,
            }),
        }
    }

    pub async fn refund(&self, user_id: u64, amount: i64) -> Result<i64, ServiceError> {
        Ok(self.db.economy.add_balance(user_id, amount).await?)
    }

    // ========================================================================
    // Shop
    // ========================================================================

    /// Looks an id up among the guild's roles first, then its items.
    pub async fn shop_entry(&self, guild_id: u64, id: &str) -> Result<ShopEntry, ServiceError> {
        let settings = self.settings.get_server_settings(guild_id).await?;
        if let Some(role) = settings.shop.roles.get(id) {
            return Ok(ShopEntry::Role(role.clone()));
        }
        if let Some(item) = settings.shop.items.get(id) {
            return Ok(ShopEntry::Item(item.clone()));
        }
        Err(ServiceError::NotFound(format!(
            "Item `{id}` not found in the shop."
        )))
    }

    pub async fn add_shop_role(
        &self,
        guild_id: u64,
        role_id: u64,
        name: &str,
        price: i64,
    ) -> Result<String, ServiceError> {
        if price <= 0 {
            return Err(ServiceError::InvalidArgument(
                "Price must be positive.".to_string(),
            ));
        }
        self.settings
            .modify(guild_id, |settings| {
                let id = next_shop_id(&settings.shop.roles);
                settings.shop.roles.insert(
                    id.clone(),
                    ShopRole {
                        role_id,
                        name: name.to_string(),
                        price,
                    },
                );
                id
            })
            .await
    }

    pub async fn remove_shop_role(&self, guild_id: u64, id: &str) -> Result<ShopRole, ServiceError> {
        self.settings
            .try_modify(guild_id, |settings| {
                settings
                    .shop
                    .roles
                    .remove(id)
                    .ok_or_else(|| ServiceError::NotFound(format!("Role item `{id}` not found.")))
            })
            .await
    }

    pub async fn add_shop_item(
        &self,
        guild_id: u64,
        name: &str,
        price: i64,
        description: &str,
    ) -> Result<String, ServiceError> {
        if price <= 0 {
            return Err(ServiceError::InvalidArgument(
                "Price must be positive.".to_string(),
            ));
        }
        self.settings
            .modify(guild_id, |settings| {
                let id = next_shop_id(&settings.shop.items);
                settings.shop.items.insert(
                    id.clone(),
                    ShopItem {
                        name: name.to_string(),
                        price,
                        description: description.to_string(),
                        kind: ShopItemKind::Custom,
                    },
                );
                id
            })
            .await
    }

    pub async fn remove_shop_item(&self, guild_id: u64, id: &str) -> Result<ShopItem, ServiceError> {
        self.settings
            .try_modify(guild_id, |settings| {
                settings
                    .shop
                    .items
                    .remove(id)
                    .ok_or_else(|| ServiceError::NotFound(format!("Item `{id}` not found.")))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_next_streak_continues_within_grace() {
        let now = Utc::now();
        assert_eq!(next_streak(Some(now - Duration::hours(30)), 3, now), 4);
    }

    #[test]
    fn test_next_streak_resets_after_grace() {
        let now = Utc::now();
        assert_eq!(next_streak(Some(now - Duration::hours(49)), 6, now), 1);
        assert_eq!(next_streak(None, 0, now), 1);
    }

    #[test]
    fn test_daily_bonus_caps_and_milestones() {
        assert_eq!(daily_bonus(1), (10, None));
        assert_eq!(daily_bonus(7), (70, Some(500)));
        assert_eq!(daily_bonus(30), (200, Some(2000)));
        assert_eq!(daily_bonus(45), (200, None));
    }

    #[test]
    fn test_gamble_outcome_bands() {
        assert_eq!(gamble_outcome(1, 100), (GambleOutcome::Lose, 0));
        assert_eq!(gamble_outcome(40, 100), (GambleOutcome::Lose, 0));
        assert_eq!(gamble_outcome(41, 100), (GambleOutcome::BreakEven, 100));
        assert_eq!(gamble_outcome(90, 100), (GambleOutcome::Win, 150));
        assert_eq!(gamble_outcome(91, 100), (GambleOutcome::Jackpot, 200));
        // Integer truncation like the payout table
        assert_eq!(gamble_outcome(75, 5), (GambleOutcome::Win, 7));
    }

    #[test]
    fn test_format_cooldown() {
        assert_eq!(format_cooldown(Duration::seconds(3661)), "1 hour 1 minute 1 second");
        assert_eq!(format_cooldown(Duration::seconds(7200)), "2 hours");
        assert_eq!(format_cooldown(Duration::seconds(0)), "0 seconds");
    }

    #[test]
    fn test_next_shop_id_skips_removed_ids() {
        let mut map = BTreeMap::new();
        assert_eq!(next_shop_id::<()>(&map), "1");
        map.insert("1".to_string(), ());
        map.insert("3".to_string(), ());
        assert_eq!(next_shop_id(&map), "4");
    }
}
