//! Users, message activity, experience and achievements.

use std::sync::Arc;

use chrono::Utc;

use crate::model::AchievementModel;
use crate::model::LeaderboardEntry;
use crate::model::LeaderboardOpt;
use crate::model::MessageModel;
use crate::model::UserModel;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;

/// Stored message content is cut to this many characters.
pub const MAX_MESSAGE_CONTENT: usize = 500;

/// Message counts that unlock an activity achievement.
pub const MESSAGE_MILESTONES: [(u64, &str); 3] = [
    (10, "Chatty"),
    (100, "Conversador"),
    (1000, "Comunicador Experto"),
];

/// Levels that unlock a "Reached Level N" achievement.
pub const LEVEL_MILESTONES: [i64; 5] = [5, 10, 25, 50, 100];

/// Experience needed to go from `level` to `level + 1`.
pub fn xp_for_level(level: i64) -> i64 {
    100 * level * level
}

/// Applies `amount` experience to a `(level, xp)` pair.
///
/// Returns the new pair. Multiple levels can be gained at once.
pub fn apply_xp(level: i64, xp: i64, amount: i64) -> (i64, i64) {
    let mut level = level.max(1);
    let mut xp = (xp + amount).max(0);
    while xp >= xp_for_level(level) {
        xp -= xp_for_level(level);
        level += 1;
    }
    (level, xp)
}

/// Percentage of the way from the current level to the next one.
pub fn level_progress(level: i64, xp: i64) -> f64 {
    let needed = xp_for_level(level.max(1));
    (xp as f64 / needed as f64 * 100.0).clamp(0.0, 100.0)
}

/// Achievement granted when `count` messages is reached, if any.
pub fn message_milestone(count: u64) -> Option<&'static str> {
    MESSAGE_MILESTONES
        .iter()
        .find(|(n, _)| *n == count)
        .map(|(_, name)| *name)
}

/// Result of [`UserService::add_xp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpOutcome {
    pub level: i64,
    pub xp: i64,
    pub previous_level: i64,
    pub leveled_up: bool,
}

pub struct UserService {
    db: Arc<Repository>,
}

impl UserService {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// Returns the user row, creating it with defaults when missing.
    ///
    /// # Performance
    /// * DB calls: 1-2
    pub async fn get_or_create_user(
        &self,
        discord_id: u64,
        username: &str,
    ) -> Result<UserModel, ServiceError> {
        if let Some(user) = self.db.user.select(&discord_id).await? {
            return Ok(user);
        }

        let user = UserModel {
            discord_id,
            username: username.to_string(),
            ..Default::default()
        };
        self.db.user.insert_if_absent(&user).await?;
        Ok(self.db.user.select(&discord_id).await?.unwrap_or(user))
    }

    pub async fn get_user(&self, discord_id: u64) -> Result<Option<UserModel>, ServiceError> {
        Ok(self.db.user.select(&discord_id).await?)
    }

    /// Creates the user when missing. Returns true if a row was created.
    pub async fn ensure_user(&self, discord_id: u64, username: &str) -> Result<bool, ServiceError> {
        let user = UserModel {
            discord_id,
            username: username.to_string(),
            ..Default::default()
        };
        Ok(self.db.user.insert_if_absent(&user).await?)
    }

    /// Stores a message, truncated to [`MAX_MESSAGE_CONTENT`] characters.
    pub async fn record_message(&self, user_id: u64, content: &str) -> Result<(), ServiceError> {
        let content: String = content.chars().take(MAX_MESSAGE_CONTENT).collect();
        let model = MessageModel {
            user_id,
            content,
            timestamp: Utc::now(),
            ..Default::default()
        };
        self.db.message.insert(&model).await?;
        Ok(())
    }

    pub async fn message_count(&self, user_id: u64) -> Result<i64, ServiceError> {
        Ok(self.db.message.count_by_user(user_id).await?)
    }

    /// Adds experience and levels the user up as many times as it allows.
    ///
    /// # Performance
    /// * DB calls: 2
    pub async fn add_xp(&self, user_id: u64, amount: i64) -> Result<XpOutcome, ServiceError> {
        let user = self
            .db
            .user
            .select(&user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {user_id} is not registered.")))?;

        let (level, xp) = apply_xp(user.level, user.xp, amount);
        self.db
            .user
            .update_progress(user_id, xp, level, &Utc::now())
            .await?;

        Ok(XpOutcome {
            level,
            xp,
            previous_level: user.level,
            leveled_up: level > user.level,
        })
    }

    /// Grants an achievement. Returns false if the user already had it.
    pub async fn add_achievement(&self, user_id: u64, name: &str) -> Result<bool, ServiceError> {
        let model = AchievementModel {
            user_id,
            achievement_name: name.to_string(),
            date_achieved: Utc::now(),
            ..Default::default()
        };
        Ok(self.db.achievement.insert_if_absent(&model).await?)
    }

    pub async fn achievements(&self, user_id: u64) -> Result<Vec<AchievementModel>, ServiceError> {
        Ok(self.db.achievement.select_by_user(user_id).await?)
    }

    pub async fn leaderboard(
        &self,
        opts: &LeaderboardOpt,
    ) -> Result<(Vec<LeaderboardEntry>, u32), ServiceError> {
        let entries = self.db.user.select_leaderboard(opts).await?;
        let total = self.db.user.count_leaderboard(opts).await?;
        Ok((entries, total))
    }

    pub async fn rank_of(&self, user_id: u64) -> Result<Option<u32>, ServiceError> {
        Ok(self.db.user.rank_of(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_xp_without_level_up() {
        assert_eq!(apply_xp(1, 0, 50), (1, 50));
    }

    #[test]
    fn test_apply_xp_exact_threshold_levels_up() {
        assert_eq!(apply_xp(1, 99, 1), (2, 0));
    }

    #[test]
    fn test_apply_xp_multiple_levels() {
        // 100 for level 1, 400 for level 2, leaving 10
        assert_eq!(apply_xp(1, 0, 510), (3, 10));
    }

    #[test]
    fn test_level_progress_is_percentage() {
        assert_eq!(level_progress(2, 200), 50.0);
        assert_eq!(level_progress(1, 0), 0.0);
    }

    #[test]
    fn test_message_milestones() {
        assert_eq!(message_milestone(10), Some("Chatty"));
        assert_eq!(message_milestone(100), Some("Conversador"));
        assert_eq!(message_milestone(1000), Some("Comunicador Experto"));
        assert_eq!(message_milestone(11), None);
    }
}
