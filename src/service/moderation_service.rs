//! Warnings and the punishment history.

use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;

use crate::model::PunishmentModel;
use crate::model::PunishmentType;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;

/// Longest communication timeout Discord accepts.
pub const MAX_TIMEOUT_SECS: i64 = 28 * 24 * 3600;
pub const DEFAULT_MUTE_SECS: i64 = 3600;

/// Automatic follow-up once a member accumulates warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnEscalation {
    /// One hour timeout.
    Timeout,
    Kick,
    Ban,
}

impl WarnEscalation {
    pub fn for_count(count: i64) -> Option<Self> {
        match count {
            3 => Some(Self::Timeout),
            5 => Some(Self::Kick),
            7 => Some(Self::Ban),
            _ => None,
        }
    }
}

pub struct ModerationService {
    db: Arc<Repository>,
}

impl ModerationService {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// Records a punishment and returns its id.
    pub async fn record(
        &self,
        guild_id: u64,
        user_id: u64,
        moderator_id: u64,
        punishment_type: PunishmentType,
        reason: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<i64, ServiceError> {
        let model = PunishmentModel {
            guild_id,
            user_id,
            moderator_id,
            punishment_type,
            reason: reason.to_string(),
            expires_at,
            timestamp: Utc::now(),
            ..Default::default()
        };
        Ok(self.db.punishment.insert(&model).await?)
    }

    /// Records a warning. Returns the member's warning count and any escalation due.
    ///
    /// # Performance
    /// * DB calls: 2
    pub async fn warn(
        &self,
        guild_id: u64,
        user_id: u64,
        moderator_id: u64,
        reason: &str,
    ) -> Result<(i64, Option<WarnEscalation>), ServiceError> {
        self.record(
            guild_id,
            user_id,
            moderator_id,
            PunishmentType::Warn,
            reason,
            None,
        )
        .await?;
        let count = self
            .db
            .punishment
            .count_by_member(guild_id, user_id, PunishmentType::Warn)
            .await?;
        Ok((count, WarnEscalation::for_count(count)))
    }

    /// Latest warnings, newest first, plus the total count.
    pub async fn warnings(
        &self,
        guild_id: u64,
        user_id: u64,
        limit: u32,
    ) -> Result<(Vec<PunishmentModel>, i64), ServiceError> {
        let list = self
            .db
            .punishment
            .select_by_member(guild_id, user_id, PunishmentType::Warn, limit)
            .await?;
        let total = self
            .db
            .punishment
            .count_by_member(guild_id, user_id, PunishmentType::Warn)
            .await?;
        Ok((list, total))
    }

    /// Returns how many warnings were removed.
    pub async fn clear_warnings(&self, guild_id: u64, user_id: u64) -> Result<u64, ServiceError> {
        Ok(self
            .db
            .punishment
            .delete_by_member(guild_id, user_id, PunishmentType::Warn)
            .await?)
    }

    /// Records a ban found on the guild unless one is already on file.
    pub async fn record_ban_if_missing(
        &self,
        guild_id: u64,
        user_id: u64,
        moderator_id: u64,
        reason: &str,
    ) -> Result<bool, ServiceError> {
        let existing = self
            .db
            .punishment
            .count_by_member(guild_id, user_id, PunishmentType::Ban)
            .await?;
        if existing > 0 {
            return Ok(false);
        }
        self.record(
            guild_id,
            user_id,
            moderator_id,
            PunishmentType::Ban,
            reason,
            None,
        )
        .await?;
        Ok(true)
    }
}

/// Validates a timeout length in seconds.
pub fn validate_timeout(seconds: i64) -> Result<(), ServiceError> {
    if seconds <= 0 {
        return Err(ServiceError::InvalidArgument(
            "Duration must be positive.".to_string(),
        ));
    }
    if seconds > MAX_TIMEOUT_SECS {
        return Err(ServiceError::InvalidArgument(
            "Duration cannot exceed 28 days.".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_escalation_thresholds() {
        assert_eq!(WarnEscalation::for_count(1), None);
        assert_eq!(WarnEscalation::for_count(3), Some(WarnEscalation::Timeout));
        assert_eq!(WarnEscalation::for_count(4), None);
        assert_eq!(WarnEscalation::for_count(5), Some(WarnEscalation::Kick));
        assert_eq!(WarnEscalation::for_count(7), Some(WarnEscalation::Ban));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        assert!(validate_timeout(60).is_ok());
        assert!(validate_timeout(MAX_TIMEOUT_SECS).is_ok());
        assert!(validate_timeout(0).is_err());
        assert!(validate_timeout(MAX_TIMEOUT_SECS + 1).is_err());
    }
}
