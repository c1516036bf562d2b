//! Timed giveaways drawn from message reactions.

use std::sync::Arc;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use rand::seq::SliceRandom;
use sqlx::types::Json;

use crate::model::GiveawayModel;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;
use crate::service::time::parse_duration_spec;

pub const MIN_GIVEAWAY_SECS: i64 = 60;

/// Picks up to `count` distinct winners.
pub fn draw_winners(entrants: &[u64], count: usize) -> Vec<u64> {
    let mut rng = rand::thread_rng();
    entrants
        .choose_multiple(&mut rng, count.min(entrants.len()))
        .copied()
        .collect()
}

pub struct GiveawayService {
    db: Arc<Repository>,
}

impl GiveawayService {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// Validates a `1d12h30m` duration and winner count. Returns the end time.
    pub fn validate_start(
        duration: &str,
        winners: i64,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ServiceError> {
        let secs = parse_duration_spec(duration).ok_or_else(|| {
            ServiceError::InvalidArgument(
                "Invalid duration format. Use a combination of numbers and units (d, h, m, s). Example: 1d12h30m"
                    .to_string(),
            )
        })?;
        if secs < MIN_GIVEAWAY_SECS {
            return Err(ServiceError::InvalidArgument(
                "Giveaway duration must be at least 1 minute.".to_string(),
            ));
        }
        if winners < 1 {
            return Err(ServiceError::InvalidArgument(
                "Number of winners must be at least 1.".to_string(),
            ));
        }
        Duration::try_seconds(secs)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| {
                ServiceError::InvalidArgument("Giveaway duration is too long.".to_string())
            })
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        message_id: u64,
        guild_id: u64,
        channel_id: u64,
        host_id: u64,
        prize: &str,
        winners: i64,
        end_time: DateTime<Utc>,
    ) -> Result<GiveawayModel, ServiceError> {
        let mut model = GiveawayModel {
            message_id,
            guild_id,
            channel_id,
            host_id,
            prize: prize.to_string(),
            winners,
            end_time,
            ended: false,
            winner_ids: Json(Vec::new()),
            ..Default::default()
        };
        model.id = self.db.giveaway.insert(&model).await?;
        Ok(model)
    }

    /// Finds a giveaway by its message, restricted to one guild.
    pub async fn get(&self, guild_id: u64, message_id: u64) -> Result<GiveawayModel, ServiceError> {
        self.db
            .giveaway
            .select_by_message(message_id)
            .await?
            .filter(|g| g.guild_id == guild_id)
            .ok_or_else(|| ServiceError::NotFound("Giveaway not found.".to_string()))
    }

    pub async fn due(&self, now: DateTime<Utc>) -> Result<Vec<GiveawayModel>, ServiceError> {
        Ok(self.db.giveaway.select_due(&now).await?)
    }

    pub async fn active(&self, guild_id: u64) -> Result<Vec<GiveawayModel>, ServiceError> {
        Ok(self.db.giveaway.select_active_by_guild(guild_id).await?)
    }

    /// Takes ownership of ending a giveaway. Only the first caller gets true,
    /// so a manual end and the checker never both draw.
    ///
    /// # Performance
    /// * DB calls: 1
    pub async fn claim_end(&self, giveaway: &GiveawayModel) -> Result<bool, ServiceError> {
        Ok(self.db.giveaway.mark_ended(giveaway.id).await?)
    }

    /// Marks the giveaway as ended with the drawn winners.
    pub async fn finish(
        &self,
        giveaway: &mut GiveawayModel,
        winner_ids: Vec<u64>,
    ) -> Result<(), ServiceError> {
        giveaway.ended = true;
        giveaway.winner_ids = Json(winner_ids);
        self.db.giveaway.update(giveaway).await?;
        Ok(())
    }

    pub async fn delete(&self, giveaway: &GiveawayModel) -> Result<(), ServiceError> {
        self.db.giveaway.delete(&giveaway.id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_draw_winners_is_bounded_and_distinct() {
        let entrants = vec![1, 2, 3, 4, 5];
        let winners = draw_winners(&entrants, 3);
        assert_eq!(winners.len(), 3);
        assert_eq!(winners.iter().collect::<HashSet<_>>().len(), 3);
        assert!(winners.iter().all(|w| entrants.contains(w)));

        assert_eq!(draw_winners(&entrants, 10).len(), 5);
        assert!(draw_winners(&[], 2).is_empty());
    }

    #[test]
    fn test_validate_start() {
        let now = Utc::now();
        assert_eq!(
            GiveawayService::validate_start("1h", 1, now).unwrap(),
            now + Duration::hours(1)
        );
        assert!(GiveawayService::validate_start("30s", 1, now).is_err());
        assert!(GiveawayService::validate_start("1h", 0, now).is_err());
        assert!(GiveawayService::validate_start("tomorrow", 1, now).is_err());
    }

    #[test]
    fn test_validate_start_rejects_huge_durations() {
        let now = Utc::now();
        for duration in ["99999999999999999s", "9999999999999s", "99999999999d"] {
            assert!(matches!(
                GiveawayService::validate_start(duration, 1, now),
                Err(ServiceError::InvalidArgument(_))
            ));
        }
    }
}
