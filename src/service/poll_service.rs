//! Button polls with one vote per member.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use sqlx::types::Json;

use crate::model::PollModel;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;

pub const MIN_POLL_OPTIONS: usize = 2;
pub const MAX_POLL_OPTIONS: usize = 10;

/// Vote counts per option.
pub fn tally(options: usize, votes: &BTreeMap<u64, usize>) -> Vec<usize> {
    let mut counts = vec![0; options];
    for index in votes.values() {
        if let Some(count) = counts.get_mut(*index) {
            *count += 1;
        }
    }
    counts
}

/// Indices with the highest non-zero count. Empty when nobody voted.
pub fn leaders(counts: &[usize]) -> Vec<usize> {
    let max = counts.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }
    counts
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == max)
        .map(|(i, _)| i)
        .collect()
}

/// Splits `a | b | c` style option lists, falling back to whitespace.
pub fn parse_options(raw: &str) -> Vec<String> {
    let parts: Vec<String> = if raw.contains('|') {
        raw.split('|').map(|s| s.trim().to_string()).collect()
    } else {
        raw.split_whitespace().map(str::to_string).collect()
    };
    parts.into_iter().filter(|s| !s.is_empty()).collect()
}

pub fn validate_options(options: &[String]) -> Result<(), ServiceError> {
    if options.len() < MIN_POLL_OPTIONS {
        return Err(ServiceError::InvalidArgument(
            "You need at least 2 options for a poll.".to_string(),
        ));
    }
    if options.len() > MAX_POLL_OPTIONS {
        return Err(ServiceError::InvalidArgument(
            "You can have at most 10 options in a poll.".to_string(),
        ));
    }
    Ok(())
}

pub struct PollService {
    db: Arc<Repository>,
}

impl PollService {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        message_id: u64,
        guild_id: u64,
        channel_id: u64,
        creator_id: u64,
        question: &str,
        options: Vec<String>,
    ) -> Result<PollModel, ServiceError> {
        validate_options(&options)?;
        let model = PollModel {
            message_id,
            guild_id,
            channel_id,
            creator_id,
            question: question.to_string(),
            options: Json(options),
            votes: Json(BTreeMap::new()),
            created_at: Utc::now(),
            ended: false,
        };
        self.db.poll.insert(&model).await?;
        Ok(model)
    }

    pub async fn get(&self, message_id: u64) -> Result<PollModel, ServiceError> {
        self.db
            .poll
            .select(&message_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Poll not found.".to_string()))
    }

    /// Casts or moves a vote. Returns the updated poll.
    ///
    /// # Performance
    /// * DB calls: 2
    pub async fn vote(
        &self,
        message_id: u64,
        user_id: u64,
        option: usize,
    ) -> Result<PollModel, ServiceError> {
        let poll = self.get(message_id).await?;
        if poll.ended {
            return Err(ServiceError::Forbidden("This poll has ended.".to_string()));
        }
        if option >= poll.options.0.len() {
            return Err(ServiceError::InvalidArgument("Invalid option.".to_string()));
        }
        self.db
            .poll
            .set_vote(message_id, user_id, option)
            .await?
            .ok_or_else(|| ServiceError::Forbidden("This poll has ended.".to_string()))
    }

    /// Ends a poll. Only its creator or a message manager may do so.
    pub async fn end(
        &self,
        guild_id: u64,
        message_id: u64,
        user_id: u64,
        can_manage: bool,
    ) -> Result<PollModel, ServiceError> {
        let mut poll = self.get(message_id).await?;
        if poll.guild_id != guild_id {
            return Err(ServiceError::NotFound("Poll not found.".to_string()));
        }
        if poll.ended {
            return Err(ServiceError::InvalidArgument(
                "This poll has already ended.".to_string(),
            ));
        }
        if poll.creator_id != user_id && !can_manage {
            return Err(ServiceError::Forbidden(
                "Only the poll creator or moderators can end this poll.".to_string(),
            ));
        }
        if !self.db.poll.mark_ended(message_id).await? {
            return Err(ServiceError::InvalidArgument(
                "This poll has already ended.".to_string(),
            ));
        }
        poll.ended = true;
        Ok(poll)
    }

    pub async fn active(&self, guild_id: u64) -> Result<Vec<PollModel>, ServiceError> {
        Ok(self.db.poll.select_active_by_guild(guild_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_counts_votes_and_ignores_out_of_range() {
        let votes = BTreeMap::from([(1, 0), (2, 1), (3, 1), (4, 9)]);
        assert_eq!(tally(3, &votes), vec![1, 2, 0]);
    }

    #[test]
    fn test_leaders_handles_ties_and_no_votes() {
        assert_eq!(leaders(&[1, 3, 3]), vec![1, 2]);
        assert_eq!(leaders(&[2, 0]), vec![0]);
        assert!(leaders(&[0, 0]).is_empty());
    }

    #[test]
    fn test_parse_options() {
        assert_eq!(parse_options("Red | Blue |  | Green"), vec!["Red", "Blue", "Green"]);
        assert_eq!(parse_options("yes no"), vec!["yes", "no"]);
    }

    #[test]
    fn test_validate_options_bounds() {
        let two = vec!["a".to_string(), "b".to_string()];
        assert!(validate_options(&two).is_ok());
        assert!(validate_options(&two[..1]).is_err());
        assert!(validate_options(&vec!["x".to_string(); 11]).is_err());
    }
}
