//! Per-guild text commands created by members.

use std::sync::Arc;

use chrono::Utc;

use crate::model::CustomCommandModel;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;

pub struct CustomCommandService {
    db: Arc<Repository>,
}

impl CustomCommandService {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// Names are matched case-insensitively.
    pub fn normalize(name: &str) -> String {
        name.trim().trim_start_matches('!').to_lowercase()
    }

    pub async fn get(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<CustomCommandModel>, ServiceError> {
        Ok(self
            .db
            .custom_command
            .select_by_name(guild_id, &Self::normalize(name))
            .await?)
    }

    pub async fn list(&self, guild_id: u64) -> Result<Vec<CustomCommandModel>, ServiceError> {
        Ok(self.db.custom_command.select_by_guild(guild_id).await?)
    }

    /// # Performance
    /// * DB calls: 1
    pub async fn create(
        &self,
        guild_id: u64,
        owner_id: u64,
        name: &str,
        response: &str,
    ) -> Result<CustomCommandModel, ServiceError> {
        let name = Self::normalize(name);
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(ServiceError::InvalidArgument(
                "Command names must be a single word.".to_string(),
            ));
        }
        if response.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "The response cannot be empty.".to_string(),
            ));
        }

        let mut model = CustomCommandModel {
            guild_id,
            name: name.clone(),
            response: response.to_string(),
            owner_id,
            created_at: Utc::now(),
            ..Default::default()
        };

        match self.db.custom_command.insert(&model).await {
            Ok(id) => {
                model.id = id;
                Ok(model)
            }
            Err(err) if err.is_unique_violation() => Err(ServiceError::InvalidArgument(format!(
                "A custom command named `{name}` already exists."
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn owned(
        &self,
        guild_id: u64,
        user_id: u64,
        name: &str,
    ) -> Result<CustomCommandModel, ServiceError> {
        let name = Self::normalize(name);
        let command = self
            .db
            .custom_command
            .select_by_name(guild_id, &name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Custom command `{name}` not found.")))?;
        if command.owner_id != user_id {
            return Err(ServiceError::Forbidden(
                "You can only manage custom commands you created.".to_string(),
            ));
        }
        Ok(command)
    }

    pub async fn edit(
        &self,
        guild_id: u64,
        user_id: u64,
        name: &str,
        response: &str,
    ) -> Result<(), ServiceError> {
        if response.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "The response cannot be empty.".to_string(),
            ));
        }
        let mut command = self.owned(guild_id, user_id, name).await?;
        command.response = response.to_string();
        self.db.custom_command.update(&command).await?;
        Ok(())
    }

    pub async fn delete(&self, guild_id: u64, user_id: u64, name: &str) -> Result<(), ServiceError> {
        let command = self.owned(guild_id, user_id, name).await?;
        self.db.custom_command.delete(&command.id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_strips_prefix() {
        assert_eq!(CustomCommandService::normalize("!Hello"), "hello");
        assert_eq!(CustomCommandService::normalize("  Rules "), "rules");
    }
}
