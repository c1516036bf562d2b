//! Per-guild configuration, stored as one JSON document per guild.

use std::sync::Arc;

use sqlx::types::Json;

use crate::model::ServerSettings;
use crate::model::ServerSettingsModel;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;

pub struct SettingsService {
    db: Arc<Repository>,
}

impl SettingsService {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// Settings of a guild. Guilds that never changed anything get the defaults.
    ///
    /// # Performance
    /// * DB calls: 1
    pub async fn get_server_settings(&self, guild_id: u64) -> Result<ServerSettings, ServiceError> {
        Ok(self
            .db
            .server_settings
            .select(&guild_id)
            .await?
            .map(|model| model.settings.0)
            .unwrap_or_default())
    }

    async fn save(&self, guild_id: u64, settings: ServerSettings) -> Result<(), ServiceError> {
        self.db
            .server_settings
            .replace(&ServerSettingsModel {
                guild_id,
                settings: Json(settings),
            })
            .await?;
        Ok(())
    }

    /// Applies `f` to the guild's settings and stores the result.
    ///
    /// # Performance
    /// * DB calls: 2
    pub async fn modify<F, R>(&self, guild_id: u64, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut ServerSettings) -> R,
    {
        let mut settings = self.get_server_settings(guild_id).await?;
        let result = f(&mut settings);
        self.save(guild_id, settings).await?;
        Ok(result)
    }

    /// Like [`modify`](Self::modify), but nothing is stored when `f` fails.
    pub async fn try_modify<F, R>(&self, guild_id: u64, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut ServerSettings) -> Result<R, ServiceError>,
    {
        let mut settings = self.get_server_settings(guild_id).await?;
        let result = f(&mut settings)?;
        self.save(guild_id, settings).await?;
        Ok(result)
    }
}
