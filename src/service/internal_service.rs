//! Internal service for bot metadata and maintenance operations.

use std::sync::Arc;

use serde::Serialize;

use crate::model::BotMetaModel;
use crate::model::CustomCommandModel;
use crate::model::EconomyModel;
use crate::model::GiveawayModel;
use crate::model::PollModel;
use crate::model::PunishmentModel;
use crate::model::ReminderModel;
use crate::model::UserModel;
use crate::repository::Repository;
use crate::repository::error::DatabaseError;
use crate::repository::table::Table;

/// Internal service for metadata and maintenance operations.
pub struct InternalService {
    db: Arc<Repository>,
}

impl InternalService {
    /// Creates a new internal service.
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// Get a metadata value by key.
    pub async fn get_meta(&self, key: impl Into<String>) -> Result<Option<String>, DatabaseError> {
        let result = self.db.bot_meta.select(&key.into()).await?;
        Ok(result.map(|m| m.value))
    }

    /// Set a metadata value by key (upsert).
    pub async fn set_meta(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DatabaseError> {
        let model = BotMetaModel {
            key: key.into(),
            value: value.into(),
        };
        self.db.bot_meta.replace(&model).await?;
        Ok(())
    }

    /// Dumps the main tables for inspection.
    pub async fn dump_database(&self) -> anyhow::Result<DatabaseDump> {
        Ok(DatabaseDump {
            users: self.db.user.select_all().await?,
            economy: self.db.economy.select_all().await?,
            punishments: self.db.punishment.select_all().await?,
            custom_commands: self.db.custom_command.select_all().await?,
            polls: self.db.poll.select_all().await?,
            giveaways: self.db.giveaway.select_all().await?,
            reminders: self.db.reminder.select_all().await?,
        })
    }
}

/// Container for a full database dump.
#[derive(Serialize)]
pub struct DatabaseDump {
    pub users: Vec<UserModel>,
    pub economy: Vec<EconomyModel>,
    pub punishments: Vec<PunishmentModel>,
    pub custom_commands: Vec<CustomCommandModel>,
    pub polls: Vec<PollModel>,
    pub giveaways: Vec<GiveawayModel>,
    pub reminders: Vec<ReminderModel>,
}
