//! Database module with SQLite storage and SQLx.

use std::str::FromStr;

use log::debug;
use log::info;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

use crate::repository::table::AchievementTable;
use crate::repository::table::BotMetaTable;
use crate::repository::table::CustomCommandTable;
use crate::repository::table::EconomyTable;
use crate::repository::table::GiveawayTable;
use crate::repository::table::MessageTable;
use crate::repository::table::PollTable;
use crate::repository::table::PunishmentTable;
use crate::repository::table::ReminderTable;
use crate::repository::table::RoleTable;
use crate::repository::table::ServerSettingsTable;
use crate::repository::table::TableBase;
use crate::repository::table::TodoTable;
use crate::repository::table::UserTable;

pub mod error;
pub mod table;

/// Main database struct containing all table handlers.
pub struct Repository {
    pool: SqlitePool,
    pub user: UserTable,
    pub message: MessageTable,
    pub achievement: AchievementTable,
    pub punishment: PunishmentTable,
    pub economy: EconomyTable,
    pub custom_command: CustomCommandTable,
    pub role: RoleTable,
    pub poll: PollTable,
    pub giveaway: GiveawayTable,
    pub reminder: ReminderTable,
    pub todo: TodoTable,
    pub server_settings: ServerSettingsTable,
    pub bot_meta: BotMetaTable,
}

impl Repository {
    /// Creates a new database connection and initializes table handlers.
    pub async fn new(db_url: &str, db_path: &str) -> anyhow::Result<Self> {
        let path = std::path::Path::new(db_path);
        if !path.exists() {
            debug!("Database path {db_path} does not exist. Creating...");
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, "")?;
            info!("Created {db_path}");
        }

        debug!("Connecting to db...");
        let opts = SqliteConnectOptions::from_str(db_url)?.foreign_keys(true);
        let pool = SqlitePool::connect_with(opts).await?;
        info!("Connected to db.");

        Ok(Self {
            user: UserTable::new(pool.clone()),
            message: MessageTable::new(pool.clone()),
            achievement: AchievementTable::new(pool.clone()),
            punishment: PunishmentTable::new(pool.clone()),
            economy: EconomyTable::new(pool.clone()),
            custom_command: CustomCommandTable::new(pool.clone()),
            role: RoleTable::new(pool.clone()),
            poll: PollTable::new(pool.clone()),
            giveaway: GiveawayTable::new(pool.clone()),
            reminder: ReminderTable::new(pool.clone()),
            todo: TodoTable::new(pool.clone()),
            server_settings: ServerSettingsTable::new(pool.clone()),
            bot_meta: BotMetaTable::new(pool.clone()),
            pool,
        })
    }

    /// Runs database migrations from the migrations directory.
    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    fn tables(&self) -> [&(dyn TableBase + Send + Sync); 13] {
        // Children before parents so foreign keys never block a drop.
        [
            &self.message,
            &self.achievement,
            &self.user,
            &self.punishment,
            &self.economy,
            &self.custom_command,
            &self.role,
            &self.poll,
            &self.giveaway,
            &self.reminder,
            &self.todo,
            &self.server_settings,
            &self.bot_meta,
        ]
    }

    /// Drops all tables. Use with caution!
    pub async fn drop_all_tables(&self) -> anyhow::Result<()> {
        for table in self.tables() {
            table.drop_table().await?;
        }
        sqlx::query("DROP TABLE IF EXISTS _sqlx_migrations")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deletes all data from all tables. Use with caution!
    pub async fn delete_all_tables(&self) -> anyhow::Result<()> {
        for table in self.tables() {
            table.delete_all().await?;
        }
        Ok(())
    }
}
