//! Database table operations and implementations.

use chrono::DateTime;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteArguments;

use crate::model::AchievementModel;
use crate::model::BotMetaModel;
use crate::model::CustomCommandModel;
use crate::model::EconomyModel;
use crate::model::GiveawayModel;
use crate::model::LeaderboardEntry;
use crate::model::LeaderboardKind;
use crate::model::LeaderboardOpt;
use crate::model::LeaderboardOptBuilder;
use crate::model::MessageModel;
use crate::model::PollModel;
use crate::model::PunishmentModel;
use crate::model::PunishmentType;
use crate::model::ReminderModel;
use crate::model::RoleModel;
use crate::model::ServerSettingsModel;
use crate::model::TodoModel;
use crate::model::UserModel;
use crate::repository::error::DatabaseError;

/// Base table struct providing database pool access.
#[derive(Clone)]
pub struct BaseTable {
    pub pool: SqlitePool,
}

impl BaseTable {
    /// Creates a new base table with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Base trait for table operations.
#[async_trait::async_trait]
pub trait TableBase {
    /// Creates the table if it doesn't exist.
    async fn create_table(&self) -> Result<(), DatabaseError>;
    /// Drops the table.
    async fn drop_table(&self) -> Result<(), DatabaseError>;
    /// Deletes all rows from the table.
    async fn delete_all(&self) -> Result<(), DatabaseError>;
}

/// Trait for tables with CRUD operations.
#[async_trait::async_trait]
pub trait Table<T, ID>: TableBase {
    async fn select_all(&self) -> Result<Vec<T>, DatabaseError>;
    async fn insert(&self, model: &T) -> Result<ID, DatabaseError>;
    async fn select(&self, id: &ID) -> Result<Option<T>, DatabaseError>;
    async fn update(&self, model: &T) -> Result<(), DatabaseError>;
    async fn delete(&self, id: &ID) -> Result<(), DatabaseError>;
    async fn replace(&self, model: &T) -> Result<ID, DatabaseError>;
}

/// Helper trait to handle binding parameters, especially for casting u64 to i64 for SQLite.
pub trait BindParam<'q> {
    fn bind_param<O>(
        self,
        query: sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>>,
    ) -> sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>>;
    fn bind_param_q(
        self,
        query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>;
}

macro_rules! impl_bind_param {
    ($t:ty) => {
        impl<'q> BindParam<'q> for $t {
            fn bind_param<O>(
                self,
                query: sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>>,
            ) -> sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>> {
                query.bind(self)
            }
            fn bind_param_q(
                self,
                query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
            ) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
                query.bind(self)
            }
        }
    };
}

// Implement for reference types that are passed to .bind()
impl_bind_param!(&'q i64);
impl_bind_param!(&'q Option<i64>);
impl_bind_param!(&'q bool);
impl_bind_param!(&'q String);
impl_bind_param!(&'q PunishmentType);
impl_bind_param!(&'q DateTime<Utc>);
impl_bind_param!(&'q Option<DateTime<Utc>>);

// For Json
impl<'q, T: serde::Serialize + for<'a> serde::Deserialize<'a> + Send + Sync + 'static> BindParam<'q>
    for &'q sqlx::types::Json<T>
{
    fn bind_param<O>(
        self,
        query: sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>>,
    ) -> sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>> {
        query.bind(self)
    }
    fn bind_param_q(
        self,
        query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
        query.bind(self)
    }
}

// Special case for u64 (casting to i64)
impl<'q> BindParam<'q> for &'q u64 {
    fn bind_param<O>(
        self,
        query: sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>>,
    ) -> sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>> {
        query.bind(*self as i64)
    }
    fn bind_param_q(
        self,
        query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
        query.bind(*self as i64)
    }
}

macro_rules! impl_table {
    (
        $struct_name:ident,
        $model:ty,
        $table:expr,
        $pk:ident,
        $id_type:ty,
        $db_id_type:ty,
        $create_sql:expr,
        $cols:expr,
        $vals:expr,
        $update_set:expr,
        [ $( $field:ident ),+ ]
    ) => {
        #[derive(Clone)]
        pub struct $struct_name {
            base: BaseTable,
        }

        impl $struct_name {
            pub fn new(pool: SqlitePool) -> Self {
                Self {
                    base: BaseTable::new(pool),
                }
            }
        }

        #[async_trait::async_trait]
        impl TableBase for $struct_name {
            async fn create_table(&self) -> Result<(), DatabaseError> {
                sqlx::query($create_sql)
                    .execute(&self.base.pool)
                    .await?;
                Ok(())
            }

            async fn drop_table(&self) -> Result<(), DatabaseError> {
                sqlx::query(concat!("DROP TABLE IF EXISTS ", $table))
                    .execute(&self.base.pool)
                    .await?;
                Ok(())
            }

            async fn delete_all(&self) -> Result<(), DatabaseError> {
                sqlx::query(concat!("DELETE FROM ", $table))
                    .execute(&self.base.pool)
                    .await?;
                Ok(())
            }
        }

        #[async_trait::async_trait]
        impl Table<$model, $id_type> for $struct_name {
            async fn select_all(&self) -> Result<Vec<$model>, DatabaseError> {
                Ok(sqlx::query_as::<_, $model>(concat!("SELECT * FROM ", $table))
                    .fetch_all(&self.base.pool)
                    .await?)
            }

            async fn select(&self, id: &$id_type) -> Result<Option<$model>, DatabaseError> {
                let query = sqlx::query_as::<_, $model>(concat!("SELECT * FROM ", $table, " WHERE ", stringify!($pk), " = ?"));
                let query = BindParam::bind_param(id, query);
                Ok(
                    query
                        .fetch_optional(&self.base.pool)
                        .await?,
                )
            }

            async fn insert(&self, model: &$model) -> Result<$id_type, DatabaseError> {
                let mut query = sqlx::query_as(concat!(
                        "INSERT INTO ", $table, " (", $cols, ") VALUES (", $vals, ") RETURNING ", stringify!($pk)
                    ));

                $(
                    query = BindParam::bind_param(&model.$field, query);
                )+

                let row: ($db_id_type,) = query.fetch_one(&self.base.pool).await?;
                Ok(row.0 as $id_type)
            }

            async fn update(&self, model: &$model) -> Result<(), DatabaseError> {
                let mut query = sqlx::query(concat!(
                        "UPDATE ", $table, " SET ", $update_set, " WHERE ", stringify!($pk), " = ?"
                    ));

                $(
                    query = BindParam::bind_param_q(&model.$field, query);
                )+
                query = BindParam::bind_param_q(&model.$pk, query);

                query.execute(&self.base.pool).await?;
                Ok(())
            }

            async fn delete(&self, id: &$id_type) -> Result<(), DatabaseError> {
                let query = sqlx::query(concat!("DELETE FROM ", $table, " WHERE ", stringify!($pk), " = ?"));
                let query = BindParam::bind_param_q(id, query);
                query.execute(&self.base.pool).await?;
                Ok(())
            }

            async fn replace(&self, model: &$model) -> Result<$id_type, DatabaseError> {
                let mut query = sqlx::query_as(concat!(
                        "REPLACE INTO ", $table, " (", $cols, ") VALUES (", $vals, ") RETURNING ", stringify!($pk)
                    ));

                $(
                    query = BindParam::bind_param(&model.$field, query);
                )+

                let row: ($db_id_type,) = query.fetch_one(&self.base.pool).await?;
                Ok(row.0 as $id_type)
            }
        }
    };
}

/// `?, ?, ?` for `IN (...)` clauses.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

// ============================================================================
// UserTable
// ============================================================================

impl_table!(
    UserTable,
    UserModel,
    "users",
    discord_id,
    u64,
    i64,
    r#"CREATE TABLE IF NOT EXISTS users (
        discord_id INTEGER PRIMARY KEY,
        username TEXT NOT NULL,
        discriminator TEXT NOT NULL DEFAULT '0000',
        xp INTEGER NOT NULL DEFAULT 0,
        level INTEGER NOT NULL DEFAULT 1,
        last_active TIMESTAMP NOT NULL
    )"#,
    "discord_id, username, discriminator, xp, level, last_active",
    "?, ?, ?, ?, ?, ?",
    "discord_id = ?, username = ?, discriminator = ?, xp = ?, level = ?, last_active = ?",
    [discord_id, username, discriminator, xp, level, last_active]
);

impl UserTable {
    /// Inserts the user unless a row already exists. Returns true when inserted.
    pub async fn insert_if_absent(&self, model: &UserModel) -> Result<bool, DatabaseError> {
        let res = sqlx::query(
            r#"
            INSERT OR IGNORE INTO users (discord_id, username, discriminator, xp, level, last_active)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(model.discord_id as i64)
        .bind(&model.username)
        .bind(&model.discriminator)
        .bind(model.xp)
        .bind(model.level)
        .bind(model.last_active)
        .execute(&self.base.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn update_progress(
        &self,
        discord_id: u64,
        xp: i64,
        level: i64,
        last_active: &DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET xp = ?, level = ?, last_active = ? WHERE discord_id = ?")
            .bind(xp)
            .bind(level)
            .bind(last_active)
            .bind(discord_id as i64)
            .execute(&self.base.pool)
            .await?;
        Ok(())
    }

    /// Ranks users by the metric in `opts`, optionally limited to a set of ids.
    pub async fn select_leaderboard(
        &self,
        opts: &LeaderboardOpt,
    ) -> Result<Vec<LeaderboardEntry>, DatabaseError> {
        let limit = opts.limit.unwrap_or(10) as i64;
        let offset = opts.offset.unwrap_or(0) as i64;

        let mut query = Self::leaderboard_base(opts);
        query.push_str(match opts.kind {
            LeaderboardKind::Level => " ORDER BY value DESC, xp DESC",
            LeaderboardKind::Xp => " ORDER BY value DESC, level DESC",
            LeaderboardKind::Coins | LeaderboardKind::Achievements => " ORDER BY value DESC",
        });
        query.push_str(" LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, LeaderboardEntry>(&query);
        if let Some(ids) = &opts.user_ids {
            for id in ids {
                q = q.bind(*id as i64);
            }
        }
        q = q.bind(limit).bind(offset);

        Ok(q.fetch_all(&self.base.pool).await?)
    }

    /// Counts rows that [`Self::select_leaderboard`] would page through.
    pub async fn count_leaderboard(&self, opts: &LeaderboardOpt) -> Result<u32, DatabaseError> {
        let query = format!("SELECT COUNT(*) FROM ({})", Self::leaderboard_base(opts));

        let mut q = sqlx::query_as::<_, (i64,)>(&query);
        if let Some(ids) = &opts.user_ids {
            for id in ids {
                q = q.bind(*id as i64);
            }
        }

        let row = q.fetch_one(&self.base.pool).await?;
        Ok(row.0 as u32)
    }

    pub async fn top(
        &self,
        kind: LeaderboardKind,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, DatabaseError> {
        let opts = LeaderboardOptBuilder::default()
            .kind(kind)
            .limit(Some(limit))
            .build()
            .map_err(|e| DatabaseError::InternalError {
                message: e.to_string(),
            })?;
        self.select_leaderboard(&opts).await
    }

    /// 1-based rank of a user by level, then xp.
    pub async fn rank_of(&self, discord_id: u64) -> Result<Option<u32>, DatabaseError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT 1 + (
                SELECT COUNT(*) FROM users o
                WHERE o.level > u.level OR (o.level = u.level AND o.xp > u.xp)
            )
            FROM users u WHERE u.discord_id = ?
            "#,
        )
        .bind(discord_id as i64)
        .fetch_optional(&self.base.pool)
        .await?;
        Ok(row.map(|r| r.0 as u32))
    }

    fn leaderboard_base(opts: &LeaderboardOpt) -> String {
        let id_column = match opts.kind {
            LeaderboardKind::Coins => "e.user_id",
            _ => "u.discord_id",
        };
        let filter = match &opts.user_ids {
            Some(ids) if ids.is_empty() => " WHERE 0".to_string(),
            Some(ids) => format!(" WHERE {} IN ({})", id_column, placeholders(ids.len())),
            None => String::new(),
        };

        match opts.kind {
            LeaderboardKind::Level => format!(
                "SELECT u.discord_id AS user_id, u.level AS value, u.level, u.xp FROM users u{filter}"
            ),
            LeaderboardKind::Xp => format!(
                "SELECT u.discord_id AS user_id, u.xp AS value, u.level, u.xp FROM users u{filter}"
            ),
            LeaderboardKind::Coins => format!(
                r#"SELECT e.user_id AS user_id, e.balance AS value,
                    COALESCE(u.level, 1) AS level, COALESCE(u.xp, 0) AS xp
                FROM economy e LEFT JOIN users u ON u.discord_id = e.user_id{filter}"#
            ),
            LeaderboardKind::Achievements => format!(
                r#"SELECT u.discord_id AS user_id, COUNT(a.id) AS value, u.level, u.xp
                FROM users u JOIN achievements a ON a.user_id = u.discord_id{filter}
                GROUP BY u.discord_id"#
            ),
        }
    }
}

// ============================================================================
// MessageTable
// ============================================================================

impl_table!(
    MessageTable,
    MessageModel,
    "messages",
    id,
    i64,
    i64,
    r#"CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        content TEXT NOT NULL,
        timestamp TIMESTAMP NOT NULL
    )"#,
    "user_id, content, timestamp",
    "?, ?, ?",
    "user_id = ?, content = ?, timestamp = ?",
    [user_id, content, timestamp]
);

impl MessageTable {
    pub async fn count_by_user(&self, user_id: u64) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE user_id = ?")
            .bind(user_id as i64)
            .fetch_one(&self.base.pool)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// AchievementTable
// ============================================================================

impl_table!(
    AchievementTable,
    AchievementModel,
    "achievements",
    id,
    i64,
    i64,
    r#"CREATE TABLE IF NOT EXISTS achievements (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        achievement_name TEXT NOT NULL,
        date_achieved TIMESTAMP NOT NULL,
        UNIQUE(user_id, achievement_name)
    )"#,
    "user_id, achievement_name, date_achieved",
    "?, ?, ?",
    "user_id = ?, achievement_name = ?, date_achieved = ?",
    [user_id, achievement_name, date_achieved]
);

impl AchievementTable {
    /// Returns true if the achievement was newly granted.
    pub async fn insert_if_absent(&self, model: &AchievementModel) -> Result<bool, DatabaseError> {
        let res = sqlx::query(
            "INSERT OR IGNORE INTO achievements (user_id, achievement_name, date_achieved) VALUES (?, ?, ?)",
        )
        .bind(model.user_id as i64)
        .bind(&model.achievement_name)
        .bind(model.date_achieved)
        .execute(&self.base.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn select_by_user(&self, user_id: u64) -> Result<Vec<AchievementModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, AchievementModel>(
            "SELECT * FROM achievements WHERE user_id = ? ORDER BY date_achieved",
        )
        .bind(user_id as i64)
        .fetch_all(&self.base.pool)
        .await?)
    }
}

// ============================================================================
// PunishmentTable
// ============================================================================

impl_table!(
    PunishmentTable,
    PunishmentModel,
    "punishments",
    id,
    i64,
    i64,
    r#"CREATE TABLE IF NOT EXISTS punishments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        guild_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        moderator_id INTEGER NOT NULL,
        punishment_type TEXT NOT NULL,
        reason TEXT NOT NULL,
        expires_at TIMESTAMP DEFAULT NULL,
        timestamp TIMESTAMP NOT NULL
    )"#,
    "guild_id, user_id, moderator_id, punishment_type, reason, expires_at, timestamp",
    "?, ?, ?, ?, ?, ?, ?",
    "guild_id = ?, user_id = ?, moderator_id = ?, punishment_type = ?, reason = ?, expires_at = ?, timestamp = ?",
    [guild_id, user_id, moderator_id, punishment_type, reason, expires_at, timestamp]
);

impl PunishmentTable {
    /// Latest punishments of a kind for a member, newest first.
    pub async fn select_by_member(
        &self,
        guild_id: u64,
        user_id: u64,
        punishment_type: PunishmentType,
        limit: u32,
    ) -> Result<Vec<PunishmentModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, PunishmentModel>(
            r#"
            SELECT * FROM punishments
            WHERE guild_id = ? AND user_id = ? AND punishment_type = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .bind(punishment_type)
        .bind(limit as i64)
        .fetch_all(&self.base.pool)
        .await?)
    }

    pub async fn count_by_member(
        &self,
        guild_id: u64,
        user_id: u64,
        punishment_type: PunishmentType,
    ) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM punishments WHERE guild_id = ? AND user_id = ? AND punishment_type = ?",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .bind(punishment_type)
        .fetch_one(&self.base.pool)
        .await?;
        Ok(row.0)
    }

    /// Returns the number of removed rows.
    pub async fn delete_by_member(
        &self,
        guild_id: u64,
        user_id: u64,
        punishment_type: PunishmentType,
    ) -> Result<u64, DatabaseError> {
        let res = sqlx::query(
            "DELETE FROM punishments WHERE guild_id = ? AND user_id = ? AND punishment_type = ?",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .bind(punishment_type)
        .execute(&self.base.pool)
        .await?;
        Ok(res.rows_affected())
    }
}

// ============================================================================
// EconomyTable
// ============================================================================

impl_table!(
    EconomyTable,
    EconomyModel,
    "economy",
    user_id,
    u64,
    i64,
    r#"CREATE TABLE IF NOT EXISTS economy (
        user_id INTEGER PRIMARY KEY,
        balance INTEGER NOT NULL DEFAULT 0,
        last_daily TIMESTAMP DEFAULT NULL,
        daily_streak INTEGER NOT NULL DEFAULT 0,
        last_work TIMESTAMP DEFAULT NULL
    )"#,
    "user_id, balance, last_daily, daily_streak, last_work",
    "?, ?, ?, ?, ?",
    "user_id = ?, balance = ?, last_daily = ?, daily_streak = ?, last_work = ?",
    [user_id, balance, last_daily, daily_streak, last_work]
);

impl EconomyTable {
    /// Adds `delta` to a balance, creating the wallet if needed. Returns the new balance.
    pub async fn add_balance(&self, user_id: u64, delta: i64) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO economy (user_id, balance) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET balance = balance + excluded.balance
            RETURNING balance
            "#,
        )
        .bind(user_id as i64)
        .bind(delta)
        .fetch_one(&self.base.pool)
        .await?;
        Ok(row.0)
    }

    /// Subtracts `amount` only if the balance covers it. Returns the new balance on success.
    pub async fn try_debit(&self, user_id: u64, amount: i64) -> Result<Option<i64>, DatabaseError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE economy SET balance = balance - ?
            WHERE user_id = ? AND balance >= ?
            RETURNING balance
            "#,
        )
        .bind(amount)
        .bind(user_id as i64)
        .bind(amount)
        .fetch_optional(&self.base.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Moves coins between wallets in one transaction. Returns false on insufficient funds.
    pub async fn transfer(&self, from: u64, to: u64, amount: i64) -> Result<bool, DatabaseError> {
        let mut tx = self.base.pool.begin().await?;

        let debited = sqlx::query(
            "UPDATE economy SET balance = balance - ? WHERE user_id = ? AND balance >= ?",
        )
        .bind(amount)
        .bind(from as i64)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO economy (user_id, balance) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET balance = balance + excluded.balance
            "#,
        )
        .bind(to as i64)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Creates an empty wallet unless one exists.
    pub async fn ensure_wallet(&self, user_id: u64) -> Result<(), DatabaseError> {
        sqlx::query("INSERT OR IGNORE INTO economy (user_id) VALUES (?)")
            .bind(user_id as i64)
            .execute(&self.base.pool)
            .await?;
        Ok(())
    }

    /// Credits a daily reward if `last_daily` still equals `previous`.
    ///
    /// Returns the new balance, or `None` when another claim got there first.
    pub async fn claim_daily(
        &self,
        user_id: u64,
        reward: i64,
        streak: i64,
        previous: Option<&DateTime<Utc>>,
        now: &DateTime<Utc>,
    ) -> Result<Option<i64>, DatabaseError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE economy SET balance = balance + ?, last_daily = ?, daily_streak = ?
            WHERE user_id = ? AND last_daily IS ?
            RETURNING balance
            "#,
        )
        .bind(reward)
        .bind(now)
        .bind(streak)
        .bind(user_id as i64)
        .bind(previous)
        .fetch_optional(&self.base.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Credits work earnings if `last_work` still equals `previous`.
    pub async fn claim_work(
        &self,
        user_id: u64,
        earnings: i64,
        previous: Option<&DateTime<Utc>>,
        now: &DateTime<Utc>,
    ) -> Result<Option<i64>, DatabaseError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE economy SET balance = balance + ?, last_work = ?
            WHERE user_id = ? AND last_work IS ?
            RETURNING balance
            "#,
        )
        .bind(earnings)
        .bind(now)
        .bind(user_id as i64)
        .bind(previous)
        .fetch_optional(&self.base.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }
}

// ============================================================================
// CustomCommandTable
// ============================================================================

impl_table!(
    CustomCommandTable,
    CustomCommandModel,
    "custom_commands",
    id,
    i64,
    i64,
    r#"CREATE TABLE IF NOT EXISTS custom_commands (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        guild_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        response TEXT NOT NULL,
        owner_id INTEGER NOT NULL,
        created_at TIMESTAMP NOT NULL,
        UNIQUE(guild_id, name)
    )"#,
    "guild_id, name, response, owner_id, created_at",
    "?, ?, ?, ?, ?",
    "guild_id = ?, name = ?, response = ?, owner_id = ?, created_at = ?",
    [guild_id, name, response, owner_id, created_at]
);

impl CustomCommandTable {
    pub async fn select_by_name(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<CustomCommandModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, CustomCommandModel>(
            "SELECT * FROM custom_commands WHERE guild_id = ? AND name = ?",
        )
        .bind(guild_id as i64)
        .bind(name)
        .fetch_optional(&self.base.pool)
        .await?)
    }

    pub async fn select_by_guild(
        &self,
        guild_id: u64,
    ) -> Result<Vec<CustomCommandModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, CustomCommandModel>(
            "SELECT * FROM custom_commands WHERE guild_id = ? ORDER BY name",
        )
        .bind(guild_id as i64)
        .fetch_all(&self.base.pool)
        .await?)
    }
}

// ============================================================================
// RoleTable
// ============================================================================

impl_table!(
    RoleTable,
    RoleModel,
    "roles",
    role_id,
    u64,
    i64,
    r#"CREATE TABLE IF NOT EXISTS roles (
        role_id INTEGER PRIMARY KEY,
        guild_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        color INTEGER NOT NULL DEFAULT 0,
        position INTEGER NOT NULL DEFAULT 0
    )"#,
    "role_id, guild_id, name, color, position",
    "?, ?, ?, ?, ?",
    "role_id = ?, guild_id = ?, name = ?, color = ?, position = ?",
    [role_id, guild_id, name, color, position]
);

impl RoleTable {
    pub async fn select_by_guild(&self, guild_id: u64) -> Result<Vec<RoleModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, RoleModel>(
            "SELECT * FROM roles WHERE guild_id = ? ORDER BY position DESC",
        )
        .bind(guild_id as i64)
        .fetch_all(&self.base.pool)
        .await?)
    }

    pub async fn delete_by_guild(&self, guild_id: u64) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM roles WHERE guild_id = ?")
            .bind(guild_id as i64)
            .execute(&self.base.pool)
            .await?;
        Ok(())
    }
}

// ============================================================================
// PollTable
// ============================================================================

impl_table!(
    PollTable,
    PollModel,
    "polls",
    message_id,
    u64,
    i64,
    r#"CREATE TABLE IF NOT EXISTS polls (
        message_id INTEGER PRIMARY KEY,
        guild_id INTEGER NOT NULL,
        channel_id INTEGER NOT NULL,
        creator_id INTEGER NOT NULL,
        question TEXT NOT NULL,
        options TEXT NOT NULL,
        votes TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL,
        ended BOOLEAN NOT NULL DEFAULT 0
    )"#,
    "message_id, guild_id, channel_id, creator_id, question, options, votes, created_at, ended",
    "?, ?, ?, ?, ?, ?, ?, ?, ?",
    "message_id = ?, guild_id = ?, channel_id = ?, creator_id = ?, question = ?, options = ?, votes = ?, created_at = ?, ended = ?",
    [message_id, guild_id, channel_id, creator_id, question, options, votes, created_at, ended]
);

impl PollTable {
    /// Records one member's choice in place, leaving other votes untouched.
    ///
    /// Returns the updated poll, or `None` if it is missing or has ended.
    pub async fn set_vote(
        &self,
        message_id: u64,
        user_id: u64,
        option: usize,
    ) -> Result<Option<PollModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, PollModel>(
            r#"
            UPDATE polls SET votes = json_set(votes, '$."' || ? || '"', ?)
            WHERE message_id = ? AND ended = 0
            RETURNING *
            "#,
        )
        .bind(user_id.to_string())
        .bind(option as i64)
        .bind(message_id as i64)
        .fetch_optional(&self.base.pool)
        .await?)
    }

    /// Flags a poll as ended. Returns false if it already was.
    pub async fn mark_ended(&self, message_id: u64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE polls SET ended = 1 WHERE message_id = ? AND ended = 0")
            .bind(message_id as i64)
            .execute(&self.base.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn select_active_by_guild(&self, guild_id: u64) -> Result<Vec<PollModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, PollModel>(
            "SELECT * FROM polls WHERE guild_id = ? AND ended = 0 ORDER BY created_at DESC",
        )
        .bind(guild_id as i64)
        .fetch_all(&self.base.pool)
        .await?)
    }
}

// ============================================================================
// GiveawayTable
// ============================================================================

impl_table!(
    GiveawayTable,
    GiveawayModel,
    "giveaways",
    id,
    i64,
    i64,
    r#"CREATE TABLE IF NOT EXISTS giveaways (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        message_id INTEGER NOT NULL UNIQUE,
        guild_id INTEGER NOT NULL,
        channel_id INTEGER NOT NULL,
        host_id INTEGER NOT NULL,
        prize TEXT NOT NULL,
        winners INTEGER NOT NULL,
        end_time TIMESTAMP NOT NULL,
        ended BOOLEAN NOT NULL DEFAULT 0,
        winner_ids TEXT NOT NULL DEFAULT '[]'
    )"#,
    "message_id, guild_id, channel_id, host_id, prize, winners, end_time, ended, winner_ids",
    "?, ?, ?, ?, ?, ?, ?, ?, ?",
    "message_id = ?, guild_id = ?, channel_id = ?, host_id = ?, prize = ?, winners = ?, end_time = ?, ended = ?, winner_ids = ?",
    [message_id, guild_id, channel_id, host_id, prize, winners, end_time, ended, winner_ids]
);

impl GiveawayTable {
    /// Flags a giveaway as ended. Returns false if it already was.
    pub async fn mark_ended(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE giveaways SET ended = 1 WHERE id = ? AND ended = 0")
            .bind(id)
            .execute(&self.base.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn select_by_message(
        &self,
        message_id: u64,
    ) -> Result<Option<GiveawayModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, GiveawayModel>(
            "SELECT * FROM giveaways WHERE message_id = ?",
        )
        .bind(message_id as i64)
        .fetch_optional(&self.base.pool)
        .await?)
    }

    /// Active giveaways whose end time has passed.
    pub async fn select_due(&self, now: &DateTime<Utc>) -> Result<Vec<GiveawayModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, GiveawayModel>(
            "SELECT * FROM giveaways WHERE ended = 0 AND end_time <= ? ORDER BY end_time",
        )
        .bind(now)
        .fetch_all(&self.base.pool)
        .await?)
    }

    pub async fn select_active_by_guild(
        &self,
        guild_id: u64,
    ) -> Result<Vec<GiveawayModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, GiveawayModel>(
            "SELECT * FROM giveaways WHERE guild_id = ? AND ended = 0 ORDER BY end_time",
        )
        .bind(guild_id as i64)
        .fetch_all(&self.base.pool)
        .await?)
    }
}

// ============================================================================
// ReminderTable
// ============================================================================

impl_table!(
    ReminderTable,
    ReminderModel,
    "reminders",
    id,
    i64,
    i64,
    r#"CREATE TABLE IF NOT EXISTS reminders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        channel_id INTEGER NOT NULL,
        content TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL,
        due_at TIMESTAMP NOT NULL,
        completed BOOLEAN NOT NULL DEFAULT 0,
        public BOOLEAN NOT NULL DEFAULT 0,
        guild_id INTEGER DEFAULT NULL
    )"#,
    "user_id, guild_id, channel_id, content, created_at, due_at, completed, public",
    "?, ?, ?, ?, ?, ?, ?, ?",
    "user_id = ?, guild_id = ?, channel_id = ?, content = ?, created_at = ?, due_at = ?, completed = ?, public = ?",
    [user_id, guild_id, channel_id, content, created_at, due_at, completed, public]
);

impl ReminderTable {
    pub async fn select_due(&self, now: &DateTime<Utc>) -> Result<Vec<ReminderModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, ReminderModel>(
            "SELECT * FROM reminders WHERE completed = 0 AND due_at <= ? ORDER BY due_at",
        )
        .bind(now)
        .fetch_all(&self.base.pool)
        .await?)
    }

    pub async fn select_pending_by_user(
        &self,
        user_id: u64,
    ) -> Result<Vec<ReminderModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, ReminderModel>(
            "SELECT * FROM reminders WHERE user_id = ? AND completed = 0 ORDER BY due_at",
        )
        .bind(user_id as i64)
        .fetch_all(&self.base.pool)
        .await?)
    }

    pub async fn mark_completed(&self, id: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE reminders SET completed = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.base.pool)
            .await?;
        Ok(())
    }

    /// Returns the number of removed reminders.
    pub async fn delete_pending_by_user(&self, user_id: u64) -> Result<u64, DatabaseError> {
        let res = sqlx::query("DELETE FROM reminders WHERE user_id = ? AND completed = 0")
            .bind(user_id as i64)
            .execute(&self.base.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

// ============================================================================
// TodoTable
// ============================================================================

impl_table!(
    TodoTable,
    TodoModel,
    "todos",
    id,
    i64,
    i64,
    r#"CREATE TABLE IF NOT EXISTS todos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        content TEXT NOT NULL,
        completed BOOLEAN NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL,
        position INTEGER NOT NULL DEFAULT 0
    )"#,
    "user_id, position, content, completed, created_at",
    "?, ?, ?, ?, ?",
    "user_id = ?, position = ?, content = ?, completed = ?, created_at = ?",
    [user_id, position, content, completed, created_at]
);

impl TodoTable {
    /// A user's todos in list order.
    pub async fn select_by_user(&self, user_id: u64) -> Result<Vec<TodoModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, TodoModel>(
            "SELECT * FROM todos WHERE user_id = ? ORDER BY position, id",
        )
        .bind(user_id as i64)
        .fetch_all(&self.base.pool)
        .await?)
    }

    /// Appends a todo to the end of the owner's list. Returns its position.
    pub async fn push(
        &self,
        user_id: u64,
        content: &str,
        created_at: &DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO todos (user_id, position, content, completed, created_at)
            VALUES (?, (SELECT COALESCE(MAX(position), 0) + 1 FROM todos WHERE user_id = ?), ?, 0, ?)
            RETURNING position
            "#,
        )
        .bind(user_id as i64)
        .bind(user_id as i64)
        .bind(content)
        .bind(created_at)
        .fetch_one(&self.base.pool)
        .await?;
        Ok(row.0)
    }

    /// Removes one todo and closes the gap it leaves.
    pub async fn remove_at(&self, user_id: u64, position: i64) -> Result<u64, DatabaseError> {
        let mut tx = self.base.pool.begin().await?;
        let res = sqlx::query("DELETE FROM todos WHERE user_id = ? AND position = ?")
            .bind(user_id as i64)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE todos SET position = position - 1 WHERE user_id = ? AND position > ?")
            .bind(user_id as i64)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected())
    }

    /// Returns the number of removed todos. Survivors are renumbered from 1.
    pub async fn delete_by_user(
        &self,
        user_id: u64,
        completed_only: bool,
    ) -> Result<u64, DatabaseError> {
        let sql = if completed_only {
            "DELETE FROM todos WHERE user_id = ? AND completed = 1"
        } else {
            "DELETE FROM todos WHERE user_id = ?"
        };
        let mut tx = self.base.pool.begin().await?;
        let res = sqlx::query(sql)
            .bind(user_id as i64)
            .execute(&mut *tx)
            .await?;

        let ids: Vec<(i64,)> =
            sqlx::query_as("SELECT id FROM todos WHERE user_id = ? ORDER BY position, id")
                .bind(user_id as i64)
                .fetch_all(&mut *tx)
                .await?;
        for (index, (id,)) in ids.into_iter().enumerate() {
            sqlx::query("UPDATE todos SET position = ? WHERE id = ?")
                .bind(index as i64 + 1)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(res.rows_affected())
    }
}

// ============================================================================
// ServerSettingsTable
// ============================================================================

impl_table!(
    ServerSettingsTable,
    ServerSettingsModel,
    "server_settings",
    guild_id,
    u64,
    i64,
    r#"CREATE TABLE IF NOT EXISTS server_settings (
        guild_id INTEGER PRIMARY KEY,
        settings TEXT NOT NULL
    );"#,
    "guild_id, settings",
    "?, ?",
    "guild_id = ?, settings = ?",
    [guild_id, settings]
);

// ============================================================================
// BotMetaTable
// ============================================================================

impl_table!(
    BotMetaTable,
    BotMetaModel,
    "bot_meta",
    key,
    String,
    String,
    r#"CREATE TABLE IF NOT EXISTS bot_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )"#,
    "key, value",
    "?, ?",
    "key = ?, value = ?",
    [key, value]
);
