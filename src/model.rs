use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use derive_builder::Builder;
use serde::Deserialize;
use serde::Serialize;
use sqlx::FromRow;
use sqlx::types::Json;

/// A Discord user known to the bot, with leveling progress.
///
/// Rows are created lazily on first activity and by the periodic member sync.
#[derive(FromRow, Serialize, Deserialize, Clone, Debug)]
pub struct UserModel {
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub discord_id: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
    #[serde(default)]
    pub xp: i64,
    #[serde(default)]
    pub level: i64,
    #[serde(default)]
    pub last_active: DateTime<Utc>,
}

impl Default for UserModel {
    fn default() -> Self {
        Self {
            discord_id: 0,
            username: String::new(),
            discriminator: "0000".to_string(),
            xp: 0,
            level: 1,
            last_active: Utc::now(),
        }
    }
}

#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct MessageModel {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub user_id: u64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
}

#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct AchievementModel {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub user_id: u64,
    #[serde(default)]
    pub achievement_name: String,
    #[serde(default)]
    pub date_achieved: DateTime<Utc>,
}

/// Kind of moderation record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, Default, PartialEq, Eq)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PunishmentType {
    #[default]
    Warn,
    Mute,
    Kick,
    Ban,
}

impl std::fmt::Display for PunishmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PunishmentType::Warn => "warn",
            PunishmentType::Mute => "mute",
            PunishmentType::Kick => "kick",
            PunishmentType::Ban => "ban",
        };
        f.write_str(name)
    }
}

/// A moderation action taken against a user in a guild.
///
/// `expires_at` is set for time-bound punishments such as timeouts.
#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct PunishmentModel {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub guild_id: u64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub user_id: u64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub moderator_id: u64,
    #[serde(default)]
    pub punishment_type: PunishmentType,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
}

/// Wallet and cooldown bookkeeping for the economy.
#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct EconomyModel {
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub user_id: u64,
    #[serde(default)]
    pub balance: i64,
    #[serde(default)]
    pub last_daily: Option<DateTime<Utc>>,
    #[serde(default)]
    pub daily_streak: i64,
    #[serde(default)]
    pub last_work: Option<DateTime<Utc>>,
}

#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct CustomCommandModel {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub guild_id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub owner_id: u64,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

/// Snapshot of a guild role, refreshed by the role sync.
#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct RoleModel {
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub role_id: u64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub guild_id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: i64,
    #[serde(default)]
    pub position: i64,
}

/// A button poll. Keyed by the message that carries the buttons.
#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct PollModel {
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub message_id: u64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub guild_id: u64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub channel_id: u64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub creator_id: u64,
    #[serde(default)]
    pub question: String,
    pub options: Json<Vec<String>>,
    /// Voter id to chosen option index.
    pub votes: Json<BTreeMap<u64, usize>>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub ended: bool,
}

#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct GiveawayModel {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub message_id: u64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub guild_id: u64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub channel_id: u64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub host_id: u64,
    #[serde(default)]
    pub prize: String,
    #[serde(default)]
    pub winners: i64,
    #[serde(default)]
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub ended: bool,
    pub winner_ids: Json<Vec<u64>>,
}

#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct ReminderModel {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub user_id: u64,
    /// `None` for reminders set in DMs.
    #[serde(default)]
    pub guild_id: Option<i64>,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub channel_id: u64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
    /// Public reminders are posted in the channel instead of DMed.
    #[serde(default)]
    pub public: bool,
}

#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct TodoModel {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub user_id: u64,
    /// 1-based place in the owner's list, kept contiguous.
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

#[derive(FromRow, Serialize, Deserialize, Default, Clone, Debug)]
pub struct ServerSettingsModel {
    #[serde(default)]
    #[sqlx(try_from = "i64")]
    pub guild_id: u64,
    pub settings: Json<ServerSettings>,
}

/// Per-guild configuration document, stored as JSON.
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct ServerSettings {
    #[serde(default)]
    pub leveling: LevelingSettings,
    #[serde(default)]
    pub shop: ShopSettings,
    #[serde(default)]
    pub greetings: GreetingSettings,
    #[serde(default)]
    pub automod: AutomodSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub tickets: TicketSettings,
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct LevelingSettings {
    /// Level to role id.
    #[serde(default)]
    pub level_roles: BTreeMap<u32, u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ShopRole {
    pub role_id: u64,
    pub name: String,
    pub price: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShopItemKind {
    Status,
    Command,
    #[default]
    Custom,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ShopItem {
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: ShopItemKind,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ShopSettings {
    #[serde(default)]
    pub roles: BTreeMap<String, ShopRole>,
    #[serde(default = "ShopSettings::default_items")]
    pub items: BTreeMap<String, ShopItem>,
}

impl ShopSettings {
    pub fn default_items() -> BTreeMap<String, ShopItem> {
        BTreeMap::from([
            (
                "1".to_string(),
                ShopItem {
                    name: "VIP Status".to_string(),
                    price: 5000,
                    description: "Get a special VIP status in the server".to_string(),
                    kind: ShopItemKind::Status,
                },
            ),
            (
                "2".to_string(),
                ShopItem {
                    name: "Custom Command".to_string(),
                    price: 10000,
                    description: "Create your own custom command".to_string(),
                    kind: ShopItemKind::Command,
                },
            ),
        ])
    }
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            roles: BTreeMap::new(),
            items: Self::default_items(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GreetingSettings {
    #[serde(default)]
    pub welcome_enabled: bool,
    #[serde(default)]
    pub welcome_channel: Option<u64>,
    #[serde(default = "GreetingSettings::default_welcome_messages")]
    pub welcome_messages: Vec<String>,
    #[serde(default)]
    pub farewell_enabled: bool,
    #[serde(default)]
    pub farewell_channel: Option<u64>,
    #[serde(default = "GreetingSettings::default_farewell_messages")]
    pub farewell_messages: Vec<String>,
    #[serde(default)]
    pub welcome_dm_enabled: bool,
    #[serde(default = "GreetingSettings::default_dm_message")]
    pub welcome_dm_message: String,
}

impl GreetingSettings {
    pub fn default_welcome_messages() -> Vec<String> {
        vec![
            "Welcome {user} to {server}! Enjoy your stay!".to_string(),
            "Hey {user}, welcome to {server}!".to_string(),
            "{user} just joined {server}! Everyone say hello!".to_string(),
        ]
    }

    pub fn default_farewell_messages() -> Vec<String> {
        vec![
            "Goodbye {user}! We'll miss you!".to_string(),
            "{user} has left {server}. Farewell!".to_string(),
            "Sad to see you go, {user}!".to_string(),
        ]
    }

    pub fn default_dm_message() -> String {
        "Welcome to {server}! We hope you enjoy your stay.".to_string()
    }
}

impl Default for GreetingSettings {
    fn default() -> Self {
        Self {
            welcome_enabled: false,
            welcome_channel: None,
            welcome_messages: Self::default_welcome_messages(),
            farewell_enabled: false,
            farewell_channel: None,
            farewell_messages: Self::default_farewell_messages(),
            welcome_dm_enabled: false,
            welcome_dm_message: Self::default_dm_message(),
        }
    }
}

/// Rule violations detected by the automod.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    BannedWords,
    Caps,
    Links,
    Invites,
    Spam,
}

impl Violation {
    pub const ALL: [Violation; 5] = [
        Violation::BannedWords,
        Violation::Caps,
        Violation::Links,
        Violation::Invites,
        Violation::Spam,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Violation::BannedWords => "banned_words",
            Violation::Caps => "caps",
            Violation::Links => "links",
            Violation::Invites => "invites",
            Violation::Spam => "spam",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.key() == key.to_lowercase() || (key == "words" && *v == Self::BannedWords))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AutomodAction {
    #[default]
    Delete,
    Warn,
    Mute,
    Kick,
    Ban,
}

impl std::str::FromStr for AutomodAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delete" => Ok(Self::Delete),
            "warn" => Ok(Self::Warn),
            "mute" => Ok(Self::Mute),
            "kick" => Ok(Self::Kick),
            "ban" => Ok(Self::Ban),
            other => Err(format!(
                "Unknown action `{other}`. Use one of: delete, warn, mute, kick, ban"
            )),
        }
    }
}

impl std::fmt::Display for AutomodAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AutomodAction::Delete => "delete",
            AutomodAction::Warn => "warn",
            AutomodAction::Mute => "mute",
            AutomodAction::Kick => "kick",
            AutomodAction::Ban => "ban",
        };
        f.write_str(name)
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct BannedWordsFilter {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub words: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CapsFilter {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "CapsFilter::default_threshold")]
    pub threshold: u8,
}

impl CapsFilter {
    fn default_threshold() -> u8 {
        70
    }
}

impl Default for CapsFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: Self::default_threshold(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SpamFilter {
    #[serde(default)]
    pub enabled: bool,
    /// Messages allowed within the window.
    #[serde(default = "SpamFilter::default_limit")]
    pub limit: u32,
    #[serde(default = "SpamFilter::default_window")]
    pub window_secs: u64,
}

impl SpamFilter {
    fn default_limit() -> u32 {
        5
    }

    fn default_window() -> u64 {
        5
    }
}

impl Default for SpamFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            limit: Self::default_limit(),
            window_secs: Self::default_window(),
        }
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct ToggleFilter {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct AutomodSettings {
    #[serde(default)]
    pub banned_words: BannedWordsFilter,
    #[serde(default)]
    pub caps: CapsFilter,
    #[serde(default)]
    pub spam: SpamFilter,
    #[serde(default)]
    pub links: ToggleFilter,
    #[serde(default)]
    pub invites: ToggleFilter,
    #[serde(default)]
    pub exempt_roles: Vec<u64>,
    #[serde(default)]
    pub exempt_channels: Vec<u64>,
    #[serde(default)]
    pub punishments: BTreeMap<Violation, AutomodAction>,
}

impl AutomodSettings {
    pub fn action_for(&self, violation: Violation) -> AutomodAction {
        self.punishments
            .get(&violation)
            .copied()
            .unwrap_or_default()
    }
}

/// Categories of audit log output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Moderation,
    Messages,
    Members,
    Server,
    Voice,
    All,
}

impl LogType {
    pub const ALL: [LogType; 6] = [
        LogType::Moderation,
        LogType::Messages,
        LogType::Members,
        LogType::Server,
        LogType::Voice,
        LogType::All,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LogType::Moderation => "moderation",
            LogType::Messages => "messages",
            LogType::Members => "members",
            LogType::Server => "server",
            LogType::Voice => "voice",
            LogType::All => "all",
        }
    }
}

impl std::str::FromStr for LogType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.name() == lower)
            .ok_or_else(|| {
                format!(
                    "Unknown log type `{s}`. Use one of: moderation, messages, members, server, voice, all"
                )
            })
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct LoggingSettings {
    #[serde(default)]
    pub channels: BTreeMap<LogType, u64>,
}

impl LoggingSettings {
    /// Channel for a log type, falling back to the `all` channel.
    pub fn channel_for(&self, log_type: LogType) -> Option<u64> {
        self.channels
            .get(&log_type)
            .or_else(|| self.channels.get(&LogType::All))
            .copied()
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct TicketSettings {
    #[serde(default)]
    pub category_id: Option<u64>,
    #[serde(default)]
    pub support_role_id: Option<u64>,
}

/// Key-value store for bot metadata (version, status rotation, etc.)
#[derive(FromRow, Serialize, Deserialize, Default, Clone, Debug)]
pub struct BotMetaModel {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

pub enum BotMetaKey {
    BotVersion,
    StatusRotation,
}

impl From<&BotMetaKey> for String {
    fn from(value: &BotMetaKey) -> Self {
        match value {
            BotMetaKey::BotVersion => "bot_version".to_string(),
            BotMetaKey::StatusRotation => "status_rotation".to_string(),
        }
    }
}

impl From<BotMetaKey> for String {
    fn from(value: BotMetaKey) -> Self {
        String::from(&value)
    }
}

/// Ordering for leaderboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeaderboardKind {
    #[default]
    Level,
    Xp,
    Coins,
    Achievements,
}

/// One leaderboard row; `value` is the ranking metric.
#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct LeaderboardEntry {
    #[sqlx(try_from = "i64")]
    pub user_id: u64,
    pub value: i64,
    pub level: i64,
    pub xp: i64,
}

#[derive(Builder, Clone, Debug)]
#[builder(pattern = "immutable")]
pub struct LeaderboardOpt {
    #[builder(default)]
    pub kind: LeaderboardKind,
    /// Restricts results to these users when set (guild members).
    #[builder(default)]
    pub user_ids: Option<Vec<u64>>,
    #[builder(default)]
    pub offset: Option<u32>,
    #[builder(default)]
    pub limit: Option<u32>,
}
