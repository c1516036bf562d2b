//! Business logic services for the bot's feature modules.

use std::sync::Arc;

use crate::repository::Repository;
use crate::service::automod_service::SpamTracker;
use crate::service::custom_command_service::CustomCommandService;
use crate::service::economy_service::EconomyService;
use crate::service::giveaway_service::GiveawayService;
use crate::service::internal_service::InternalService;
use crate::service::moderation_service::ModerationService;
use crate::service::poll_service::PollService;
use crate::service::reminder_service::ReminderService;
use crate::service::role_service::RoleService;
use crate::service::settings_service::SettingsService;
use crate::service::status_service::StatusService;
use crate::service::user_service::UserService;

pub mod automod_service;
pub mod custom_command_service;
pub mod economy_service;
pub mod error;
pub mod giveaway_service;
pub mod internal_service;
pub mod moderation_service;
pub mod poll_service;
pub mod reminder_service;
pub mod role_service;
pub mod settings_service;
pub mod status_service;
pub mod time;
pub mod user_service;

/// Container for all application services.
pub struct Services {
    pub settings: Arc<SettingsService>,
    pub user: Arc<UserService>,
    pub economy: Arc<EconomyService>,
    pub moderation: Arc<ModerationService>,
    pub custom_command: Arc<CustomCommandService>,
    pub giveaway: Arc<GiveawayService>,
    pub reminder: Arc<ReminderService>,
    pub poll: Arc<PollService>,
    pub role: Arc<RoleService>,
    pub status: Arc<StatusService>,
    pub spam: Arc<SpamTracker>,
    pub internal: Arc<InternalService>,
}

impl Services {
    /// Creates and initializes all services.
    pub async fn new(db: Arc<Repository>) -> anyhow::Result<Self> {
        let settings = Arc::new(SettingsService::new(db.clone()));
        let internal = Arc::new(InternalService::new(db.clone()));

        Ok(Self {
            economy: Arc::new(EconomyService::new(db.clone(), settings.clone())),
            user: Arc::new(UserService::new(db.clone())),
            moderation: Arc::new(ModerationService::new(db.clone())),
            custom_command: Arc::new(CustomCommandService::new(db.clone())),
            giveaway: Arc::new(GiveawayService::new(db.clone())),
            reminder: Arc::new(ReminderService::new(db.clone())),
            poll: Arc::new(PollService::new(db.clone())),
            role: Arc::new(RoleService::new(db.clone())),
            status: Arc::new(StatusService::new(internal.clone())),
            spam: Arc::new(SpamTracker::new()),
            settings,
            internal,
        })
    }
}
