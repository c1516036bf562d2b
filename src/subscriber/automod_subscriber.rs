//! Applies the automatic moderator's filters to every guild message.

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use log::debug;
use log::info;
use log::warn;
use poise::serenity_prelude as serenity;
use serenity::ChannelId;
use serenity::EditMember;
use serenity::GuildId;
use serenity::Http;
use serenity::Message;
use serenity::Timestamp;

use crate::event::MessageEvent;
use crate::model::AutomodAction;
use crate::model::PunishmentType;
use crate::model::Violation;
use crate::service::Services;
use crate::service::automod_service::check_content;
use crate::service::automod_service::is_exempt;
use crate::service::moderation_service::DEFAULT_MUTE_SECS;
use crate::subscriber::Subscriber;

const NOTICE_LIFETIME: Duration = Duration::from_secs(5);

/// Sends a channel notice that removes itself after a few seconds.
async fn short_notice(http: Arc<Http>, channel_id: ChannelId, text: String) -> Result<()> {
    let notice = channel_id.say(&http, text).await?;
    tokio::spawn(async move {
        tokio::time::sleep(NOTICE_LIFETIME).await;
        if let Err(e) = notice.delete(&http).await {
            debug!("Failed to delete automod notice: {e}");
        }
    });
    Ok(())
}

pub struct AutomodSubscriber {
    services: Arc<Services>,
    bot_id: u64,
}

impl AutomodSubscriber {
    pub fn new(services: Arc<Services>, bot_id: u64) -> Self {
        Self { services, bot_id }
    }

    async fn punish(
        &self,
        http: Arc<Http>,
        guild_id: GuildId,
        message: &Message,
        violation: Violation,
        action: AutomodAction,
    ) -> Result<()> {
        let user = message.author.id;
        let reason = format!("AutoMod: {}", violation.key());

        if let Err(e) = message.delete(&http).await {
            warn!("AutoMod could not delete message {}: {e}", message.id);
        }

        match action {
            AutomodAction::Delete => {}
            AutomodAction::Warn => {
                self.services
                    .moderation
                    .record(
                        guild_id.get(),
                        user.get(),
                        self.bot_id,
                        PunishmentType::Warn,
                        &reason,
                        None,
                    )
                    .await?;
                short_notice(
                    http,
                    message.channel_id,
                    format!(
                        "<@{user}> has been warned for violating the {} filter.",
                        violation.key()
                    ),
                )
                .await?;
            }
            AutomodAction::Mute => {
                let until = Utc::now() + chrono::Duration::seconds(DEFAULT_MUTE_SECS);
                let timestamp = Timestamp::from_unix_timestamp(until.timestamp())?;
                guild_id
                    .edit_member(
                        &http,
                        user,
                        EditMember::new()
                            .disable_communication_until_datetime(timestamp)
                            .audit_log_reason(&reason),
                    )
                    .await?;
                self.services
                    .moderation
                    .record(
                        guild_id.get(),
                        user.get(),
                        self.bot_id,
                        PunishmentType::Mute,
                        &reason,
                        Some(until),
                    )
                    .await?;
                short_notice(
                    http,
                    message.channel_id,
                    format!(
                        "<@{user}> has been muted for violating the {} filter.",
                        violation.key()
                    ),
                )
                .await?;
            }
            AutomodAction::Kick => {
                guild_id.kick_with_reason(&http, user, &reason).await?;
                self.services
                    .moderation
                    .record(
                        guild_id.get(),
                        user.get(),
                        self.bot_id,
                        PunishmentType::Kick,
                        &reason,
                        None,
                    )
                    .await?;
                short_notice(
                    http,
                    message.channel_id,
                    format!(
                        "<@{user}> has been kicked for violating the {} filter.",
                        violation.key()
                    ),
                )
                .await?;
            }
            AutomodAction::Ban => {
                guild_id.ban_with_reason(&http, user, 0, &reason).await?;
                self.services
                    .moderation
                    .record(
                        guild_id.get(),
                        user.get(),
                        self.bot_id,
                        PunishmentType::Ban,
                        &reason,
                        None,
                    )
                    .await?;
                short_notice(
                    http,
                    message.channel_id,
                    format!(
                        "<@{user}> has been banned for violating the {} filter.",
                        violation.key()
                    ),
                )
                .await?;
            }
        }
        info!(
            "AutoMod applied {action} to {user} in guild {guild_id} for {}",
            violation.key()
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl Subscriber<MessageEvent> for AutomodSubscriber {
    async fn callback(&self, event: MessageEvent) -> Result<()> {
        let message = &event.message;
        let Some(guild_id) = message.guild_id else {
            return Ok(());
        };
        if message.author.bot {
            return Ok(());
        }

        let settings = self
            .services
            .settings
            .get_server_settings(guild_id.get())
            .await?
            .automod;
        let roles: Vec<u64> = message
            .member
            .as_ref()
            .map(|m| m.roles.iter().map(|r| r.get()).collect())
            .unwrap_or_default();
        if is_exempt(&settings, message.channel_id.get(), &roles) {
            return Ok(());
        }

        let mut violation = check_content(&settings, &message.content);
        if violation.is_none()
            && settings.spam.enabled
            && self.services.spam.record(
                message.author.id.get(),
                message.channel_id.get(),
                settings.spam.limit,
                Duration::from_secs(settings.spam.window_secs),
                Instant::now(),
            )
        {
            violation = Some(Violation::Spam);
        }

        let Some(violation) = violation else {
            return Ok(());
        };
        let action = settings.action_for(violation);
        self.punish(event.ctx.http.clone(), guild_id, message, violation, action)
            .await
    }
}
