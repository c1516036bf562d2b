//! Message activity: history, experience, level ups and activity achievements.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::Result;
use governor::DefaultKeyedRateLimiter;
use governor::Quota;
use governor::RateLimiter;
use log::debug;
use log::warn;
use poise::serenity_prelude as serenity;
use rand::Rng;
use serenity::ChannelId;
use serenity::CreateEmbed;
use serenity::CreateMessage;
use serenity::GuildId;
use serenity::RoleId;
use serenity::UserId;
use tokio::sync::Mutex;

use crate::event::MessageEvent;
use crate::service::Services;
use crate::service::user_service::LEVEL_MILESTONES;
use crate::service::user_service::XpOutcome;
use crate::service::user_service::message_milestone;
use crate::subscriber::Subscriber;

/// Experience every recorded message is worth.
const MESSAGE_XP: i64 = 1;
const LEVEL_XP_MIN: i64 = 15;
const LEVEL_XP_MAX: i64 = 25;
const LEVEL_UP_COLOR: u32 = 0x2ECC71;

/// Announces a level up, hands out the level role and level achievements.
pub async fn handle_level_up(
    ctx: &serenity::Context,
    services: &Services,
    guild_id: GuildId,
    channel_id: ChannelId,
    user_id: UserId,
    outcome: &XpOutcome,
) -> Result<()> {
    if !outcome.leveled_up {
        return Ok(());
    }
    let embed = CreateEmbed::new()
        .title("Level Up!")
        .description(format!(
            "🎉 Congratulations <@{user_id}>! You've reached level **{}**!",
            outcome.level
        ))
        .color(LEVEL_UP_COLOR);
    channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;

    let settings = services.settings.get_server_settings(guild_id.get()).await?;
    if let Some(role_id) = u32::try_from(outcome.level)
        .ok()
        .and_then(|level| settings.leveling.level_roles.get(&level))
    {
        let role = RoleId::new(*role_id);
        match ctx
            .http
            .add_member_role(guild_id, user_id, role, Some("Level reward"))
            .await
        {
            Ok(()) => {
                channel_id
                    .send_message(
                        &ctx.http,
                        CreateMessage::new()
                            .content(format!("You've been awarded the <@&{role}> role!")),
                    )
                    .await?;
            }
            Err(e) => warn!("Failed to add level role {role} to {user_id}: {e}"),
        }
    }

    for level in LEVEL_MILESTONES
        .iter()
        .filter(|l| **l > outcome.previous_level && **l <= outcome.level)
    {
        services
            .user
            .add_achievement(user_id.get(), &format!("Reached Level {level}"))
            .await?;
    }
    Ok(())
}

pub struct ActivitySubscriber {
    services: Arc<Services>,
    prefix: String,
    message_counts: Mutex<HashMap<u64, u64>>,
    xp_cooldown: DefaultKeyedRateLimiter<u64>,
}

impl ActivitySubscriber {
    pub fn new(services: Arc<Services>, prefix: String) -> Self {
        Self {
            services,
            prefix,
            message_counts: Mutex::new(HashMap::new()),
            xp_cooldown: RateLimiter::keyed(Quota::per_minute(NonZeroU32::MIN)),
        }
    }

    /// Bumps the per-user counter, seeding it from stored history on first sight.
    async fn bump_count(&self, user_id: u64) -> Result<u64> {
        let mut counts = self.message_counts.lock().await;
        let count = match counts.get(&user_id) {
            Some(count) => count + 1,
            None => self.services.user.message_count(user_id).await?.max(1) as u64,
        };
        counts.insert(user_id, count);
        Ok(count)
    }

    async fn record_activity(&self, event: &MessageEvent) -> Result<()> {
        let message = &event.message;
        let user_id = message.author.id.get();

        self.services
            .user
            .ensure_user(user_id, &message.author.name)
            .await?;
        self.services
            .user
            .record_message(user_id, &message.content)
            .await?;
        let outcome = self.services.user.add_xp(user_id, MESSAGE_XP).await?;
        if let Some(guild_id) = message.guild_id {
            handle_level_up(
                &event.ctx,
                &self.services,
                guild_id,
                message.channel_id,
                message.author.id,
                &outcome,
            )
            .await?;
        }

        let count = self.bump_count(user_id).await?;
        if let Some(name) = message_milestone(count)
            && self.services.user.add_achievement(user_id, name).await?
        {
            message
                .channel_id
                .say(
                    &event.ctx.http,
                    format!("🏆 <@{user_id}> ha conseguido el logro **{name}**!"),
                )
                .await?;
        }
        Ok(())
    }

    async fn award_level_xp(&self, event: &MessageEvent) -> Result<()> {
        let message = &event.message;
        let Some(guild_id) = message.guild_id else {
            return Ok(());
        };
        let user_id = message.author.id.get();
        if message.content.starts_with(&self.prefix) {
            return Ok(());
        }
        if self.xp_cooldown.check_key(&user_id).is_err() {
            return Ok(());
        }

        let amount = rand::thread_rng().gen_range(LEVEL_XP_MIN..=LEVEL_XP_MAX);
        debug!("Awarding {amount} XP to {user_id}");
        let outcome = self.services.user.add_xp(user_id, amount).await?;
        handle_level_up(
            &event.ctx,
            &self.services,
            guild_id,
            message.channel_id,
            message.author.id,
            &outcome,
        )
        .await
    }
}

#[async_trait::async_trait]
impl Subscriber<MessageEvent> for ActivitySubscriber {
    async fn callback(&self, event: MessageEvent) -> Result<()> {
        self.record_activity(&event).await?;
        self.award_level_xp(&event).await
    }
}
