//! Posts audit embeds to the configured logging channels.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Result;
use chrono::Utc;
use log::warn;
use poise::serenity_prelude as serenity;
use serenity::ChannelId;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use serenity::CreateMessage;
use serenity::GuildId;
use serenity::Http;
use serenity::MessageId;
use serenity::RoleId;
use serenity::UserId;

use crate::event::MemberJoinEvent;
use crate::event::MemberLeaveEvent;
use crate::event::MemberUpdateEvent;
use crate::event::MessageDeleteEvent;
use crate::event::MessageEditEvent;
use crate::event::MessageEvent;
use crate::event::VoiceStateEvent;
use crate::model::LogType;
use crate::service::Services;
use crate::subscriber::Subscriber;

/// Discord's embed field limit.
const FIELD_LIMIT: usize = 1024;
const RECENT_MESSAGES: usize = 5000;

const RED: u32 = 0xE74C3C;
const GREEN: u32 = 0x2ECC71;
const GOLD: u32 = 0xF1C40F;
const BLUE: u32 = 0x3498DB;

/// Cuts text to fit a field, ending with `...` when shortened.
pub fn truncate_field(text: &str) -> String {
    if text.chars().count() > FIELD_LIMIT {
        let head: String = text.chars().take(FIELD_LIMIT - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn role_mentions(roles: &[RoleId]) -> String {
    roles
        .iter()
        .map(|r| format!("<@&{r}>"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Sends `embed` to the guild's channel for `log_type`, if one is set.
pub async fn send_log(
    http: &Http,
    services: &Services,
    guild_id: GuildId,
    log_type: LogType,
    embed: CreateEmbed,
) -> Result<()> {
    let settings = services.settings.get_server_settings(guild_id.get()).await?;
    let Some(channel) = settings.logging.channel_for(log_type) else {
        return Ok(());
    };
    if let Err(e) = ChannelId::new(channel)
        .send_message(http, CreateMessage::new().embed(embed))
        .await
    {
        warn!("Failed to send {} log in guild {guild_id}: {e}", log_type.name());
    }
    Ok(())
}

/// Embed for an action taken through a moderation command.
pub fn moderation_embed(action: &str, target: UserId, moderator: UserId, reason: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title(format!("Member {action}"))
        .color(RED)
        .field("User", format!("<@{target}>"), true)
        .field("Moderator", format!("<@{moderator}>"), true)
        .field("Reason", truncate_field(reason), false)
        .footer(CreateEmbedFooter::new(format!("User ID: {target}")))
        .timestamp(Utc::now())
}

#[derive(Clone)]
struct CachedMessage {
    author_id: UserId,
    channel_id: ChannelId,
    content: String,
    attachments: Vec<(String, String)>,
}

/// Bounded store of recent messages so deletions can show their content.
#[derive(Default)]
struct RecentMessages {
    by_id: HashMap<MessageId, CachedMessage>,
    order: VecDeque<MessageId>,
}

impl RecentMessages {
    fn insert(&mut self, id: MessageId, message: CachedMessage) {
        if self.by_id.insert(id, message).is_none() {
            self.order.push_back(id);
        }
        while self.order.len() > RECENT_MESSAGES {
            if let Some(old) = self.order.pop_front() {
                self.by_id.remove(&old);
            }
        }
    }

    fn remove(&mut self, id: MessageId) -> Option<CachedMessage> {
        // The id stays in `order` and is skipped when evicted
        self.by_id.remove(&id)
    }

    fn get(&self, id: MessageId) -> Option<&CachedMessage> {
        self.by_id.get(&id)
    }
}

pub struct AuditLogSubscriber {
    services: Arc<Services>,
    recent: Mutex<RecentMessages>,
}

impl AuditLogSubscriber {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            recent: Mutex::new(RecentMessages::default()),
        }
    }

    fn recent(&self) -> std::sync::MutexGuard<'_, RecentMessages> {
        match self.recent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait::async_trait]
impl Subscriber<MessageEvent> for AuditLogSubscriber {
    async fn callback(&self, event: MessageEvent) -> Result<()> {
        let message = event.message;
        let cached = CachedMessage {
            author_id: message.author.id,
            channel_id: message.channel_id,
            content: message.content,
            attachments: message
                .attachments
                .into_iter()
                .map(|a| (a.filename, a.url))
                .collect(),
        };
        self.recent().insert(message.id, cached);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Subscriber<MessageDeleteEvent> for AuditLogSubscriber {
    async fn callback(&self, event: MessageDeleteEvent) -> Result<()> {
        let cached = self.recent().remove(event.message_id);
        let mut embed = CreateEmbed::new()
            .title("Message Deleted")
            .color(RED)
            .timestamp(Utc::now());

        match cached {
            Some(message) => {
                embed = embed.description(format!(
                    "Message by <@{}> deleted in <#{}>",
                    message.author_id, message.channel_id
                ));
                if !message.content.is_empty() {
                    embed = embed.field("Content", truncate_field(&message.content), false);
                }
                if !message.attachments.is_empty() {
                    let list = message
                        .attachments
                        .iter()
                        .map(|(name, url)| format!("[{name}]({url})"))
                        .collect::<Vec<_>>()
                        .join("\n");
                    embed = embed.field("Attachments", truncate_field(&list), false);
                }
                embed = embed.footer(CreateEmbedFooter::new(format!(
                    "User ID: {} | Message ID: {}",
                    message.author_id, event.message_id
                )));
            }
            None => {
                embed = embed
                    .description(format!("A message was deleted in <#{}>", event.channel_id))
                    .footer(CreateEmbedFooter::new(format!(
                        "Message ID: {}",
                        event.message_id
                    )));
            }
        }
        send_log(
            &event.ctx.http,
            &self.services,
            event.guild_id,
            LogType::Messages,
            embed,
        )
        .await
    }
}

#[async_trait::async_trait]
impl Subscriber<MessageEditEvent> for AuditLogSubscriber {
    async fn callback(&self, event: MessageEditEvent) -> Result<()> {
        let new = &event.new;
        if new.author.bot {
            return Ok(());
        }
        let before = event
            .old
            .as_ref()
            .map(|m| m.content.clone())
            .or_else(|| self.recent().get(new.id).map(|m| m.content.clone()));
        if before.as_deref() == Some(new.content.as_str()) {
            return Ok(());
        }
        if let Some(cached) = self.recent().by_id.get_mut(&new.id) {
            cached.content = new.content.clone();
        }

        let mut embed = CreateEmbed::new()
            .title("Message Edited")
            .description(format!(
                "Message by <@{}> edited in <#{}>",
                new.author.id, new.channel_id
            ))
            .color(GOLD)
            .timestamp(Utc::now());
        if let Some(before) = before.filter(|b| !b.is_empty()) {
            embed = embed.field("Before", truncate_field(&before), false);
        }
        if !new.content.is_empty() {
            embed = embed.field("After", truncate_field(&new.content), false);
        }
        embed = embed
            .field(
                "Jump to Message",
                format!("[Click Here]({})", new.link()),
                false,
            )
            .footer(CreateEmbedFooter::new(format!(
                "User ID: {} | Message ID: {}",
                new.author.id, new.id
            )));

        send_log(
            &event.ctx.http,
            &self.services,
            event.guild_id,
            LogType::Messages,
            embed,
        )
        .await
    }
}

#[async_trait::async_trait]
impl Subscriber<MemberJoinEvent> for AuditLogSubscriber {
    async fn callback(&self, event: MemberJoinEvent) -> Result<()> {
        let user = &event.member.user;
        let embed = CreateEmbed::new()
            .title("Member Joined")
            .description(format!("<@{}> joined the server", user.id))
            .color(GREEN)
            .thumbnail(user.face())
            .field(
                "Account Created",
                format!("<t:{}:R>", user.id.created_at().unix_timestamp()),
                true,
            )
            .footer(CreateEmbedFooter::new(format!("User ID: {}", user.id)))
            .timestamp(Utc::now());
        send_log(
            &event.ctx.http,
            &self.services,
            event.member.guild_id,
            LogType::Members,
            embed,
        )
        .await
    }
}

#[async_trait::async_trait]
impl Subscriber<MemberLeaveEvent> for AuditLogSubscriber {
    async fn callback(&self, event: MemberLeaveEvent) -> Result<()> {
        let joined = event
            .member
            .as_ref()
            .and_then(|m| m.joined_at)
            .map(|t| t.unix_timestamp())
            .unwrap_or(0);
        let roles = event
            .member
            .as_ref()
            .map(|m| role_mentions(&m.roles))
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "None".to_string());

        let embed = CreateEmbed::new()
            .title("Member Left")
            .description(format!("<@{}> left the server", event.user.id))
            .color(RED)
            .thumbnail(event.user.face())
            .field("Joined Server", format!("<t:{joined}:R>"), true)
            .field("Roles", truncate_field(&roles), false)
            .footer(CreateEmbedFooter::new(format!("User ID: {}", event.user.id)))
            .timestamp(Utc::now());
        send_log(
            &event.ctx.http,
            &self.services,
            event.guild_id,
            LogType::Members,
            embed,
        )
        .await
    }
}

#[async_trait::async_trait]
impl Subscriber<MemberUpdateEvent> for AuditLogSubscriber {
    async fn callback(&self, event: MemberUpdateEvent) -> Result<()> {
        let Some(old) = &event.old else {
            return Ok(());
        };
        let new = &event.new;
        let added: Vec<RoleId> = new
            .roles
            .iter()
            .filter(|r| !old.roles.contains(r))
            .copied()
            .collect();
        let removed: Vec<RoleId> = old
            .roles
            .iter()
            .filter(|r| !new.roles.contains(r))
            .copied()
            .collect();

        if !added.is_empty() || !removed.is_empty() {
            let mut embed = CreateEmbed::new()
                .title("Member Roles Updated")
                .description(format!("<@{}>'s roles were updated", new.user.id))
                .color(BLUE)
                .thumbnail(new.user.face())
                .footer(CreateEmbedFooter::new(format!("User ID: {}", new.user.id)))
                .timestamp(Utc::now());
            if !added.is_empty() {
                embed = embed.field("Added Roles", role_mentions(&added), false);
            }
            if !removed.is_empty() {
                embed = embed.field("Removed Roles", role_mentions(&removed), false);
            }
            send_log(
                &event.ctx.http,
                &self.services,
                new.guild_id,
                LogType::Members,
                embed,
            )
            .await?;
        }

        if old.nick != new.nick {
            let embed = CreateEmbed::new()
                .title("Nickname Changed")
                .description(format!("<@{}>'s nickname was changed", new.user.id))
                .color(BLUE)
                .field("Before", old.nick.clone().unwrap_or_else(|| "None".into()), true)
                .field("After", new.nick.clone().unwrap_or_else(|| "None".into()), true)
                .thumbnail(new.user.face())
                .footer(CreateEmbedFooter::new(format!("User ID: {}", new.user.id)))
                .timestamp(Utc::now());
            send_log(
                &event.ctx.http,
                &self.services,
                new.guild_id,
                LogType::Members,
                embed,
            )
            .await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Subscriber<VoiceStateEvent> for AuditLogSubscriber {
    async fn callback(&self, event: VoiceStateEvent) -> Result<()> {
        let Some(guild_id) = event.new.guild_id else {
            return Ok(());
        };
        let user = event.new.user_id;
        let before = event.old.as_ref().and_then(|s| s.channel_id);
        let after = event.new.channel_id;

        let (title, description, color) = match (before, after) {
            (None, Some(to)) => ("Voice Channel Joined", format!("<@{user}> joined <#{to}>"), GREEN),
            (Some(from), None) => ("Voice Channel Left", format!("<@{user}> left <#{from}>"), RED),
            (Some(from), Some(to)) if from != to => (
                "Voice Channel Moved",
                format!("<@{user}> moved from <#{from}> to <#{to}>"),
                BLUE,
            ),
            // Mute, deafen and stream toggles
            _ => return Ok(()),
        };
        let embed = CreateEmbed::new()
            .title(title)
            .description(description)
            .color(color)
            .footer(CreateEmbedFooter::new(format!("User ID: {user}")))
            .timestamp(Utc::now());
        send_log(&event.ctx.http, &self.services, guild_id, LogType::Voice, embed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("short"), "short");
        let long = "x".repeat(2000);
        let cut = truncate_field(&long);
        assert_eq!(cut.chars().count(), FIELD_LIMIT);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_field(&"y".repeat(FIELD_LIMIT)).len(), FIELD_LIMIT);
    }

    #[test]
    fn test_recent_messages_evicts_oldest() {
        let mut recent = RecentMessages::default();
        let message = CachedMessage {
            author_id: UserId::new(1),
            channel_id: ChannelId::new(2),
            content: "hi".into(),
            attachments: Vec::new(),
        };
        for id in 1..=(RECENT_MESSAGES as u64 + 1) {
            recent.insert(MessageId::new(id), message.clone());
        }
        assert!(recent.get(MessageId::new(1)).is_none());
        assert!(recent.get(MessageId::new(2)).is_some());
        assert_eq!(recent.remove(MessageId::new(2)).map(|m| m.content), Some("hi".into()));
    }
}
