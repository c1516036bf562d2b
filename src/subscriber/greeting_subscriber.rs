//! Welcome, farewell and welcome-DM messages.

use std::sync::Arc;

use anyhow::Result;
use log::debug;
use poise::serenity_prelude as serenity;
use rand::seq::SliceRandom;
use serenity::ChannelId;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use serenity::CreateMessage;
use serenity::GuildId;

use crate::event::MemberJoinEvent;
use crate::event::MemberLeaveEvent;
use crate::model::GreetingSettings;
use crate::service::Services;
use crate::subscriber::Subscriber;

const WELCOME_COLOR: u32 = 0x2ECC71;
const FAREWELL_COLOR: u32 = 0xE74C3C;

/// Fills the `{user}`, `{server}` and `{count}` placeholders.
pub fn render_greeting(template: &str, user: &str, server: &str, count: u64) -> String {
    template
        .replace("{user}", user)
        .replace("{server}", server)
        .replace("{count}", &count.to_string())
}

fn pick(messages: &[String], fallback: Vec<String>) -> String {
    let mut rng = rand::thread_rng();
    messages
        .choose(&mut rng)
        .cloned()
        .or_else(|| fallback.choose(&mut rng).cloned())
        .unwrap_or_default()
}

struct GuildInfo {
    name: String,
    icon: Option<String>,
    members: u64,
}

fn guild_info(ctx: &serenity::Context, guild_id: GuildId) -> Option<GuildInfo> {
    let guild = ctx.cache.guild(guild_id)?;
    Some(GuildInfo {
        name: guild.name.clone(),
        icon: guild.icon_url(),
        members: guild.member_count,
    })
}

fn greeting_embed(
    title: &str,
    text: String,
    color: u32,
    avatar: String,
    footer: String,
    icon: Option<String>,
) -> CreateEmbed {
    let mut footer = CreateEmbedFooter::new(footer);
    if let Some(icon) = icon {
        footer = footer.icon_url(icon);
    }
    CreateEmbed::new()
        .title(title)
        .description(text)
        .color(color)
        .thumbnail(avatar)
        .footer(footer)
}

pub struct GreetingSubscriber {
    services: Arc<Services>,
}

impl GreetingSubscriber {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn settings(&self, guild_id: GuildId) -> Result<GreetingSettings> {
        Ok(self
            .services
            .settings
            .get_server_settings(guild_id.get())
            .await?
            .greetings)
    }
}

#[async_trait::async_trait]
impl Subscriber<MemberJoinEvent> for GreetingSubscriber {
    async fn callback(&self, event: MemberJoinEvent) -> Result<()> {
        let member = &event.member;
        if member.user.bot {
            return Ok(());
        }
        self.services
            .user
            .ensure_user(member.user.id.get(), &member.user.name)
            .await?;

        let settings = self.settings(member.guild_id).await?;
        let Some(info) = guild_info(&event.ctx, member.guild_id) else {
            return Ok(());
        };

        if settings.welcome_enabled
            && let Some(channel) = settings.welcome_channel
        {
            let template = pick(
                &settings.welcome_messages,
                GreetingSettings::default_welcome_messages(),
            );
            let text = render_greeting(
                &template,
                &format!("<@{}>", member.user.id),
                &info.name,
                info.members,
            );
            let embed = greeting_embed(
                "👋 Welcome!",
                text,
                WELCOME_COLOR,
                member.user.face(),
                format!("Joined {}", info.name),
                info.icon.clone(),
            );
            ChannelId::new(channel)
                .send_message(&event.ctx.http, CreateMessage::new().embed(embed))
                .await?;
        }

        if settings.welcome_dm_enabled {
            let text = render_greeting(
                &settings.welcome_dm_message,
                &member.user.name,
                &info.name,
                info.members,
            );
            if let Err(e) = member
                .user
                .direct_message(&event.ctx.http, CreateMessage::new().content(text))
                .await
            {
                debug!("Welcome DM to {} failed: {e}", member.user.id);
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Subscriber<MemberLeaveEvent> for GreetingSubscriber {
    async fn callback(&self, event: MemberLeaveEvent) -> Result<()> {
        if event.user.bot {
            return Ok(());
        }
        let settings = self.settings(event.guild_id).await?;
        if !settings.farewell_enabled {
            return Ok(());
        }
        let (Some(channel), Some(info)) = (
            settings.farewell_channel,
            guild_info(&event.ctx, event.guild_id),
        ) else {
            return Ok(());
        };

        let template = pick(
            &settings.farewell_messages,
            GreetingSettings::default_farewell_messages(),
        );
        let text = render_greeting(&template, &event.user.name, &info.name, info.members);
        let embed = greeting_embed(
            "👋 Farewell!",
            text,
            FAREWELL_COLOR,
            event.user.face(),
            format!("Left {}", info.name),
            info.icon,
        );
        ChannelId::new(channel)
            .send_message(&event.ctx.http, CreateMessage::new().embed(embed))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_greeting_replaces_all_placeholders() {
        let text = render_greeting(
            "{user} joined {server}, member #{count}. Hi {user}!",
            "<@1>",
            "Zen",
            42,
        );
        assert_eq!(text, "<@1> joined Zen, member #42. Hi <@1>!");
    }

    #[test]
    fn test_pick_falls_back_when_list_empty() {
        let text = pick(&[], vec!["only".to_string()]);
        assert_eq!(text, "only");
        let text = pick(&["custom".to_string()], vec!["only".to_string()]);
        assert_eq!(text, "custom");
    }
}
