//! Audit log channel configuration.

use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::CreateEmbed;
use serenity::Mentionable;

use crate::bot::Data;
use crate::bot::checks::guild_id;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::model::LogType;

const LOGGING_COLOR: u32 = 0x3498DB;

fn parse_log_type(input: &str) -> Result<LogType, BotError> {
    input
        .parse()
        .map_err(|reason| BotError::InvalidCommandArgument {
            parameter: "log_type".to_string(),
            reason,
        })
}

pub struct LoggingCog;

impl LoggingCog {
    /// Configure audit log channels
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Logging",
        required_permissions = "ADMINISTRATOR",
        subcommands("Self::setup", "Self::disable", "Self::status"),
        subcommand_required
    )]
    pub async fn logging(_ctx: Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// Send a type of log to a channel
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn setup(
        ctx: Context<'_>,
        #[description = "moderation, messages, members, server, voice or all"] log_type: String,
        #[description = "Channel for the logs (defaults to this one)"] channel: Option<
            serenity::GuildChannel,
        >,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let log_type = parse_log_type(&log_type)?;
        let channel_id = channel.map(|c| c.id).unwrap_or_else(|| ctx.channel_id());
        ctx.data()
            .service
            .settings
            .modify(guild_id.get(), |s| {
                s.logging.channels.insert(log_type, channel_id.get());
            })
            .await?;
        ctx.say(format!(
            "Logging for {} events has been set to {}",
            log_type.name(),
            channel_id.mention()
        ))
        .await?;
        Ok(())
    }

    /// Stop sending a type of log
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn disable(
        ctx: Context<'_>,
        #[description = "moderation, messages, members, server, voice or all"] log_type: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let log_type = parse_log_type(&log_type)?;
        let removed = ctx
            .data()
            .service
            .settings
            .modify(guild_id.get(), |s| s.logging.channels.remove(&log_type))
            .await?;
        match removed {
            Some(_) => {
                ctx.say(format!(
                    "Logging for {} events has been disabled",
                    log_type.name()
                ))
                .await?
            }
            None => {
                ctx.say(format!(
                    "Logging for {} events is not set up.",
                    log_type.name()
                ))
                .await?
            }
        };
        Ok(())
    }

    /// Show where each type of log goes
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let logging = ctx
            .data()
            .service
            .settings
            .get_server_settings(guild_id.get())
            .await?
            .logging;
        if logging.channels.is_empty() {
            ctx.say("Logging is not set up for this server.").await?;
            return Ok(());
        }
        let mut embed = CreateEmbed::new()
            .title("Logging Configuration")
            .color(LOGGING_COLOR);
        for log_type in LogType::ALL {
            let value = match logging.channels.get(&log_type) {
                Some(channel) => format!("<#{channel}>"),
                None => "Not set".to_string(),
            };
            embed = embed.field(log_type.name(), value, true);
        }
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

impl Cog for LoggingCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::logging()]
    }
}
