//! Bot presence commands.

use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;

use crate::bot::Data;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::service::status_service::StatusEntry;
use crate::service::status_service::StatusKind;
use crate::task::status_rotation::activity_for;
use crate::task::status_rotation::restore_rotation;

const STATUS_COLOR: u32 = 0x3498DB;

fn kinds_list() -> String {
    StatusKind::ALL.map(|k| k.name()).join(", ")
}

fn usage_embed() -> CreateEmbed {
    let kinds: Vec<String> = StatusKind::ALL
        .iter()
        .map(|k| format!("• {}", k.name()))
        .chain(std::iter::once("• reset".to_string()))
        .collect();
    CreateEmbed::new()
        .title("Change the Bot Status")
        .color(STATUS_COLOR)
        .field("Usage", "`status <type> <text>`", false)
        .field("Types", kinds.join("\n"), false)
        .field(
            "Examples",
            "`status playing Minecraft`\n`status listening music`\n`status reset`",
            false,
        )
}

fn parse_kind(input: &str) -> Result<StatusKind, BotError> {
    input.parse().map_err(|_| BotError::InvalidCommandArgument {
        parameter: "kind".to_string(),
        reason: format!("Invalid status type. Use one of: {}", kinds_list()),
    })
}

pub struct StatusCog;

impl StatusCog {
    /// Set the bot's status, or `reset` to resume the rotation
    #[poise::command(
        prefix_command,
        slash_command,
        category = "Utility",
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn status(
        ctx: Context<'_>,
        #[description = "playing, listening, watching, streaming, competing or reset"] kind: Option<
            String,
        >,
        #[description = "Status text"]
        #[rest]
        text: Option<String>,
    ) -> Result<(), Error> {
        let Some(kind) = kind else {
            ctx.send(CreateReply::default().embed(usage_embed())).await?;
            return Ok(());
        };

        let data = ctx.data();
        if kind.eq_ignore_ascii_case("reset") {
            data.presence.set_manual(false);
            restore_rotation(ctx.serenity_context(), &data.presence, &data.service.status).await;
            ctx.say("✅ Status restored to the automatic rotation.").await?;
            return Ok(());
        }

        let kind = parse_kind(&kind)?;
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return Err(BotError::InvalidCommandArgument {
                parameter: "text".to_string(),
                reason: "You must provide a text for the status.".to_string(),
            }
            .into());
        };
        ctx.serenity_context()
            .set_activity(Some(activity_for(kind, text.clone())));
        data.presence.set_manual(true);
        ctx.say(format!("✅ Status changed to: **{kind}** {text}"))
            .await?;
        Ok(())
    }

    /// Show the automatic status rotation
    #[poise::command(
        prefix_command,
        slash_command,
        category = "Utility",
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn statuslist(ctx: Context<'_>) -> Result<(), Error> {
        let rotation = ctx.data().service.status.rotation().await?;
        let mut embed = CreateEmbed::new()
            .title("Status Rotation")
            .description("Statuses the bot cycles through automatically")
            .color(STATUS_COLOR);
        for (i, entry) in rotation.iter().take(25).enumerate() {
            embed = embed.field(
                format!("Status #{}", i + 1),
                format!("**Type:** {}\n**Text:** {}", entry.kind, entry.text),
                false,
            );
        }
        if rotation.is_empty() {
            embed = embed.footer(CreateEmbedFooter::new("The rotation is empty"));
        }
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Add a status to the rotation
    #[poise::command(
        prefix_command,
        slash_command,
        category = "Utility",
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn addstatus(
        ctx: Context<'_>,
        #[description = "playing, listening, watching, streaming or competing"] kind: String,
        #[description = "Text, may use {guilds} and {users}"]
        #[rest]
        text: String,
    ) -> Result<(), Error> {
        let kind = parse_kind(&kind)?;
        if text.trim().is_empty() {
            return Err(BotError::InvalidCommandArgument {
                parameter: "text".to_string(),
                reason: "You must provide a text for the status.".to_string(),
            }
            .into());
        }
        let len = ctx
            .data()
            .service
            .status
            .add(StatusEntry::new(kind, text.clone()))
            .await?;
        ctx.say(format!(
            "✅ Added status #{len} to the rotation: **{kind}** {text}"
        ))
        .await?;
        Ok(())
    }

    /// Remove a status from the rotation
    #[poise::command(
        prefix_command,
        slash_command,
        category = "Utility",
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn removestatus(
        ctx: Context<'_>,
        #[description = "Status number from statuslist"] index: usize,
    ) -> Result<(), Error> {
        let (removed, _) = ctx.data().service.status.remove(index).await?;
        ctx.say(format!(
            "✅ Removed status from the rotation: **{}** {}",
            removed.kind, removed.text
        ))
        .await?;
        Ok(())
    }
}

impl Cog for StatusCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![
            Self::status(),
            Self::statuslist(),
            Self::addstatus(),
            Self::removestatus(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind_is_case_insensitive() {
        assert_eq!(parse_kind("Watching").unwrap(), StatusKind::Watching);
    }

    #[test]
    fn test_parse_kind_lists_valid_kinds_on_error() {
        match parse_kind("sleeping").unwrap_err() {
            BotError::InvalidCommandArgument { reason, .. } => {
                assert!(reason.contains("playing, listening, watching, streaming, competing"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
