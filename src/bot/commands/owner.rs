//! Owner-only commands for bot administration.

use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serde::Serialize;
use serenity::CreateAttachment;

use crate::bot::Data;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;

fn json_attachment<T: Serialize>(rows: &T, filename: &str) -> Result<CreateAttachment, Error> {
    Ok(CreateAttachment::bytes(
        serde_json::to_string_pretty(rows)?,
        filename,
    ))
}

/// Cog of bot owners-only commands.
pub struct OwnerCog;

impl OwnerCog {
    /// Register application commands (owner only)
    ///
    /// Opens a dialog to register global or guild application commands.
    #[poise::command(prefix_command, owners_only, hide_in_help, category = "Owner")]
    pub async fn register(ctx: Context<'_>) -> Result<(), Error> {
        poise::builtins::register_application_commands_buttons(ctx).await?;
        Ok(())
    }

    /// Export database contents (owner only)
    ///
    /// Dumps the main tables as JSON files for inspection.
    #[poise::command(prefix_command, owners_only, hide_in_help, category = "Owner")]
    pub async fn dump_db(ctx: Context<'_>) -> Result<(), Error> {
        ctx.defer().await?;
        let dump = ctx.data().service.internal.dump_database().await?;

        let reply = CreateReply::default()
            .content("Database dump:")
            .attachment(json_attachment(&dump.users, "users.json")?)
            .attachment(json_attachment(&dump.economy, "economy.json")?)
            .attachment(json_attachment(&dump.punishments, "punishments.json")?)
            .attachment(json_attachment(&dump.custom_commands, "custom_commands.json")?)
            .attachment(json_attachment(&dump.polls, "polls.json")?)
            .attachment(json_attachment(&dump.giveaways, "giveaways.json")?)
            .attachment(json_attachment(&dump.reminders, "reminders.json")?);

        ctx.send(reply).await?;
        Ok(())
    }
}

impl Cog for OwnerCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::register(), Self::dump_db()]
    }
}
