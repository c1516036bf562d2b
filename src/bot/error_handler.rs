//! Error handling for Discord bot commands.

use log::error;
use log::warn;
use poise::CreateReply;
use poise::FrameworkError;
use poise::serenity_prelude as serenity;
use serenity::CreateEmbed;

use crate::bot::Data;
use crate::bot::Error;
use crate::bot::error::BotError;
use crate::error::AppError;
use crate::music::error::MusicError;
use crate::service::error::ServiceError;
use crate::service::time::format_duration;

const ERROR_COLOR: u32 = 0xE74C3C;
const WARNING_COLOR: u32 = 0xF1C40F;

/// Handles framework errors and sends appropriate responses to users.
pub struct ErrorHandler;

impl ErrorHandler {
    /// Handles a framework error by classifying and responding appropriately.
    pub async fn handle(error: FrameworkError<'_, Data, Error>) {
        match error {
            FrameworkError::Command { error, ctx, .. } => {
                let (title, description) = Self::classify_error(&error, &ctx);
                let embed = CreateEmbed::new()
                    .title(title)
                    .description(description)
                    .color(ERROR_COLOR);
                Self::send_embed(&ctx, embed).await;
            }
            FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                let mut description = match input {
                    Some(input) => format!("Could not parse `{input}`: {error}"),
                    None => error.to_string(),
                };
                description.push_str(&format!(
                    "\n\nUse `{}help {}` for usage information.",
                    ctx.prefix(),
                    ctx.command().qualified_name
                ));
                let embed = CreateEmbed::new()
                    .title("⚠️ Invalid Arguments")
                    .description(description)
                    .color(WARNING_COLOR);
                Self::send_embed(&ctx, embed).await;
            }
            FrameworkError::MissingUserPermissions {
                missing_permissions,
                ctx,
                ..
            } => {
                let description = match missing_permissions {
                    Some(permissions) => {
                        format!("You need the `{permissions}` permission to use this command.")
                    }
                    None => "You don't have permission to use this command.".to_string(),
                };
                let embed = CreateEmbed::new()
                    .title("🔒 Permission Denied")
                    .description(description)
                    .color(ERROR_COLOR);
                Self::send_embed(&ctx, embed).await;
            }
            FrameworkError::CooldownHit {
                remaining_cooldown,
                ctx,
                ..
            } => {
                let embed = CreateEmbed::new()
                    .title("⏳ Slow Down")
                    .description(format!(
                        "Please wait {} before using this command again.",
                        format_duration(remaining_cooldown.as_secs().max(1) as i64)
                    ))
                    .color(WARNING_COLOR);
                Self::send_embed(&ctx, embed).await;
            }
            error => {
                if let Err(e) = poise::builtins::on_error(error).await {
                    error!("Error while handling error: {}", e);
                }
            }
        }
    }

    /// Classifies an error and returns user-friendly title and description.
    fn classify_error(
        error: &Error,
        ctx: &poise::Context<'_, Data, Error>,
    ) -> (&'static str, String) {
        if let Some(bot_error) = error.downcast_ref::<BotError>() {
            ("❌ Action Failed", bot_error.to_string())
        } else if let Some(service_error) = error.downcast_ref::<ServiceError>() {
            match service_error {
                ServiceError::DatabaseError(_) | ServiceError::UnexpectedResult { .. } => {
                    Self::internal(error, ctx)
                }
                ServiceError::OnCooldown(_) => ("⏳ On Cooldown", service_error.to_string()),
                _ => ("❌ Error", service_error.to_string()),
            }
        } else if let Some(music_error) = error.downcast_ref::<MusicError>() {
            ("❌ Music Error", music_error.to_string())
        } else if let Some(serenity_error) = error.downcast_ref::<::serenity::Error>()
            && matches!(
                serenity_error,
                ::serenity::Error::Http(::serenity::http::HttpError::UnsuccessfulRequest(_))
            )
        {
            warn!(
                "Discord rejected a request in `{}`: {}",
                ctx.command().qualified_name,
                serenity_error
            );
            (
                "❌ Discord Error",
                "Discord refused the request. Check that I have the needed permissions.".to_string(),
            )
        } else {
            Self::internal(error, ctx)
        }
    }

    fn internal(error: &Error, ctx: &poise::Context<'_, Data, Error>) -> (&'static str, String) {
        let ref_id = AppError::log_with_ref(error);
        error!(
            "Unexpected error in command `{}`: {:?}",
            ctx.command().name,
            error
        );
        (
            "❌ Internal Error",
            format!(
                "An unexpected error occurred. Please contact the bot developer.\nReference ID: `{}`",
                ref_id
            ),
        )
    }

    async fn send_embed(ctx: &poise::Context<'_, Data, Error>, embed: CreateEmbed) {
        if let Err(e) = ctx
            .send(CreateReply::default().embed(embed).ephemeral(true))
            .await
        {
            warn!("Failed to send error reply: {e}");
        }
    }
}
