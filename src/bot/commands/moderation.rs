//! Warnings, kicks, bans and timeouts.

use chrono::DateTime;
use chrono::Duration as ChronoDuration;
use chrono::Utc;
use log::debug;
use log::warn;
use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use serenity::CreateInvite;
use serenity::CreateMessage;
use serenity::EditMember;
use serenity::GuildId;
use serenity::Mentionable;
use serenity::Timestamp;
use serenity::UserId;

use crate::bot::Data;
use crate::bot::checks::ensure_can_moderate;
use crate::bot::checks::guild_id;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::bot::utils::parse_user_id;
use crate::model::LogType;
use crate::model::PunishmentType;
use crate::service::moderation_service::DEFAULT_MUTE_SECS;
use crate::service::moderation_service::WarnEscalation;
use crate::service::moderation_service::validate_timeout;
use crate::service::time::format_duration;
use crate::subscriber::audit_log_subscriber::moderation_embed;
use crate::subscriber::audit_log_subscriber::send_log;

const WARN_COLOR: u32 = 0xF1C40F;
const ACTION_COLOR: u32 = 0xE74C3C;
const UNBAN_COLOR: u32 = 0x2ECC71;
const WARNINGS_SHOWN: u32 = 10;
const NO_REASON: &str = "No reason provided";

/// Mirrors a moderation command into the guild's moderation log.
async fn log_action(ctx: Context<'_>, guild_id: GuildId, action: &str, target: UserId, reason: &str) {
    let embed = moderation_embed(action, target, ctx.author().id, reason);
    if let Err(e) = send_log(
        ctx.http(),
        &ctx.data().service,
        guild_id,
        LogType::Moderation,
        embed,
    )
    .await
    {
        warn!("Failed to log {action} in guild {guild_id}: {e}");
    }
}

/// DMs a member before an action; members with closed DMs are skipped.
async fn notify(ctx: Context<'_>, user_id: UserId, title: String, reason: &str) {
    let embed = CreateEmbed::new()
        .title(title)
        .color(ACTION_COLOR)
        .field("Reason", reason, false)
        .field("Moderator", ctx.author().name.clone(), false);
    let result = match user_id.create_dm_channel(ctx.http()).await {
        Ok(dm) => dm
            .send_message(ctx.http(), CreateMessage::new().embed(embed))
            .await
            .map(|_| ()),
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        debug!("Could not DM {user_id}: {e}");
    }
}

/// Applies a communication timeout and returns when it ends.
async fn apply_timeout(
    ctx: Context<'_>,
    guild_id: GuildId,
    user_id: UserId,
    seconds: i64,
    reason: &str,
) -> Result<DateTime<Utc>, Error> {
    let until = Utc::now() + ChronoDuration::seconds(seconds);
    let timestamp = Timestamp::from_unix_timestamp(until.timestamp())?;
    guild_id
        .edit_member(
            ctx.http(),
            user_id,
            EditMember::new()
                .disable_communication_until_datetime(timestamp)
                .audit_log_reason(reason),
        )
        .await?;
    Ok(until)
}

pub struct ModerationCog;

impl ModerationCog {
    /// Warn a member
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Moderation",
        required_permissions = "KICK_MEMBERS"
    )]
    pub async fn warn(
        ctx: Context<'_>,
        #[description = "Member to warn"] member: serenity::Member,
        #[description = "Reason"]
        #[rest]
        reason: Option<String>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let user_id = member.user.id;
        ensure_can_moderate(ctx, user_id, "warn").await?;
        let reason = reason.unwrap_or_else(|| NO_REASON.to_string());
        let moderation = &ctx.data().service.moderation;
        let (count, escalation) = moderation
            .warn(guild_id.get(), user_id.get(), ctx.author().id.get(), &reason)
            .await?;

        let embed = CreateEmbed::new()
            .title("⚠️ Warning")
            .description(format!("{} has been warned.", member.mention()))
            .color(WARN_COLOR)
            .field("Reason", reason.as_str(), false)
            .field("Warning Count", count.to_string(), true)
            .footer(CreateEmbedFooter::new(format!(
                "Warned by {}",
                ctx.author().name
            )));
        ctx.send(CreateReply::default().embed(embed)).await?;
        log_action(ctx, guild_id, "Warned", user_id, &reason).await;

        let auto_reason = format!("Automatic action: {count} warnings");
        let bot_id = ctx.cache().current_user().id.get();
        match escalation {
            Some(WarnEscalation::Timeout) => {
                let until =
                    apply_timeout(ctx, guild_id, user_id, DEFAULT_MUTE_SECS, &auto_reason).await?;
                moderation
                    .record(
                        guild_id.get(),
                        user_id.get(),
                        bot_id,
                        PunishmentType::Mute,
                        &auto_reason,
                        Some(until),
                    )
                    .await?;
                ctx.say(format!(
                    "{} has been muted for 1 hour for reaching {count} warnings.",
                    member.mention()
                ))
                .await?;
                log_action(ctx, guild_id, "Muted", user_id, &auto_reason).await;
            }
            Some(WarnEscalation::Kick) => {
                guild_id
                    .kick_with_reason(ctx.http(), user_id, &auto_reason)
                    .await?;
                moderation
                    .record(
                        guild_id.get(),
                        user_id.get(),
                        bot_id,
                        PunishmentType::Kick,
                        &auto_reason,
                        None,
                    )
                    .await?;
                ctx.say(format!(
                    "{} has been kicked for reaching {count} warnings.",
                    member.user.name
                ))
                .await?;
                log_action(ctx, guild_id, "Kicked", user_id, &auto_reason).await;
            }
            Some(WarnEscalation::Ban) => {
                guild_id
                    .ban_with_reason(ctx.http(), user_id, 0, &auto_reason)
                    .await?;
                moderation
                    .record(
                        guild_id.get(),
                        user_id.get(),
                        bot_id,
                        PunishmentType::Ban,
                        &auto_reason,
                        None,
                    )
                    .await?;
                ctx.say(format!(
                    "{} has been banned for reaching {count} warnings.",
                    member.user.name
                ))
                .await?;
                log_action(ctx, guild_id, "Banned", user_id, &auto_reason).await;
            }
            None => {}
        }
        Ok(())
    }

    /// Show a member's latest warnings
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Moderation",
        required_permissions = "KICK_MEMBERS"
    )]
    pub async fn warnings(
        ctx: Context<'_>,
        #[description = "Member to check"] member: Option<serenity::Member>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let (user_id, name) = match &member {
            Some(m) => (m.user.id, m.display_name().to_string()),
            None => (ctx.author().id, ctx.author().name.clone()),
        };
        let (warnings, total) = ctx
            .data()
            .service
            .moderation
            .warnings(guild_id.get(), user_id.get(), WARNINGS_SHOWN)
            .await?;
        if warnings.is_empty() {
            ctx.say(format!("{name} has no warnings.")).await?;
            return Ok(());
        }

        let mut embed = CreateEmbed::new()
            .title(format!("Warnings for {name}"))
            .description(format!("Total warnings: {total}"))
            .color(WARN_COLOR);
        for (i, warning) in warnings.iter().enumerate() {
            embed = embed.field(
                format!("Warning {}", i + 1),
                format!(
                    "**Reason:** {}\n**Moderator:** <@{}>\n**Date:** <t:{}:f>",
                    warning.reason,
                    warning.moderator_id,
                    warning.timestamp.timestamp()
                ),
                false,
            );
        }
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Clear a member's warnings
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Moderation",
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn clearwarnings(
        ctx: Context<'_>,
        #[description = "Member to clear"] member: serenity::Member,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let removed = ctx
            .data()
            .service
            .moderation
            .clear_warnings(guild_id.get(), member.user.id.get())
            .await?;
        ctx.say(format!(
            "Warnings for {} have been cleared ({removed} removed).",
            member.display_name()
        ))
        .await?;
        log_action(ctx, guild_id, "Warnings Cleared", member.user.id, NO_REASON).await;
        Ok(())
    }

    /// Kick a member
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Moderation",
        required_permissions = "KICK_MEMBERS"
    )]
    pub async fn kick(
        ctx: Context<'_>,
        #[description = "Member to kick"] member: serenity::Member,
        #[description = "Reason"]
        #[rest]
        reason: Option<String>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let user_id = member.user.id;
        ensure_can_moderate(ctx, user_id, "kick").await?;
        let reason = reason.unwrap_or_else(|| NO_REASON.to_string());
        let guild_name = ctx.guild().map(|g| g.name.clone()).unwrap_or_default();

        notify(ctx, user_id, format!("You have been kicked from {guild_name}"), &reason).await;
        guild_id
            .kick_with_reason(ctx.http(), user_id, &reason)
            .await?;
        ctx.data()
            .service
            .moderation
            .record(
                guild_id.get(),
                user_id.get(),
                ctx.author().id.get(),
                PunishmentType::Kick,
                &reason,
                None,
            )
            .await?;

        let embed = CreateEmbed::new()
            .title("👢 Member Kicked")
            .description(format!("{} has been kicked.", member.user.name))
            .color(ACTION_COLOR)
            .field("Reason", reason.as_str(), false);
        ctx.send(CreateReply::default().embed(embed)).await?;
        log_action(ctx, guild_id, "Kicked", user_id, &reason).await;
        Ok(())
    }

    /// Ban a member
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Moderation",
        required_permissions = "BAN_MEMBERS"
    )]
    pub async fn ban(
        ctx: Context<'_>,
        #[description = "Member to ban"] member: serenity::Member,
        #[description = "Reason"]
        #[rest]
        reason: Option<String>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let user_id = member.user.id;
        ensure_can_moderate(ctx, user_id, "ban").await?;
        let reason = reason.unwrap_or_else(|| NO_REASON.to_string());
        let guild_name = ctx.guild().map(|g| g.name.clone()).unwrap_or_default();

        notify(ctx, user_id, format!("You have been banned from {guild_name}"), &reason).await;
        guild_id
            .ban_with_reason(ctx.http(), user_id, 0, &reason)
            .await?;
        ctx.data()
            .service
            .moderation
            .record(
                guild_id.get(),
                user_id.get(),
                ctx.author().id.get(),
                PunishmentType::Ban,
                &reason,
                None,
            )
            .await?;

        let embed = CreateEmbed::new()
            .title("🔨 Member Banned")
            .description(format!("{} has been banned.", member.user.name))
            .color(ACTION_COLOR)
            .field("Reason", reason.as_str(), false);
        ctx.send(CreateReply::default().embed(embed)).await?;
        log_action(ctx, guild_id, "Banned", user_id, &reason).await;
        Ok(())
    }

    /// Unban a user and send them an invite back
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Moderation",
        required_permissions = "BAN_MEMBERS"
    )]
    pub async fn unban(
        ctx: Context<'_>,
        #[description = "User id or mention"] user: String,
        #[description = "Reason"]
        #[rest]
        reason: Option<String>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let user_id = parse_user_id(&user).map(UserId::new).ok_or_else(|| {
            BotError::InvalidCommandArgument {
                parameter: "user".to_string(),
                reason: "Invalid user ID format. Please provide a valid user ID.".to_string(),
            }
        })?;
        let reason = reason.unwrap_or_else(|| NO_REASON.to_string());

        if let Err(e) = guild_id.unban(ctx.http(), user_id).await {
            debug!("Unban of {user_id} in guild {guild_id} failed: {e}");
            return Err(BotError::InvalidCommandArgument {
                parameter: "user".to_string(),
                reason: "This user is not banned.".to_string(),
            }
            .into());
        }

        let embed = CreateEmbed::new()
            .title("🔓 User Unbanned")
            .description(format!("<@{user_id}> has been unbanned."))
            .color(UNBAN_COLOR)
            .field("Reason", reason.as_str(), false);
        ctx.send(CreateReply::default().embed(embed)).await?;
        log_action(ctx, guild_id, "Unbanned", user_id, &reason).await;

        let guild_name = ctx.guild().map(|g| g.name.clone()).unwrap_or_default();
        let invite = ctx
            .channel_id()
            .create_invite(
                ctx.http(),
                CreateInvite::new().max_age(86400).max_uses(1).unique(true),
            )
            .await;
        match invite {
            Ok(invite) => {
                let embed = CreateEmbed::new()
                    .title(format!("You have been unbanned from {guild_name}"))
                    .description(format!(
                        "You can rejoin with this invite (valid for 24 hours, single use):\n{}",
                        invite.url()
                    ))
                    .color(UNBAN_COLOR)
                    .field("Reason", reason.as_str(), false);
                let sent = match user_id.create_dm_channel(ctx.http()).await {
                    Ok(dm) => dm
                        .send_message(ctx.http(), CreateMessage::new().embed(embed))
                        .await
                        .is_ok(),
                    Err(_) => false,
                };
                if sent {
                    ctx.say("An invite has been sent to the user via DM.").await?;
                } else {
                    ctx.say("Could not DM the user an invite.").await?;
                }
            }
            Err(e) => warn!("Failed to create invite in guild {guild_id}: {e}"),
        }
        Ok(())
    }

    /// Time out a member
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Moderation",
        required_permissions = "MODERATE_MEMBERS"
    )]
    pub async fn mute(
        ctx: Context<'_>,
        #[description = "Member to mute"] member: serenity::Member,
        #[description = "Duration in seconds (default 3600)"] seconds: Option<i64>,
        #[description = "Reason"]
        #[rest]
        reason: Option<String>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let user_id = member.user.id;
        ensure_can_moderate(ctx, user_id, "mute").await?;
        let seconds = seconds.unwrap_or(DEFAULT_MUTE_SECS);
        validate_timeout(seconds)?;
        let reason = reason.unwrap_or_else(|| NO_REASON.to_string());

        let until = apply_timeout(ctx, guild_id, user_id, seconds, &reason).await?;
        ctx.data()
            .service
            .moderation
            .record(
                guild_id.get(),
                user_id.get(),
                ctx.author().id.get(),
                PunishmentType::Mute,
                &reason,
                Some(until),
            )
            .await?;

        let embed = CreateEmbed::new()
            .title("🔇 Member Muted")
            .description(format!(
                "{} has been muted for {}.",
                member.mention(),
                format_duration(seconds)
            ))
            .color(ACTION_COLOR)
            .field("Reason", reason.as_str(), false)
            .field("Expires", format!("<t:{}:R>", until.timestamp()), true);
        ctx.send(CreateReply::default().embed(embed)).await?;
        log_action(ctx, guild_id, "Muted", user_id, &reason).await;
        Ok(())
    }

    /// Lift a member's timeout
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Moderation",
        required_permissions = "MODERATE_MEMBERS"
    )]
    pub async fn unmute(
        ctx: Context<'_>,
        #[description = "Member to unmute"] member: serenity::Member,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let user_id = member.user.id;
        guild_id
            .edit_member(ctx.http(), user_id, EditMember::new().enable_communication())
            .await?;

        let embed = CreateEmbed::new()
            .title("🔊 Member Unmuted")
            .description(format!("{} has been unmuted.", member.mention()))
            .color(UNBAN_COLOR);
        ctx.send(CreateReply::default().embed(embed)).await?;
        log_action(ctx, guild_id, "Unmuted", user_id, NO_REASON).await;
        Ok(())
    }
}

impl Cog for ModerationCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![
            Self::warn(),
            Self::warnings(),
            Self::clearwarnings(),
            Self::kick(),
            Self::ban(),
            Self::unban(),
            Self::mute(),
            Self::unmute(),
        ]
    }
}
