//! Levels, level rewards and the level leaderboard.

use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use serenity::Mentionable;

use crate::bot::Data;
use crate::bot::checks::guild_id;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::bot::utils::PAGE_SIZE;
use crate::bot::utils::guild_member_ids;
use crate::bot::utils::medal;
use crate::bot::utils::member_names;
use crate::bot::utils::page_bounds;
use crate::bot::utils::progress_bar;
use crate::model::LeaderboardKind;
use crate::model::LeaderboardOptBuilder;
use crate::service::user_service::level_progress;
use crate::service::user_service::xp_for_level;
use crate::subscriber::activity_subscriber::handle_level_up;

const LEVEL_COLOR: u32 = 0x3498DB;

pub struct LevelingCog;

impl LevelingCog {
    /// Show your level or another member's
    #[poise::command(prefix_command, slash_command, guild_only, category = "Leveling")]
    pub async fn rank(
        ctx: Context<'_>,
        #[description = "Member to check"] member: Option<serenity::Member>,
    ) -> Result<(), Error> {
        let user = member
            .as_ref()
            .map(|m| m.user.clone())
            .unwrap_or_else(|| ctx.author().clone());
        let service = &ctx.data().service.user;
        let model = service.get_or_create_user(user.id.get(), &user.name).await?;
        let progress = level_progress(model.level, model.xp);
        let position = service.rank_of(user.id.get()).await?;

        let mut embed = CreateEmbed::new()
            .title(format!("{}'s Rank", user.name))
            .thumbnail(user.face())
            .color(LEVEL_COLOR)
            .field("Level", model.level.to_string(), true)
            .field(
                "XP",
                format!("{}/{}", model.xp, xp_for_level(model.level)),
                true,
            )
            .field(
                "Progress",
                format!("{} {progress:.1}%", progress_bar(progress)),
                false,
            );
        if let Some(position) = position {
            embed = embed.footer(CreateEmbedFooter::new(format!("Global rank #{position}")));
        }
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Highest levels in this server
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Leveling",
        aliases("level_top", "xp_ranking")
    )]
    pub async fn level_leaderboard(
        ctx: Context<'_>,
        #[description = "Page number"] page: Option<u32>,
    ) -> Result<(), Error> {
        let opts = LeaderboardOptBuilder::default()
            .kind(LeaderboardKind::Level)
            .user_ids(Some(guild_member_ids(ctx)?));
        let (_, total) = ctx.data().service.user.leaderboard(&opts.build()?).await?;
        if total == 0 {
            ctx.say("No users found in the level leaderboard for this server.")
                .await?;
            return Ok(());
        }

        let (offset, pages) = page_bounds(page, total)?;
        let opts = opts.offset(Some(offset)).limit(Some(PAGE_SIZE)).build()?;
        let (entries, _) = ctx.data().service.user.leaderboard(&opts).await?;
        let ids: Vec<u64> = entries.iter().map(|e| e.user_id).collect();
        let names = member_names(ctx, &ids);

        let mut embed = CreateEmbed::new()
            .title("Level Leaderboard")
            .description(format!("Page {}/{pages}", offset / PAGE_SIZE + 1))
            .color(LEVEL_COLOR);
        for (i, entry) in entries.iter().enumerate() {
            let rank = offset + i as u32 + 1;
            let name = names
                .get(&entry.user_id)
                .cloned()
                .unwrap_or_else(|| format!("<@{}>", entry.user_id));
            embed = embed.field(
                format!("{}#{rank}: {name}", medal(rank)),
                format!("Level {} ({} XP)", entry.level, entry.xp),
                false,
            );
        }
        embed = embed.footer(CreateEmbedFooter::new(format!(
            "Use {}level_leaderboard <page> to navigate pages",
            ctx.prefix()
        )));
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Manage roles awarded at levels
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Leveling",
        required_permissions = "ADMINISTRATOR",
        subcommands("Self::levelrole_add", "Self::levelrole_remove", "Self::levelrole_list"),
        subcommand_required
    )]
    pub async fn levelrole(_ctx: Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// Award a role when members reach a level
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        rename = "add",
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn levelrole_add(
        ctx: Context<'_>,
        #[description = "Level"] level: u32,
        #[description = "Role to award"] role: serenity::Role,
    ) -> Result<(), Error> {
        if level < 1 {
            return Err(BotError::InvalidCommandArgument {
                parameter: "level".to_string(),
                reason: "Level must be at least 1.".to_string(),
            }
            .into());
        }
        let guild_id = guild_id(ctx)?;
        ctx.data()
            .service
            .settings
            .modify(guild_id.get(), |s| {
                s.leveling.level_roles.insert(level, role.id.get());
            })
            .await?;
        ctx.say(format!(
            "Members reaching level {level} will now receive {}.",
            role.mention()
        ))
        .await?;
        Ok(())
    }

    /// Stop awarding a role at a level
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        rename = "remove",
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn levelrole_remove(
        ctx: Context<'_>,
        #[description = "Level"] level: u32,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let removed = ctx
            .data()
            .service
            .settings
            .modify(guild_id.get(), |s| s.leveling.level_roles.remove(&level))
            .await?;
        match removed {
            Some(_) => ctx.say(format!("Removed the level {level} role reward.")).await?,
            None => ctx.say(format!("No role is set for level {level}.")).await?,
        };
        Ok(())
    }

    /// List level role rewards
    #[poise::command(prefix_command, slash_command, guild_only, rename = "list")]
    pub async fn levelrole_list(ctx: Context<'_>) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let roles = ctx
            .data()
            .service
            .settings
            .get_server_settings(guild_id.get())
            .await?
            .leveling
            .level_roles;
        if roles.is_empty() {
            ctx.say("No level roles configured.").await?;
            return Ok(());
        }
        let description = roles
            .iter()
            .map(|(level, role)| format!("Level {level}: <@&{role}>"))
            .collect::<Vec<_>>()
            .join("\n");
        let embed = CreateEmbed::new()
            .title("Level Roles")
            .description(description)
            .color(LEVEL_COLOR);
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Give experience to a member
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Leveling",
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn givexp(
        ctx: Context<'_>,
        #[description = "Member to reward"] member: serenity::Member,
        #[description = "Experience to give"] amount: i64,
    ) -> Result<(), Error> {
        if amount <= 0 {
            return Err(BotError::InvalidCommandArgument {
                parameter: "amount".to_string(),
                reason: "Amount must be positive.".to_string(),
            }
            .into());
        }
        let guild_id = guild_id(ctx)?;
        let services = &ctx.data().service;
        services
            .user
            .ensure_user(member.user.id.get(), &member.user.name)
            .await?;
        let outcome = services.user.add_xp(member.user.id.get(), amount).await?;
        ctx.say(format!("Gave {amount} XP to {}.", member.mention()))
            .await?;
        handle_level_up(
            ctx.serenity_context(),
            services,
            guild_id,
            ctx.channel_id(),
            member.user.id,
            &outcome,
        )
        .await?;
        Ok(())
    }
}

impl Cog for LevelingCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![
            Self::rank(),
            Self::level_leaderboard(),
            Self::levelrole(),
            Self::givexp(),
        ]
    }
}
