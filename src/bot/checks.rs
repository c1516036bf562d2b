use poise::serenity_prelude as serenity;
use serenity::ChannelId;
use serenity::GuildId;
use serenity::Permissions;
use serenity::RoleId;
use serenity::UserId;

use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;

pub fn guild_id(ctx: Context<'_>) -> Result<GuildId, BotError> {
    ctx.guild_id().ok_or(BotError::GuildOnlyCommand)
}

/// Permissions of the command author in the current guild.
pub async fn author_permissions(ctx: Context<'_>) -> Result<Permissions, Error> {
    let member = ctx
        .author_member()
        .await
        .ok_or(BotError::GuildOnlyCommand)?;
    let guild = ctx.guild().ok_or(BotError::GuildOnlyCommand)?;
    #[allow(deprecated)]
    let permissions = guild.member_permissions(member.as_ref());
    Ok(permissions)
}

pub async fn is_author_guild_admin(ctx: Context<'_>) -> Result<(), Error> {
    let permissions = author_permissions(ctx).await?;
    Ok(check_permissions_inner(
        permissions.contains(Permissions::ADMINISTRATOR)
            || permissions.contains(Permissions::MANAGE_GUILD),
    )?)
}

fn check_permissions_inner(is_admin: bool) -> Result<(), BotError> {
    if is_admin {
        return Ok(());
    }
    Err(BotError::PermissionDenied(
        "You need the `Manage Server` or `Administrator` permission to perform this action."
            .to_string(),
    ))
}

/// Where a member sits in the guild's role hierarchy.
#[derive(Debug, Clone, Copy)]
pub struct Standing {
    pub is_owner: bool,
    pub top_position: u16,
}

/// Resolves the [`Standing`] of a guild member.
pub async fn standing(ctx: Context<'_>, user_id: UserId) -> Result<Standing, Error> {
    let guild_id = guild_id(ctx)?;
    let member = guild_id.member(ctx, user_id).await?;
    let guild = ctx.guild().ok_or(BotError::GuildOnlyCommand)?;
    Ok(Standing {
        is_owner: guild.owner_id == user_id,
        top_position: top_position(&guild.roles, &member.roles),
    })
}

fn top_position(
    roles: &std::collections::HashMap<RoleId, serenity::Role>,
    member_roles: &[RoleId],
) -> u16 {
    member_roles
        .iter()
        .filter_map(|id| roles.get(id))
        .map(|role| role.position)
        .max()
        .unwrap_or(0)
}

/// Position of a role, 0 when it is not cached.
pub fn role_position(ctx: Context<'_>, role_id: RoleId) -> u16 {
    ctx.guild()
        .and_then(|g| g.roles.get(&role_id).map(|r| r.position))
        .unwrap_or(0)
}

/// Refuses moderation of oneself and of members ranked at or above the moderator.
pub async fn ensure_can_moderate(
    ctx: Context<'_>,
    target: UserId,
    action: &str,
) -> Result<(), Error> {
    let author = ctx.author().id;
    if target == author {
        return Err(BotError::HierarchyError(format!("You cannot {action} yourself.")).into());
    }
    let moderator = standing(ctx, author).await?;
    let target_standing = standing(ctx, target).await?;
    Ok(check_hierarchy_inner(
        moderator,
        target_standing.top_position,
        &format!("{action} this member"),
    )?)
}

/// Requires a role to sit below both the author's and the bot's top role.
pub async fn ensure_role_manageable(ctx: Context<'_>, role_id: RoleId) -> Result<(), Error> {
    let position = role_position(ctx, role_id);
    let bot_id = ctx.cache().current_user().id;
    let bot = standing(ctx, bot_id).await?;
    if position >= bot.top_position {
        return Err(BotError::HierarchyError(
            "I cannot manage this role because it is higher than or equal to my highest role."
                .to_string(),
        )
        .into());
    }
    let author = standing(ctx, ctx.author().id).await?;
    Ok(check_hierarchy_inner(author, position, "manage this role")?)
}

fn check_hierarchy_inner(actor: Standing, target_position: u16, what: &str) -> Result<(), BotError> {
    if actor.is_owner || actor.top_position > target_position {
        return Ok(());
    }
    Err(BotError::HierarchyError(format!(
        "You cannot {what} because it is ranked higher than or equal to your highest role."
    )))
}

/// Voice channel the author is currently connected to.
pub fn author_voice_channel(ctx: Context<'_>) -> Result<ChannelId, BotError> {
    let guild = ctx.guild().ok_or(BotError::GuildOnlyCommand)?;
    guild
        .voice_states
        .get(&ctx.author().id)
        .and_then(|state| state.channel_id)
        .ok_or(BotError::NotInVoiceChannel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_permissions_admin_always_passes() {
        assert!(check_permissions_inner(true).is_ok());
    }

    #[test]
    fn test_check_permissions_fails_without_any_permissions() {
        match check_permissions_inner(false).unwrap_err() {
            BotError::PermissionDenied(msg) => assert!(msg.contains("Manage Server")),
            _ => panic!("Expected PermissionDenied error"),
        }
    }

    #[test]
    fn test_hierarchy_requires_strictly_higher_role() {
        let actor = Standing {
            is_owner: false,
            top_position: 5,
        };
        assert!(check_hierarchy_inner(actor, 4, "kick this member").is_ok());
        assert!(check_hierarchy_inner(actor, 5, "kick this member").is_err());
        assert!(check_hierarchy_inner(actor, 9, "kick this member").is_err());
    }

    #[test]
    fn test_hierarchy_owner_bypasses() {
        let owner = Standing {
            is_owner: true,
            top_position: 0,
        };
        assert!(check_hierarchy_inner(owner, 10, "ban this member").is_ok());
    }
}
