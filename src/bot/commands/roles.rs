//! Role management and level reward roles.

use std::collections::HashMap;

use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use serenity::EditRole;
use serenity::Mentionable;
use serenity::Permissions;
use serenity::Role;
use serenity::RoleId;

use crate::bot::Data;
use crate::bot::checks::ensure_role_manageable;
use crate::bot::checks::guild_id;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::service::role_service::AUTO_ROLE_LEVELS;
use crate::service::role_service::parse_hex_color;

const ROLES_COLOR: u32 = 0x3498DB;
const MAX_LISTED_MEMBERS: usize = 10;
const MAX_LISTED_PERMISSIONS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoleCategory {
    Admin,
    Moderator,
    Special,
    Normal,
}

impl RoleCategory {
    const ALL: [RoleCategory; 4] = [
        RoleCategory::Admin,
        RoleCategory::Moderator,
        RoleCategory::Special,
        RoleCategory::Normal,
    ];

    fn title(self) -> &'static str {
        match self {
            RoleCategory::Admin => "🛡️ Admin Roles",
            RoleCategory::Moderator => "🔨 Moderator Roles",
            RoleCategory::Special => "✨ Special Roles",
            RoleCategory::Normal => "📝 Other Roles",
        }
    }
}

fn categorize(permissions: Permissions, hoist: bool, mentionable: bool, colour: u32) -> RoleCategory {
    let moderation = Permissions::BAN_MEMBERS
        | Permissions::KICK_MEMBERS
        | Permissions::MANAGE_MESSAGES
        | Permissions::MANAGE_CHANNELS;
    if permissions.administrator() {
        RoleCategory::Admin
    } else if permissions.intersects(moderation) {
        RoleCategory::Moderator
    } else if hoist || mentionable || colour != 0 {
        RoleCategory::Special
    } else {
        RoleCategory::Normal
    }
}

fn level_role_name(level: u32) -> String {
    format!("Level {level}")
}

/// Cached roles of the current guild, minus @everyone, with member counts.
fn role_snapshot(ctx: Context<'_>) -> Result<(String, Vec<Role>, HashMap<RoleId, usize>), BotError> {
    let guild = ctx.guild().ok_or(BotError::GuildOnlyCommand)?;
    let roles = guild
        .roles
        .values()
        .filter(|r| r.id.get() != guild.id.get())
        .cloned()
        .collect();
    let mut counts: HashMap<RoleId, usize> = HashMap::new();
    for member in guild.members.values() {
        for role in &member.roles {
            *counts.entry(*role).or_default() += 1;
        }
    }
    Ok((guild.name.clone(), roles, counts))
}

pub struct RolesCog;

impl RolesCog {
    /// Manage server roles
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Roles",
        required_permissions = "MANAGE_ROLES",
        subcommands(
            "Self::role_add",
            "Self::role_remove",
            "Self::role_create",
            "Self::role_delete",
            "Self::role_info",
            "Self::role_list"
        ),
        subcommand_required
    )]
    pub async fn role(_ctx: Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// Give a role to a member
    #[poise::command(prefix_command, slash_command, guild_only, rename = "add", required_permissions = "MANAGE_ROLES")]
    pub async fn role_add(
        ctx: Context<'_>,
        #[description = "Member to give the role to"] member: serenity::Member,
        #[description = "Role to give"] role: Role,
    ) -> Result<(), Error> {
        ensure_role_manageable(ctx, role.id).await?;
        member.add_role(ctx.http(), role.id).await?;
        ctx.say(format!(
            "✅ Added {} to {}",
            role.mention(),
            member.mention()
        ))
        .await?;
        Ok(())
    }

    /// Take a role from a member
    #[poise::command(prefix_command, slash_command, guild_only, rename = "remove", required_permissions = "MANAGE_ROLES")]
    pub async fn role_remove(
        ctx: Context<'_>,
        #[description = "Member to take the role from"] member: serenity::Member,
        #[description = "Role to take"] role: Role,
    ) -> Result<(), Error> {
        ensure_role_manageable(ctx, role.id).await?;
        member.remove_role(ctx.http(), role.id).await?;
        ctx.say(format!(
            "✅ Removed {} from {}",
            role.mention(),
            member.mention()
        ))
        .await?;
        Ok(())
    }

    /// Create a role
    #[poise::command(prefix_command, slash_command, guild_only, rename = "create", required_permissions = "MANAGE_ROLES")]
    pub async fn role_create(
        ctx: Context<'_>,
        #[description = "Role name"] name: String,
        #[description = "Hex color such as #ff0000"] color: Option<String>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let reason = format!("Created by {}", ctx.author().name);
        let mut builder = EditRole::new().name(&name).audit_log_reason(&reason);
        if let Some(color) = color {
            builder = builder.colour(parse_hex_color(&color)?);
        }
        let role = guild_id.create_role(ctx.http(), builder).await?;
        ctx.say(format!("✅ Created role {}", role.mention())).await?;
        Ok(())
    }

    /// Delete a role
    #[poise::command(prefix_command, slash_command, guild_only, rename = "delete", required_permissions = "MANAGE_ROLES")]
    pub async fn role_delete(
        ctx: Context<'_>,
        #[description = "Role to delete"]
        #[rest]
        role: Role,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        ensure_role_manageable(ctx, role.id).await?;
        guild_id.delete_role(ctx.http(), role.id).await?;
        ctx.say(format!("✅ Deleted role **{}**", role.name)).await?;
        Ok(())
    }

    /// Show details about a role
    #[poise::command(prefix_command, slash_command, guild_only, rename = "info")]
    pub async fn role_info(
        ctx: Context<'_>,
        #[description = "Role to inspect"]
        #[rest]
        role: Role,
    ) -> Result<(), Error> {
        let members: Vec<String> = {
            let guild = ctx.guild().ok_or(BotError::GuildOnlyCommand)?;
            guild
                .members
                .values()
                .filter(|m| m.roles.contains(&role.id))
                .map(|m| m.mention().to_string())
                .collect()
        };
        let members_text = if members.is_empty() {
            "No members have this role".to_string()
        } else {
            let mut text = members
                .iter()
                .take(MAX_LISTED_MEMBERS)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            if members.len() > MAX_LISTED_MEMBERS {
                text.push_str(&format!(" and {} more", members.len() - MAX_LISTED_MEMBERS));
            }
            text
        };

        let permissions = role.permissions.get_permission_names();
        let perms_text = if permissions.is_empty() {
            "This role has no special permissions".to_string()
        } else {
            let mut text = permissions
                .iter()
                .take(MAX_LISTED_PERMISSIONS)
                .map(|p| format!("✅ {p}"))
                .collect::<Vec<_>>()
                .join("\n");
            if permissions.len() > MAX_LISTED_PERMISSIONS {
                text.push_str(&format!(
                    "\n... and {} more",
                    permissions.len() - MAX_LISTED_PERMISSIONS
                ));
            }
            text
        };

        let embed = CreateEmbed::new()
            .title(format!("Role info: {}", role.name))
            .color(role.colour)
            .field("ID", role.id.to_string(), true)
            .field("Color", format!("#{:06x}", role.colour.0), true)
            .field("Position", role.position.to_string(), true)
            .field("Mentionable", if role.mentionable { "Yes" } else { "No" }, true)
            .field("Hoisted", if role.hoist { "Yes" } else { "No" }, true)
            .field(
                "Created",
                format!("<t:{}:R>", role.id.created_at().unix_timestamp()),
                true,
            )
            .field(format!("Members ({})", members.len()), members_text, false)
            .field("Permissions", perms_text, false);
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// List the server's roles by category
    #[poise::command(prefix_command, slash_command, guild_only, rename = "list")]
    pub async fn role_list(ctx: Context<'_>) -> Result<(), Error> {
        let (guild_name, mut roles, counts) = role_snapshot(ctx)?;
        roles.sort_by(|a, b| b.position.cmp(&a.position));

        let mut embed = CreateEmbed::new()
            .title(format!("Roles in {guild_name}"))
            .description(format!("Total: {} roles (excluding @everyone)", roles.len()))
            .color(ROLES_COLOR);
        for category in RoleCategory::ALL {
            let lines: Vec<String> = roles
                .iter()
                .filter(|r| {
                    categorize(r.permissions, r.hoist, r.mentionable, r.colour.0) == category
                })
                .map(|r| {
                    format!(
                        "{} - {} members",
                        r.mention(),
                        counts.get(&r.id).copied().unwrap_or(0)
                    )
                })
                .collect();
            if lines.is_empty() {
                continue;
            }
            let mut value = String::new();
            for line in &lines {
                if value.len() + line.len() + 1 > 1000 {
                    value.push_str("\n...");
                    break;
                }
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(line);
            }
            embed = embed.field(category.title(), value, false);
        }
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Create the level reward roles and register them
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Roles",
        required_permissions = "MANAGE_ROLES"
    )]
    pub async fn autoroles(ctx: Context<'_>) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        ctx.defer().await?;

        let existing: HashMap<String, RoleId> = {
            let guild = ctx.guild().ok_or(BotError::GuildOnlyCommand)?;
            guild
                .roles
                .values()
                .map(|r| (r.name.clone(), r.id))
                .collect()
        };

        let mut assigned = Vec::with_capacity(AUTO_ROLE_LEVELS.len());
        let mut created = 0;
        for level in AUTO_ROLE_LEVELS {
            let name = level_role_name(level);
            let role_id = match existing.get(&name) {
                Some(id) => *id,
                None => {
                    let role = guild_id
                        .create_role(
                            ctx.http(),
                            EditRole::new()
                                .name(&name)
                                .audit_log_reason("Level reward role"),
                        )
                        .await?;
                    created += 1;
                    role.id
                }
            };
            assigned.push((level, role_id));
        }

        let pairs = assigned.clone();
        ctx.data()
            .service
            .settings
            .modify(guild_id.get(), move |s| {
                for (level, role_id) in pairs {
                    s.leveling.level_roles.insert(level, role_id.get());
                }
            })
            .await?;

        let mut embed = CreateEmbed::new()
            .title("Level Roles")
            .description("These roles are given automatically when members reach a level:")
            .color(0x2ECC71)
            .footer(CreateEmbedFooter::new(format!("{created} role(s) created")));
        for (level, role_id) in assigned {
            embed = embed.field(format!("Level {level}"), role_id.mention().to_string(), true);
        }
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

impl Cog for RolesCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::role(), Self::autoroles()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_admin_wins_over_everything() {
        let perms = Permissions::ADMINISTRATOR | Permissions::BAN_MEMBERS;
        assert_eq!(categorize(perms, true, true, 0xff0000), RoleCategory::Admin);
    }

    #[test]
    fn test_categorize_moderator_permissions() {
        assert_eq!(
            categorize(Permissions::KICK_MEMBERS, false, false, 0),
            RoleCategory::Moderator
        );
        assert_eq!(
            categorize(Permissions::MANAGE_CHANNELS, false, false, 0),
            RoleCategory::Moderator
        );
    }

    #[test]
    fn test_categorize_special_and_normal() {
        let perms = Permissions::SEND_MESSAGES;
        assert_eq!(categorize(perms, true, false, 0), RoleCategory::Special);
        assert_eq!(categorize(perms, false, false, 0x00ff00), RoleCategory::Special);
        assert_eq!(categorize(perms, false, false, 0), RoleCategory::Normal);
    }

    #[test]
    fn test_level_role_name() {
        assert_eq!(level_role_name(50), "Level 50");
    }
}
