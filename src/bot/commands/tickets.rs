//! Support tickets: a panel button opens a private channel per user.

use std::time::Duration;

use chrono::Utc;
use log::info;
use log::warn;
use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::ButtonStyle;
use serenity::ChannelId;
use serenity::ChannelType;
use serenity::ComponentInteraction;
use serenity::CreateActionRow;
use serenity::CreateButton;
use serenity::CreateChannel;
use serenity::CreateEmbed;
use serenity::CreateInteractionResponse;
use serenity::CreateInteractionResponseFollowup;
use serenity::CreateInteractionResponseMessage;
use serenity::CreateMessage;
use serenity::GuildId;
use serenity::Http;
use serenity::Mentionable;
use serenity::PermissionOverwrite;
use serenity::PermissionOverwriteType;
use serenity::Permissions;
use serenity::RoleId;
use serenity::UserId;

use crate::bot::Data;
use crate::bot::checks::guild_id;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;

pub const CREATE_TICKET: &str = "create_ticket";
pub const CLOSE_TICKET: &str = "close_ticket";
pub const CLOSE_TICKET_CONFIRM: &str = "close_ticket_confirm";
pub const CLOSE_TICKET_CANCEL: &str = "close_ticket_cancel";

const TICKET_PREFIX: &str = "ticket-";
const CLOSE_DELAY: Duration = Duration::from_secs(5);
const GREEN: u32 = 0x2ECC71;
const RED: u32 = 0xE74C3C;
const BLUE: u32 = 0x3498DB;

pub fn ticket_channel_name(username: &str) -> String {
    format!("{TICKET_PREFIX}{}", username.to_lowercase())
}

pub fn is_ticket_channel(name: &str) -> bool {
    name.starts_with(TICKET_PREFIX)
}

fn visible() -> Permissions {
    Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::READ_MESSAGE_HISTORY
}

/// Overwrites hiding a channel from everyone except the bot, the support role and `member`.
fn private_overwrites(
    guild_id: GuildId,
    bot_id: UserId,
    support_role: Option<RoleId>,
    member: Option<UserId>,
) -> Vec<PermissionOverwrite> {
    let mut overwrites = vec![
        PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            kind: PermissionOverwriteType::Role(guild_id.everyone_role()),
        },
        PermissionOverwrite {
            allow: visible() | Permissions::MANAGE_CHANNELS,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(bot_id),
        },
    ];
    if let Some(role) = support_role {
        overwrites.push(PermissionOverwrite {
            allow: visible(),
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Role(role),
        });
    }
    if let Some(user) = member {
        overwrites.push(PermissionOverwrite {
            allow: visible(),
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(user),
        });
    }
    overwrites
}

fn panel_message() -> (CreateEmbed, Vec<CreateActionRow>) {
    let embed = CreateEmbed::new()
        .title("Support Tickets")
        .description("Click the button below to create a support ticket.")
        .color(BLUE);
    let button = CreateButton::new(CREATE_TICKET)
        .label("Create Ticket")
        .emoji('🎫')
        .style(ButtonStyle::Primary);
    (embed, vec![CreateActionRow::Buttons(vec![button])])
}

fn closed_embed(closer: UserId) -> CreateEmbed {
    CreateEmbed::new()
        .title("Ticket Closed")
        .description(format!("This ticket has been closed by {}.", closer.mention()))
        .color(RED)
        .timestamp(Utc::now())
}

/// Deletes a ticket channel after a short delay.
fn delete_later(http: std::sync::Arc<Http>, channel_id: ChannelId, closer: UserId) {
    tokio::spawn(async move {
        tokio::time::sleep(CLOSE_DELAY).await;
        match channel_id.delete(&http).await {
            Ok(_) => info!("Ticket channel {channel_id} closed by {closer}"),
            Err(e) => warn!("Failed to delete ticket channel {channel_id}: {e}"),
        }
    });
}

async fn followup(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    content: impl Into<String>,
) -> Result<(), Error> {
    component
        .create_followup(
            &ctx.http,
            CreateInteractionResponseFollowup::new()
                .content(content)
                .ephemeral(true),
        )
        .await?;
    Ok(())
}

/// Handles the panel's "Create Ticket" button.
pub async fn handle_create(
    ctx: &serenity::Context,
    data: &Data,
    component: &ComponentInteraction,
) -> Result<(), Error> {
    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new().ephemeral(true)),
        )
        .await?;
    let Some(guild_id) = component.guild_id else {
        return Ok(());
    };
    let user = &component.user;
    let tickets = data
        .service
        .settings
        .get_server_settings(guild_id.get())
        .await?
        .tickets;
    let Some(category_id) = tickets.category_id.map(ChannelId::new) else {
        return followup(ctx, component, "Ticket system is not set up for this server.").await;
    };

    let name = ticket_channel_name(&user.name);
    let lookup = ctx.cache.guild(guild_id).map(|guild| {
        let category_exists = guild.channels.contains_key(&category_id);
        let existing = guild
            .channels
            .values()
            .find(|c| c.parent_id == Some(category_id) && c.name == name)
            .map(|c| c.id);
        (category_exists, existing)
    });
    let Some((category_exists, existing)) = lookup else {
        return followup(ctx, component, "Ticket system is not available right now.").await;
    };
    if !category_exists {
        return followup(ctx, component, "Ticket category not found.").await;
    }
    if let Some(channel) = existing {
        return followup(
            ctx,
            component,
            format!("You already have an open ticket: {}", channel.mention()),
        )
        .await;
    }

    let support_role = tickets.support_role_id.map(RoleId::new);
    let overwrites = private_overwrites(
        guild_id,
        ctx.cache.current_user().id,
        support_role,
        Some(user.id),
    );
    let channel = guild_id
        .create_channel(
            &ctx.http,
            CreateChannel::new(name)
                .kind(ChannelType::Text)
                .category(category_id)
                .permissions(overwrites),
        )
        .await?;
    info!("Opened ticket {} for {} in guild {guild_id}", channel.id, user.id);

    let welcome = CreateEmbed::new()
        .title("Support Ticket")
        .description(format!(
            "Welcome {}! Please describe your issue and a staff member will assist you shortly.",
            user.mention()
        ))
        .color(GREEN)
        .timestamp(Utc::now());
    let close = CreateButton::new(CLOSE_TICKET)
        .label("Close Ticket")
        .emoji('🔒')
        .style(ButtonStyle::Danger);
    let mut message = CreateMessage::new()
        .embed(welcome)
        .components(vec![CreateActionRow::Buttons(vec![close])]);
    if let Some(role) = support_role {
        message = message.content(format!("{} A new ticket has been created.", role.mention()));
    }
    channel.send_message(&ctx.http, message).await?;

    followup(
        ctx,
        component,
        format!("Your ticket has been created: {}", channel.mention()),
    )
    .await
}

/// Handles "Close Ticket" by asking for confirmation.
pub async fn handle_close(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
) -> Result<(), Error> {
    let name = component.channel_id.name(ctx).await.unwrap_or_default();
    let response = if is_ticket_channel(&name) {
        let embed = CreateEmbed::new()
            .title("Close Ticket")
            .description(
                "Are you sure you want to close this ticket? This will delete the channel.",
            )
            .color(RED);
        let buttons = vec![
            CreateButton::new(CLOSE_TICKET_CONFIRM)
                .label("Confirm")
                .style(ButtonStyle::Danger),
            CreateButton::new(CLOSE_TICKET_CANCEL)
                .label("Cancel")
                .style(ButtonStyle::Secondary),
        ];
        CreateInteractionResponseMessage::new()
            .embed(embed)
            .components(vec![CreateActionRow::Buttons(buttons)])
            .ephemeral(true)
    } else {
        CreateInteractionResponseMessage::new()
            .content("This is not a ticket channel.")
            .ephemeral(true)
    };
    component
        .create_response(&ctx.http, CreateInteractionResponse::Message(response))
        .await?;
    Ok(())
}

/// Handles the confirmation buttons of a ticket close.
pub async fn handle_close_confirm(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    confirmed: bool,
) -> Result<(), Error> {
    let update = if confirmed {
        CreateInteractionResponseMessage::new()
            .content("Closing ticket...")
            .embeds(Vec::new())
            .components(Vec::new())
    } else {
        CreateInteractionResponseMessage::new()
            .content("Ticket closure cancelled.")
            .embeds(Vec::new())
            .components(Vec::new())
    };
    component
        .create_response(&ctx.http, CreateInteractionResponse::UpdateMessage(update))
        .await?;
    if confirmed {
        component
            .channel_id
            .send_message(
                &ctx.http,
                CreateMessage::new().embed(closed_embed(component.user.id)),
            )
            .await?;
        delete_later(ctx.http.clone(), component.channel_id, component.user.id);
    }
    Ok(())
}

pub struct TicketsCog;

impl TicketsCog {
    /// Manage the ticket system
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Tickets",
        required_permissions = "ADMINISTRATOR",
        subcommands("Self::setup", "Self::panel", "Self::close"),
        subcommand_required
    )]
    pub async fn tickets(_ctx: Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// Set up the ticket category and support role
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn setup(
        ctx: Context<'_>,
        #[description = "Existing category for tickets"]
        #[channel_types("Category")]
        category: Option<serenity::GuildChannel>,
        #[description = "Role that handles tickets"] support_role: Option<serenity::Role>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let support_role_id = support_role.as_ref().map(|r| r.id);
        let category_id = match category {
            Some(category) if category.kind == ChannelType::Category => category.id,
            Some(_) => {
                return Err(BotError::InvalidCommandArgument {
                    parameter: "category".to_string(),
                    reason: "That channel is not a category.".to_string(),
                }
                .into());
            }
            None => {
                let overwrites = private_overwrites(
                    guild_id,
                    ctx.cache().current_user().id,
                    support_role_id,
                    None,
                );
                let category = guild_id
                    .create_channel(
                        ctx.http(),
                        CreateChannel::new("Support Tickets")
                            .kind(ChannelType::Category)
                            .permissions(overwrites),
                    )
                    .await?;
                ctx.say(format!("Created ticket category: {}", category.name))
                    .await?;
                category.id
            }
        };

        ctx.data()
            .service
            .settings
            .modify(guild_id.get(), |s| {
                s.tickets.category_id = Some(category_id.get());
                s.tickets.support_role_id = support_role_id.map(|r| r.get());
            })
            .await?;

        let (embed, components) = panel_message();
        ctx.send(CreateReply::default().embed(embed).components(components))
            .await?;
        ctx.say("Ticket system has been set up successfully!").await?;
        Ok(())
    }

    /// Post the ticket panel
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn panel(
        ctx: Context<'_>,
        #[description = "Channel for the panel (defaults to this one)"] channel: Option<
            serenity::GuildChannel,
        >,
    ) -> Result<(), Error> {
        let channel_id = channel.map(|c| c.id).unwrap_or_else(|| ctx.channel_id());
        let (embed, components) = panel_message();
        channel_id
            .send_message(
                ctx.http(),
                CreateMessage::new().embed(embed).components(components),
            )
            .await?;
        ctx.say(format!("Ticket panel created in {}", channel_id.mention()))
            .await?;
        Ok(())
    }

    /// Close the current ticket
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn close(ctx: Context<'_>) -> Result<(), Error> {
        let channel_id = ctx.channel_id();
        let name = channel_id.name(ctx).await?;
        if !is_ticket_channel(&name) {
            return Err(BotError::InvalidCommandArgument {
                parameter: "channel".to_string(),
                reason: "This is not a ticket channel.".to_string(),
            }
            .into());
        }
        ctx.send(CreateReply::default().embed(closed_embed(ctx.author().id)))
            .await?;
        delete_later(
            ctx.serenity_context().http.clone(),
            channel_id,
            ctx.author().id,
        );
        Ok(())
    }
}

impl Cog for TicketsCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::tickets()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_channel_name_is_lowercase() {
        assert_eq!(ticket_channel_name("Alice"), "ticket-alice");
        assert!(is_ticket_channel("ticket-alice"));
        assert!(!is_ticket_channel("general"));
    }

    #[test]
    fn test_private_overwrites_hide_from_everyone() {
        let guild = GuildId::new(1);
        let overwrites = private_overwrites(guild, UserId::new(2), Some(RoleId::new(3)), Some(UserId::new(4)));
        assert_eq!(overwrites.len(), 4);
        assert_eq!(overwrites[0].deny, Permissions::VIEW_CHANNEL);
        assert!(matches!(overwrites[0].kind, PermissionOverwriteType::Role(r) if r.get() == 1));
    }
}
