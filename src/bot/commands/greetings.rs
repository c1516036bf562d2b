//! Welcome and farewell message configuration.

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
use crate::model::GreetingSettings;

const GREETINGS_COLOR: u32 = 0x3498DB;
const PLACEHOLDERS: &str = "Available placeholders: {user}, {server}, {count}";

#[derive(Clone, Copy)]
enum Greeting {
    Welcome,
    Farewell,
}

impl Greeting {
    fn label(self) -> &'static str {
        match self {
            Greeting::Welcome => "Welcome",
            Greeting::Farewell => "Farewell",
        }
    }

    fn color(self) -> u32 {
        match self {
            Greeting::Welcome => 0x2ECC71,
            Greeting::Farewell => 0xE74C3C,
        }
    }

    fn enabled(self, s: &mut GreetingSettings) -> &mut bool {
        match self {
            Greeting::Welcome => &mut s.welcome_enabled,
            Greeting::Farewell => &mut s.farewell_enabled,
        }
    }

    fn channel(self, s: &mut GreetingSettings) -> &mut Option<u64> {
        match self {
            Greeting::Welcome => &mut s.welcome_channel,
            Greeting::Farewell => &mut s.farewell_channel,
        }
    }

    fn messages(self, s: &mut GreetingSettings) -> &mut Vec<String> {
        match self {
            Greeting::Welcome => &mut s.welcome_messages,
            Greeting::Farewell => &mut s.farewell_messages,
        }
    }
}

/// Sets the greeting channel, or toggles the greeting when no channel is given.
fn configure(s: &mut GreetingSettings, kind: Greeting, channel: Option<u64>) -> bool {
    match channel {
        Some(id) => {
            *kind.channel(s) = Some(id);
            *kind.enabled(s) = true;
            true
        }
        None => {
            let enabled = kind.enabled(s);
            *enabled = !*enabled;
            *enabled
        }
    }
}

/// Removes the 1-based `index`th message.
fn remove_message(
    s: &mut GreetingSettings,
    kind: Greeting,
    index: usize,
) -> Result<String, BotError> {
    let messages = kind.messages(s);
    if messages.is_empty() {
        return Err(BotError::InvalidCommandArgument {
            parameter: "index".to_string(),
            reason: format!("No {} messages configured.", kind.label().to_lowercase()),
        });
    }
    if index < 1 || index > messages.len() {
        return Err(BotError::InvalidCommandArgument {
            parameter: "index".to_string(),
            reason: format!(
                "Invalid index. Please specify a number between 1 and {}.",
                messages.len()
            ),
        });
    }
    Ok(messages.remove(index - 1))
}

async fn set_channel(
    ctx: Context<'_>,
    kind: Greeting,
    channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let channel_id = channel.map(|c| c.id);
    let enabled = ctx
        .data()
        .service
        .settings
        .modify(guild_id.get(), |s| {
            configure(&mut s.greetings, kind, channel_id.map(|c| c.get()))
        })
        .await?;
    let msg = match channel_id {
        Some(c) => format!(
            "{} messages will now be sent to {}.",
            kind.label(),
            c.mention()
        ),
        None => format!(
            "{} messages are now {}.",
            kind.label(),
            if enabled { "enabled" } else { "disabled" }
        ),
    };
    ctx.say(msg).await?;
    Ok(())
}

async fn add_message(ctx: Context<'_>, kind: Greeting, message: String) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    if message.trim().is_empty() {
        return Err(BotError::InvalidCommandArgument {
            parameter: "message".to_string(),
            reason: "The message cannot be empty.".to_string(),
        }
        .into());
    }
    ctx.data()
        .service
        .settings
        .modify(guild_id.get(), |s| kind.messages(&mut s.greetings).push(message))
        .await?;
    ctx.say(format!("{} message added.\n{PLACEHOLDERS}", kind.label()))
        .await?;
    Ok(())
}

async fn list_messages(ctx: Context<'_>, kind: Greeting) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let mut greetings = ctx
        .data()
        .service
        .settings
        .get_server_settings(guild_id.get())
        .await?
        .greetings;
    let messages = kind.messages(&mut greetings);
    if messages.is_empty() {
        ctx.say(format!(
            "No {} messages configured.",
            kind.label().to_lowercase()
        ))
        .await?;
        return Ok(());
    }
    let mut embed = CreateEmbed::new()
        .title(format!("{} Messages", kind.label()))
        .color(kind.color());
    for (i, message) in messages.iter().take(25).enumerate() {
        embed = embed.field(format!("Message {}", i + 1), message.clone(), false);
    }
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

async fn drop_message(ctx: Context<'_>, kind: Greeting, index: usize) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let removed = ctx
        .data()
        .service
        .settings
        .modify(guild_id.get(), |s| remove_message(&mut s.greetings, kind, index))
        .await??;
    ctx.say(format!(
        "Removed {} message: {removed}",
        kind.label().to_lowercase()
    ))
    .await?;
    Ok(())
}

fn channel_line(channel: Option<u64>) -> String {
    channel
        .map(|c| format!("<#{c}>"))
        .unwrap_or_else(|| "Not set".to_string())
}

pub struct GreetingsCog;

impl GreetingsCog {
    /// Configure welcome and farewell messages
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Communication",
        required_permissions = "ADMINISTRATOR",
        subcommands(
            "Self::welcome",
            "Self::farewell",
            "Self::addwelcome",
            "Self::addfarewell",
            "Self::listwelcome",
            "Self::listfarewell",
            "Self::removewelcome",
            "Self::removefarewell",
            "Self::welcomedm",
            "Self::status"
        ),
        subcommand_required
    )]
    pub async fn greetings(_ctx: Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// Set the welcome channel, or toggle welcome messages
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn welcome(
        ctx: Context<'_>,
        #[description = "Channel for welcome messages"] channel: Option<serenity::GuildChannel>,
    ) -> Result<(), Error> {
        set_channel(ctx, Greeting::Welcome, channel).await
    }

    /// Set the farewell channel, or toggle farewell messages
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn farewell(
        ctx: Context<'_>,
        #[description = "Channel for farewell messages"] channel: Option<serenity::GuildChannel>,
    ) -> Result<(), Error> {
        set_channel(ctx, Greeting::Farewell, channel).await
    }

    /// Add a welcome message
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn addwelcome(
        ctx: Context<'_>,
        #[description = "Message, may use {user}, {server} and {count}"]
        #[rest]
        message: String,
    ) -> Result<(), Error> {
        add_message(ctx, Greeting::Welcome, message).await
    }

    /// Add a farewell message
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn addfarewell(
        ctx: Context<'_>,
        #[description = "Message, may use {user}, {server} and {count}"]
        #[rest]
        message: String,
    ) -> Result<(), Error> {
        add_message(ctx, Greeting::Farewell, message).await
    }

    /// List welcome messages
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn listwelcome(ctx: Context<'_>) -> Result<(), Error> {
        list_messages(ctx, Greeting::Welcome).await
    }

    /// List farewell messages
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn listfarewell(ctx: Context<'_>) -> Result<(), Error> {
        list_messages(ctx, Greeting::Farewell).await
    }

    /// Remove a welcome message
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn removewelcome(
        ctx: Context<'_>,
        #[description = "Message number from listwelcome"] index: usize,
    ) -> Result<(), Error> {
        drop_message(ctx, Greeting::Welcome, index).await
    }

    /// Remove a farewell message
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn removefarewell(
        ctx: Context<'_>,
        #[description = "Message number from listfarewell"] index: usize,
    ) -> Result<(), Error> {
        drop_message(ctx, Greeting::Farewell, index).await
    }

    /// Configure the DM sent to new members
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn welcomedm(
        ctx: Context<'_>,
        #[description = "Send a DM to new members"] enabled: Option<bool>,
        #[description = "DM text, may use {user} and {server}"]
        #[rest]
        message: Option<String>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        if enabled.is_none() && message.is_none() {
            let greetings = ctx
                .data()
                .service
                .settings
                .get_server_settings(guild_id.get())
                .await?
                .greetings;
            ctx.say(format!(
                "Welcome DMs are {}.\nMessage: {}",
                if greetings.welcome_dm_enabled {
                    "enabled"
                } else {
                    "disabled"
                },
                greetings.welcome_dm_message
            ))
            .await?;
            return Ok(());
        }

        let message = message.filter(|m| !m.trim().is_empty());
        ctx.data()
            .service
            .settings
            .modify(guild_id.get(), |s| {
                if let Some(enabled) = enabled {
                    s.greetings.welcome_dm_enabled = enabled;
                }
                if let Some(message) = message.clone() {
                    s.greetings.welcome_dm_message = message;
                }
            })
            .await?;

        let mut lines = Vec::new();
        if let Some(enabled) = enabled {
            lines.push(format!(
                "Welcome DMs are now {}.",
                if enabled { "enabled" } else { "disabled" }
            ));
        }
        if message.is_some() {
            lines.push("Welcome DM message updated.".to_string());
            lines.push("Available placeholders: {user}, {server}".to_string());
        }
        ctx.say(lines.join("\n")).await?;
        Ok(())
    }

    /// Show the greetings configuration
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let g = ctx
            .data()
            .service
            .settings
            .get_server_settings(guild_id.get())
            .await?
            .greetings;

        let embed = CreateEmbed::new()
            .title("Greetings Configuration")
            .color(GREETINGS_COLOR)
            .field(
                "Welcome Messages",
                format!(
                    "Enabled: {}\nChannel: {}\nMessages: {}",
                    g.welcome_enabled,
                    channel_line(g.welcome_channel),
                    g.welcome_messages.len()
                ),
                false,
            )
            .field(
                "Farewell Messages",
                format!(
                    "Enabled: {}\nChannel: {}\nMessages: {}",
                    g.farewell_enabled,
                    channel_line(g.farewell_channel),
                    g.farewell_messages.len()
                ),
                false,
            )
            .field(
                "Welcome DMs",
                format!(
                    "Enabled: {}\nMessage: {}",
                    g.welcome_dm_enabled, g.welcome_dm_message
                ),
                false,
            );
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

impl Cog for GreetingsCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::greetings()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GreetingSettings {
        serde_json::from_str("{}").unwrap()
    }

    #[test]
    fn test_configure_without_channel_toggles() {
        let mut s = settings();
        assert!(!s.welcome_enabled);
        assert!(configure(&mut s, Greeting::Welcome, None));
        assert!(!configure(&mut s, Greeting::Welcome, None));
        assert_eq!(s.welcome_channel, None);
    }

    #[test]
    fn test_configure_with_channel_enables() {
        let mut s = settings();
        s.farewell_enabled = false;
        assert!(configure(&mut s, Greeting::Farewell, Some(42)));
        assert!(s.farewell_enabled);
        assert_eq!(s.farewell_channel, Some(42));
        assert!(!s.welcome_enabled);
    }

    #[test]
    fn test_remove_message_is_one_based() {
        let mut s = settings();
        let removed = remove_message(&mut s, Greeting::Welcome, 2).unwrap();
        assert_eq!(removed, "Hey {user}, welcome to {server}!");
        assert_eq!(s.welcome_messages.len(), 2);
    }

    #[test]
    fn test_remove_message_rejects_out_of_range() {
        let mut s = settings();
        assert!(remove_message(&mut s, Greeting::Farewell, 0).is_err());
        assert!(remove_message(&mut s, Greeting::Farewell, 4).is_err());
        s.farewell_messages.clear();
        assert!(remove_message(&mut s, Greeting::Farewell, 1).is_err());
    }
}
