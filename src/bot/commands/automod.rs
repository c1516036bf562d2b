//! Configuration of the automatic moderator.

use log::debug;
use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::CreateEmbed;
use serenity::CreateMessage;

use crate::bot::Data;
use crate::bot::checks::guild_id;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::model::AutomodAction;
use crate::model::AutomodSettings;
use crate::model::Violation;

const AUTOMOD_COLOR: u32 = 0x3498DB;

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum Toggle {
    #[name = "enable"]
    Enable,
    #[name = "disable"]
    Disable,
}

impl Toggle {
    fn enabled(self) -> bool {
        self == Toggle::Enable
    }

    fn past_tense(self) -> &'static str {
        match self {
            Toggle::Enable => "enabled",
            Toggle::Disable => "disabled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum WordsAction {
    #[name = "list"]
    List,
    #[name = "enable"]
    Enable,
    #[name = "disable"]
    Disable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum ExemptTarget {
    #[name = "role"]
    Role,
    #[name = "channel"]
    Channel,
}

/// Parses a raw id or a role / channel mention.
pub fn parse_target_id(input: &str) -> Option<u64> {
    input
        .trim()
        .trim_start_matches("<@&")
        .trim_start_matches("<#")
        .trim_end_matches('>')
        .parse()
        .ok()
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "✅ Enabled" } else { "❌ Disabled" }
}

fn status_embed(settings: &AutomodSettings) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title("AutoMod Configuration")
        .color(AUTOMOD_COLOR)
        .field(
            "Banned Words",
            format!(
                "{} ({} words)",
                on_off(settings.banned_words.enabled),
                settings.banned_words.words.len()
            ),
            true,
        )
        .field(
            "Excessive Caps",
            format!(
                "{} (threshold {}%)",
                on_off(settings.caps.enabled),
                settings.caps.threshold
            ),
            true,
        )
        .field(
            "Spam",
            format!(
                "{} ({} messages / {}s)",
                on_off(settings.spam.enabled),
                settings.spam.limit,
                settings.spam.window_secs
            ),
            true,
        )
        .field("Links", on_off(settings.links.enabled), true)
        .field("Discord Invites", on_off(settings.invites.enabled), true);

    let roles = if settings.exempt_roles.is_empty() {
        "None".to_string()
    } else {
        settings
            .exempt_roles
            .iter()
            .map(|r| format!("<@&{r}>"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let channels = if settings.exempt_channels.is_empty() {
        "None".to_string()
    } else {
        settings
            .exempt_channels
            .iter()
            .map(|c| format!("<#{c}>"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let punishments = Violation::ALL
        .iter()
        .map(|v| format!("{}: {}", v.key(), settings.action_for(*v)))
        .collect::<Vec<_>>()
        .join("\n");
    embed = embed
        .field("Exempt Roles", roles, false)
        .field("Exempt Channels", channels, false)
        .field("Punishments", punishments, false);
    embed
}

pub struct AutomodCog;

impl AutomodCog {
    /// Configure the automatic moderator
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Automod",
        required_permissions = "ADMINISTRATOR",
        subcommands(
            "Self::status",
            "Self::filter",
            "Self::addword",
            "Self::removeword",
            "Self::caps",
            "Self::links",
            "Self::invites",
            "Self::spam",
            "Self::exempt",
            "Self::unexempt",
            "Self::punishment"
        )
    )]
    pub async fn automod(ctx: Context<'_>) -> Result<(), Error> {
        AutomodCog::show_status(ctx).await
    }

    async fn show_status(ctx: Context<'_>) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let settings = ctx
            .data()
            .service
            .settings
            .get_server_settings(guild_id.get())
            .await?;
        ctx.send(CreateReply::default().embed(status_embed(&settings.automod)))
            .await?;
        Ok(())
    }

    /// Show the automod configuration
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
        AutomodCog::show_status(ctx).await
    }

    /// Manage the banned words filter
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn filter(
        ctx: Context<'_>,
        #[description = "Filter to manage"] filter: String,
        #[description = "list, enable or disable"] action: WordsAction,
    ) -> Result<(), Error> {
        if !matches!(filter.to_lowercase().as_str(), "words" | "banned_words") {
            return Err(BotError::InvalidCommandArgument {
                parameter: "filter".to_string(),
                reason: "Only the `words` filter is managed here. Use the caps, links, invites and spam subcommands for the rest.".to_string(),
            }
            .into());
        }
        let guild_id = guild_id(ctx)?;
        let settings = &ctx.data().service.settings;

        match action {
            WordsAction::List => {
                let words = settings
                    .get_server_settings(guild_id.get())
                    .await?
                    .automod
                    .banned_words
                    .words;
                if words.is_empty() {
                    ctx.say("No banned words configured.").await?;
                    return Ok(());
                }
                let embed = CreateEmbed::new()
                    .title("Banned Words")
                    .description(
                        words
                            .iter()
                            .map(|w| format!("`{w}`"))
                            .collect::<Vec<_>>()
                            .join(", "),
                    )
                    .color(AUTOMOD_COLOR);
                let sent = match ctx.author().id.create_dm_channel(ctx.http()).await {
                    Ok(dm) => dm
                        .send_message(ctx.http(), CreateMessage::new().embed(embed))
                        .await
                        .map(|_| ()),
                    Err(e) => Err(e),
                };
                match sent {
                    Ok(()) => {
                        ctx.say("Banned words list has been sent to your DMs.").await?;
                    }
                    Err(e) => {
                        debug!("Could not DM banned words to {}: {e}", ctx.author().id);
                        ctx.say(
                            "I couldn't send you a DM. Please enable DMs from server members.",
                        )
                        .await?;
                    }
                }
            }
            WordsAction::Enable | WordsAction::Disable => {
                let enabled = action == WordsAction::Enable;
                settings
                    .modify(guild_id.get(), |s| s.automod.banned_words.enabled = enabled)
                    .await?;
                ctx.say(format!(
                    "Banned words filter has been {}.",
                    if enabled { "enabled" } else { "disabled" }
                ))
                .await?;
            }
        }
        Ok(())
    }

    /// Add a banned word
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn addword(
        ctx: Context<'_>,
        #[description = "Word to ban"]
        #[rest]
        word: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let word = word.trim().to_lowercase();
        let added = ctx
            .data()
            .service
            .settings
            .modify(guild_id.get(), |s| {
                let words = &mut s.automod.banned_words.words;
                if words.contains(&word) {
                    return false;
                }
                words.push(word.clone());
                s.automod.banned_words.enabled = true;
                true
            })
            .await?;
        if added {
            ctx.say(format!("Added `{word}` to the banned words list."))
                .await?;
        } else {
            ctx.say(format!("`{word}` is already in the banned words list."))
                .await?;
        }
        Ok(())
    }

    /// Remove a banned word
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn removeword(
        ctx: Context<'_>,
        #[description = "Word to allow again"]
        #[rest]
        word: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let word = word.trim().to_lowercase();
        let removed = ctx
            .data()
            .service
            .settings
            .modify(guild_id.get(), |s| {
                let words = &mut s.automod.banned_words.words;
                let before = words.len();
                words.retain(|w| w.to_lowercase() != word);
                words.len() != before
            })
            .await?;
        if removed {
            ctx.say(format!("Removed `{word}` from the banned words list."))
                .await?;
        } else {
            ctx.say(format!("`{word}` is not in the banned words list."))
                .await?;
        }
        Ok(())
    }

    /// Configure the excessive caps filter
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn caps(
        ctx: Context<'_>,
        #[description = "enable or disable"] toggle: Option<Toggle>,
        #[description = "Percentage of capital letters (1-100)"] threshold: Option<u8>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let settings = &ctx.data().service.settings;
        let Some(toggle) = toggle else {
            let caps = settings.get_server_settings(guild_id.get()).await?.automod.caps;
            ctx.say(format!(
                "Excessive caps filter: {}\nThreshold: {}%",
                on_off(caps.enabled),
                caps.threshold
            ))
            .await?;
            return Ok(());
        };
        if let Some(t) = threshold
            && !(1..=100).contains(&t)
        {
            return Err(BotError::InvalidCommandArgument {
                parameter: "threshold".to_string(),
                reason: "Threshold must be between 1 and 100.".to_string(),
            }
            .into());
        }
        let threshold = settings
            .modify(guild_id.get(), |s| {
                s.automod.caps.enabled = toggle.enabled();
                if let Some(t) = threshold {
                    s.automod.caps.threshold = t;
                }
                s.automod.caps.threshold
            })
            .await?;
        match toggle {
            Toggle::Enable => {
                ctx.say(format!(
                    "Excessive caps filter has been enabled with a threshold of {threshold}%."
                ))
                .await?
            }
            Toggle::Disable => ctx.say("Excessive caps filter has been disabled.").await?,
        };
        Ok(())
    }

    /// Configure the link filter
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn links(
        ctx: Context<'_>,
        #[description = "enable or disable"] toggle: Option<Toggle>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let settings = &ctx.data().service.settings;
        match toggle {
            None => {
                let enabled = settings
                    .get_server_settings(guild_id.get())
                    .await?
                    .automod
                    .links
                    .enabled;
                ctx.say(format!("Link filter: {}", on_off(enabled))).await?;
            }
            Some(toggle) => {
                settings
                    .modify(guild_id.get(), |s| s.automod.links.enabled = toggle.enabled())
                    .await?;
                ctx.say(format!("Link filter has been {}.", toggle.past_tense()))
                    .await?;
            }
        }
        Ok(())
    }

    /// Configure the Discord invite filter
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn invites(
        ctx: Context<'_>,
        #[description = "enable or disable"] toggle: Option<Toggle>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let settings = &ctx.data().service.settings;
        match toggle {
            None => {
                let enabled = settings
                    .get_server_settings(guild_id.get())
                    .await?
                    .automod
                    .invites
                    .enabled;
                ctx.say(format!("Discord invites filter: {}", on_off(enabled)))
                    .await?;
            }
            Some(toggle) => {
                settings
                    .modify(guild_id.get(), |s| s.automod.invites.enabled = toggle.enabled())
                    .await?;
                ctx.say(format!(
                    "Discord invites filter has been {}.",
                    toggle.past_tense()
                ))
                .await?;
            }
        }
        Ok(())
    }

    /// Configure the spam filter
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn spam(
        ctx: Context<'_>,
        #[description = "enable or disable"] toggle: Option<Toggle>,
        #[description = "Messages allowed in the window"] limit: Option<u32>,
        #[description = "Window length in seconds"] seconds: Option<u64>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let settings = &ctx.data().service.settings;
        let Some(toggle) = toggle else {
            let spam = settings.get_server_settings(guild_id.get()).await?.automod.spam;
            ctx.say(format!(
                "Spam filter: {}\nLimit: {} messages in {} seconds",
                on_off(spam.enabled),
                spam.limit,
                spam.window_secs
            ))
            .await?;
            return Ok(());
        };
        if limit == Some(0) || seconds == Some(0) {
            return Err(BotError::InvalidCommandArgument {
                parameter: "limit".to_string(),
                reason: "Limit and window must be positive.".to_string(),
            }
            .into());
        }
        let spam = settings
            .modify(guild_id.get(), |s| {
                let spam = &mut s.automod.spam;
                spam.enabled = toggle.enabled();
                if let Some(limit) = limit {
                    spam.limit = limit;
                }
                if let Some(seconds) = seconds {
                    spam.window_secs = seconds;
                }
                spam.clone()
            })
            .await?;
        match toggle {
            Toggle::Enable => {
                ctx.say(format!(
                    "Spam filter has been enabled: {} messages in {} seconds.",
                    spam.limit, spam.window_secs
                ))
                .await?
            }
            Toggle::Disable => ctx.say("Spam filter has been disabled.").await?,
        };
        Ok(())
    }

    /// Exempt a role or channel from automod
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn exempt(
        ctx: Context<'_>,
        #[description = "role or channel"] target_type: ExemptTarget,
        #[description = "Role or channel mention or id"] target: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let id = AutomodCog::target(&target)?;
        let added = ctx
            .data()
            .service
            .settings
            .modify(guild_id.get(), |s| {
                let list = match target_type {
                    ExemptTarget::Role => &mut s.automod.exempt_roles,
                    ExemptTarget::Channel => &mut s.automod.exempt_channels,
                };
                if list.contains(&id) {
                    return false;
                }
                list.push(id);
                true
            })
            .await?;
        let (kind, mention) = AutomodCog::describe_target(target_type, id);
        if added {
            ctx.say(format!("{kind} {mention} is now exempt from automod."))
                .await?;
        } else {
            ctx.say(format!("{kind} {mention} is already exempt from automod."))
                .await?;
        }
        Ok(())
    }

    /// Remove an automod exemption
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn unexempt(
        ctx: Context<'_>,
        #[description = "role or channel"] target_type: ExemptTarget,
        #[description = "Role or channel mention or id"] target: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let id = AutomodCog::target(&target)?;
        let removed = ctx
            .data()
            .service
            .settings
            .modify(guild_id.get(), |s| {
                let list = match target_type {
                    ExemptTarget::Role => &mut s.automod.exempt_roles,
                    ExemptTarget::Channel => &mut s.automod.exempt_channels,
                };
                let before = list.len();
                list.retain(|x| *x != id);
                list.len() != before
            })
            .await?;
        let (kind, mention) = AutomodCog::describe_target(target_type, id);
        if removed {
            ctx.say(format!("{kind} {mention} is no longer exempt from automod."))
                .await?;
        } else {
            ctx.say(format!("{kind} {mention} is not exempt from automod."))
                .await?;
        }
        Ok(())
    }

    fn target(input: &str) -> Result<u64, BotError> {
        parse_target_id(input).ok_or_else(|| BotError::InvalidCommandArgument {
            parameter: "target".to_string(),
            reason: "Please mention a role or channel, or give its id.".to_string(),
        })
    }

    fn describe_target(target_type: ExemptTarget, id: u64) -> (&'static str, String) {
        match target_type {
            ExemptTarget::Role => ("Role", format!("<@&{id}>")),
            ExemptTarget::Channel => ("Channel", format!("<#{id}>")),
        }
    }

    /// Set the action taken for a violation
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
    pub async fn punishment(
        ctx: Context<'_>,
        #[description = "banned_words, caps, links, invites or spam"] violation: String,
        #[description = "delete, warn, mute, kick or ban"] action: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let violation = Violation::from_key(&violation).ok_or_else(|| {
            BotError::InvalidCommandArgument {
                parameter: "violation".to_string(),
                reason: format!(
                    "Invalid violation type. Valid types: {}",
                    Violation::ALL.map(|v| v.key()).join(", ")
                ),
            }
        })?;
        let action: AutomodAction =
            action
                .parse()
                .map_err(|reason| BotError::InvalidCommandArgument {
                    parameter: "action".to_string(),
                    reason,
                })?;
        ctx.data()
            .service
            .settings
            .modify(guild_id.get(), |s| {
                s.automod.punishments.insert(violation, action);
            })
            .await?;
        ctx.say(format!(
            "Punishment for {} has been set to {action}.",
            violation.key()
        ))
        .await?;
        Ok(())
    }
}

impl Cog for AutomodCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::automod()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_id() {
        assert_eq!(parse_target_id("<@&42>"), Some(42));
        assert_eq!(parse_target_id("<#77>"), Some(77));
        assert_eq!(parse_target_id(" 9 "), Some(9));
        assert_eq!(parse_target_id("general"), None);
    }
}
