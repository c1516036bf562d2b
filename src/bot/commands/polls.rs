//! Button polls plus reaction based quick votes.

use chrono::Utc;
use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::ButtonStyle;
use serenity::ChannelId;
use serenity::ComponentInteraction;
use serenity::CreateActionRow;
use serenity::CreateButton;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use serenity::CreateInteractionResponse;
use serenity::CreateInteractionResponseMessage;
use serenity::EditMessage;
use serenity::MessageId;
use serenity::Permissions;
use serenity::ReactionType;

use crate::bot::Data;
use crate::bot::checks::author_permissions;
use crate::bot::checks::guild_id;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::model::PollModel;
use crate::service::error::ServiceError;
use crate::service::poll_service::leaders;
use crate::service::poll_service::parse_options;
use crate::service::poll_service::tally;
use crate::service::poll_service::validate_options;

pub const POLL_OPTION_PREFIX: &str = "poll_option_";

const POLL_COLOR: u32 = 0x3498DB;
const RESULT_COLOR: u32 = 0x2ECC71;
const BUTTONS_PER_ROW: usize = 5;
const BUTTON_LABEL_MAX: usize = 80;
const NUMBER_EMOJIS: [&str; 10] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣", "🔟"];
const VOTE_EMOJIS: [&str; 3] = ["👍", "👎", "🤷"];

fn votes_label(n: usize) -> String {
    format!("{n} vote{}", if n == 1 { "" } else { "s" })
}

/// Option index encoded in a poll button id.
pub fn option_index(custom_id: &str) -> Option<usize> {
    custom_id.strip_prefix(POLL_OPTION_PREFIX)?.parse().ok()
}

fn poll_embed(question: &str, options: &[String], counts: &[usize]) -> CreateEmbed {
    let lines = options
        .iter()
        .zip(counts)
        .map(|(option, count)| format!("**{option}**: {}", votes_label(*count)))
        .collect::<Vec<_>>()
        .join("\n");
    CreateEmbed::new()
        .title(format!("📊 Poll: {question}"))
        .description(format!(
            "Vote by clicking on one of the options below.\n\n{lines}"
        ))
        .color(POLL_COLOR)
}

fn poll_buttons(options: &[String]) -> Vec<CreateActionRow> {
    let buttons: Vec<CreateButton> = options
        .iter()
        .enumerate()
        .map(|(i, option)| {
            CreateButton::new(format!("{POLL_OPTION_PREFIX}{i}"))
                .label(option.chars().take(BUTTON_LABEL_MAX).collect::<String>())
                .style(ButtonStyle::Primary)
        })
        .collect();
    buttons
        .chunks(BUTTONS_PER_ROW)
        .map(|row| CreateActionRow::Buttons(row.to_vec()))
        .collect()
}

fn results_embed(poll: &PollModel, ended_by: &str) -> CreateEmbed {
    let options = &poll.options.0;
    let counts = tally(options.len(), &poll.votes.0);
    let winners = leaders(&counts);
    let lines = options
        .iter()
        .zip(&counts)
        .enumerate()
        .map(|(i, (option, count))| {
            let crown = if winners.contains(&i) { " 👑" } else { "" };
            format!("**{option}**: {}{crown}", votes_label(*count))
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut embed = CreateEmbed::new()
        .title(format!("📊 Poll Results: {}", poll.question))
        .description(lines)
        .color(RESULT_COLOR)
        .timestamp(Utc::now())
        .footer(CreateEmbedFooter::new(format!("Poll ended by {ended_by}")));
    match winners.as_slice() {
        [] => {
            embed = embed.field("No Votes", "No one voted in this poll.", false);
        }
        [winner] => {
            embed = embed.field(
                "Winner",
                format!(
                    "**{}** with {}!",
                    options[*winner],
                    votes_label(counts[*winner])
                ),
                false,
            );
        }
        tied => {
            let names = tied
                .iter()
                .map(|i| options[*i].as_str())
                .collect::<Vec<_>>()
                .join(", ");
            embed = embed.field(
                "Tie",
                format!(
                    "It's a tie between **{names}** with {} each!",
                    votes_label(counts[tied[0]])
                ),
                false,
            );
        }
    }
    embed
}

/// Records a button vote and refreshes the poll message.
pub async fn handle_vote(
    ctx: &serenity::Context,
    data: &Data,
    component: &ComponentInteraction,
    option: usize,
) -> Result<(), Error> {
    let result = data
        .service
        .poll
        .vote(component.message.id.get(), component.user.id.get(), option)
        .await;
    let response = match result {
        Ok(poll) => {
            let counts = tally(poll.options.0.len(), &poll.votes.0);
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new().embed(poll_embed(
                    &poll.question,
                    &poll.options.0,
                    &counts,
                )),
            )
        }
        Err(e @ (ServiceError::Forbidden(_)
        | ServiceError::NotFound(_)
        | ServiceError::InvalidArgument(_))) => CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(e.to_string())
                .ephemeral(true),
        ),
        Err(e) => return Err(e.into()),
    };
    component.create_response(&ctx.http, response).await?;
    Ok(())
}

pub struct PollsCog;

impl PollsCog {
    /// Create and manage polls
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Polls",
        subcommands("Self::create", "Self::end", "Self::list"),
        subcommand_required
    )]
    pub async fn poll(_ctx: Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// Start a button poll
    #[poise::command(prefix_command, slash_command, guild_only)]
    pub async fn create(
        ctx: Context<'_>,
        #[description = "The question"] question: String,
        #[description = "Options separated by |"]
        #[rest]
        options: String,
    ) -> Result<(), Error> {
        PollsCog::start_poll(ctx, question, parse_options(&options)).await
    }

    async fn start_poll(ctx: Context<'_>, question: String, options: Vec<String>) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        validate_options(&options)?;
        let counts = vec![0; options.len()];
        let reply = ctx
            .send(
                CreateReply::default()
                    .embed(poll_embed(&question, &options, &counts))
                    .components(poll_buttons(&options)),
            )
            .await?;
        let message = reply.message().await?;
        ctx.data()
            .service
            .poll
            .create(
                message.id.get(),
                guild_id.get(),
                ctx.channel_id().get(),
                ctx.author().id.get(),
                &question,
                options,
            )
            .await?;
        Ok(())
    }

    /// End a poll and show the results
    #[poise::command(prefix_command, slash_command, guild_only)]
    pub async fn end(
        ctx: Context<'_>,
        #[description = "Message id of the poll"] message_id: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let message_id: u64 = message_id.trim().parse().map_err(|_| {
            BotError::InvalidCommandArgument {
                parameter: "message_id".to_string(),
                reason: "Poll not found. Make sure you're using the correct message ID."
                    .to_string(),
            }
        })?;
        let can_manage = author_permissions(ctx)
            .await?
            .contains(Permissions::MANAGE_MESSAGES);
        let poll = ctx
            .data()
            .service
            .poll
            .end(guild_id.get(), message_id, ctx.author().id.get(), can_manage)
            .await?;

        let ended_by = ctx.author().name.clone();
        ChannelId::new(poll.channel_id)
            .edit_message(
                ctx.http(),
                MessageId::new(poll.message_id),
                EditMessage::new()
                    .embed(results_embed(&poll, &ended_by))
                    .components(Vec::new()),
            )
            .await?;
        ctx.say("Poll ended and results displayed.").await?;
        Ok(())
    }

    /// List active polls
    #[poise::command(prefix_command, slash_command, guild_only)]
    pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let polls = ctx.data().service.poll.active(guild_id.get()).await?;
        if polls.is_empty() {
            ctx.say("No active polls in this server.").await?;
            return Ok(());
        }
        let mut embed = CreateEmbed::new().title("Active Polls").color(POLL_COLOR);
        for poll in &polls {
            let votes = poll.votes.0.len();
            embed = embed.field(
                poll.question.clone(),
                format!(
                    "Created by <@{}> <t:{}:R>\n{} | [Jump](https://discord.com/channels/{}/{}/{})\nID: `{}`",
                    poll.creator_id,
                    poll.created_at.timestamp(),
                    votes_label(votes),
                    poll.guild_id,
                    poll.channel_id,
                    poll.message_id,
                    poll.message_id
                ),
                false,
            );
        }
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Yes / No poll
    #[poise::command(prefix_command, slash_command, guild_only, category = "Polls")]
    pub async fn quickpoll(
        ctx: Context<'_>,
        #[description = "The question"]
        #[rest]
        question: String,
    ) -> Result<(), Error> {
        PollsCog::start_poll(ctx, question, vec!["Yes".to_string(), "No".to_string()]).await
    }

    /// Reaction vote with 👍 👎 🤷
    #[poise::command(prefix_command, slash_command, category = "Polls")]
    pub async fn vote(
        ctx: Context<'_>,
        #[description = "The question"]
        #[rest]
        question: String,
    ) -> Result<(), Error> {
        let embed = CreateEmbed::new()
            .title("🗳️ Vote")
            .description(question)
            .color(POLL_COLOR)
            .footer(CreateEmbedFooter::new(format!(
                "Vote started by {}",
                ctx.author().name
            )));
        let message = ctx
            .send(CreateReply::default().embed(embed))
            .await?
            .into_message()
            .await?;
        for emoji in VOTE_EMOJIS {
            message
                .react(ctx.http(), ReactionType::Unicode(emoji.to_string()))
                .await?;
        }
        Ok(())
    }

    /// Reaction poll with numbered options
    #[poise::command(prefix_command, slash_command, category = "Polls")]
    pub async fn strawpoll(
        ctx: Context<'_>,
        #[description = "Poll title"] title: String,
        #[description = "Options separated by |"]
        #[rest]
        options: String,
    ) -> Result<(), Error> {
        let options = parse_options(&options);
        validate_options(&options)?;
        let mut embed = CreateEmbed::new()
            .title(format!("🗳️ {title}"))
            .description("React with the corresponding emoji to vote!")
            .color(POLL_COLOR)
            .footer(CreateEmbedFooter::new(format!(
                "Strawpoll by {}",
                ctx.author().name
            )));
        for (emoji, option) in NUMBER_EMOJIS.iter().zip(&options) {
            embed = embed.field(format!("{emoji} {option}"), "\u{200b}", false);
        }
        let message = ctx
            .send(CreateReply::default().embed(embed))
            .await?
            .into_message()
            .await?;
        for emoji in NUMBER_EMOJIS.iter().take(options.len()) {
            message
                .react(ctx.http(), ReactionType::Unicode(emoji.to_string()))
                .await?;
        }
        Ok(())
    }
}

impl Cog for PollsCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![
            Self::poll(),
            Self::quickpoll(),
            Self::vote(),
            Self::strawpoll(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_index() {
        assert_eq!(option_index("poll_option_3"), Some(3));
        assert_eq!(option_index("poll_option_x"), None);
        assert_eq!(option_index("create_ticket"), None);
    }

    #[test]
    fn test_votes_label_plural() {
        assert_eq!(votes_label(1), "1 vote");
        assert_eq!(votes_label(0), "0 votes");
    }

    #[test]
    fn test_poll_buttons_wrap_rows() {
        let options: Vec<String> = (0..7).map(|i| i.to_string()).collect();
        assert_eq!(poll_buttons(&options).len(), 2);
    }
}
