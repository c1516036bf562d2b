//! Reaction giveaways with timed draws.

use chrono::Utc;
use log::warn;
use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::ChannelId;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use serenity::EditMessage;
use serenity::MessageId;

use crate::bot::Data;
use crate::bot::checks::guild_id;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::service::giveaway_service::GiveawayService;
use crate::task::giveaway_checker::GIVEAWAY_COLOR;
use crate::task::giveaway_checker::conclude_giveaway;
use crate::task::giveaway_checker::giveaway_reaction;
use crate::task::giveaway_checker::reroll_giveaway;

fn parse_message_id(input: &str) -> Result<u64, BotError> {
    input
        .trim()
        .parse()
        .map_err(|_| BotError::InvalidCommandArgument {
            parameter: "message_id".to_string(),
            reason: "Please provide a valid message ID.".to_string(),
        })
}

pub struct GiveawaysCog;

impl GiveawaysCog {
    /// Run giveaways
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Giveaways",
        required_permissions = "MANAGE_GUILD",
        subcommands(
            "Self::start",
            "Self::end",
            "Self::reroll",
            "Self::list",
            "Self::cancel"
        ),
        subcommand_required
    )]
    pub async fn giveaway(_ctx: Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// Start a giveaway
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
    pub async fn start(
        ctx: Context<'_>,
        #[description = "Duration such as 1d12h30m"] duration: String,
        #[description = "Number of winners"] winners: i64,
        #[description = "Prize"]
        #[rest]
        prize: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let end_time = GiveawayService::validate_start(&duration, winners, Utc::now())?;

        let embed = CreateEmbed::new()
            .title("🎉 GIVEAWAY 🎉")
            .description(format!(
                "**{prize}**\n\nReact with 🎉 to enter!\nEnds: <t:{0}:R> (<t:{0}:F>)\nHosted by: <@{1}>",
                end_time.timestamp(),
                ctx.author().id
            ))
            .color(GIVEAWAY_COLOR)
            .footer(CreateEmbedFooter::new(format!(
                "{winners} winner{} | Ends at",
                if winners == 1 { "" } else { "s" }
            )))
            .timestamp(end_time);
        let message = ctx
            .send(CreateReply::default().embed(embed))
            .await?
            .into_message()
            .await?;
        message.react(ctx.http(), giveaway_reaction()).await?;

        ctx.data()
            .service
            .giveaway
            .create(
                message.id.get(),
                guild_id.get(),
                ctx.channel_id().get(),
                ctx.author().id.get(),
                &prize,
                winners,
                end_time,
            )
            .await?;
        Ok(())
    }

    /// End a giveaway now
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
    pub async fn end(
        ctx: Context<'_>,
        #[description = "Message id of the giveaway"] message_id: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let service = &ctx.data().service.giveaway;
        let giveaway = service
            .get(guild_id.get(), parse_message_id(&message_id)?)
            .await?;
        if giveaway.ended {
            ctx.say("This giveaway has already ended.").await?;
            return Ok(());
        }
        match conclude_giveaway(ctx.http(), service, giveaway).await? {
            None => ctx.say("This giveaway has already ended.").await?,
            Some(winners) if winners.is_empty() => {
                ctx.say("Giveaway ended with no valid entrants.").await?
            }
            Some(_) => ctx.say("Giveaway ended.").await?,
        };
        Ok(())
    }

    /// Draw new winners for an ended giveaway
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
    pub async fn reroll(
        ctx: Context<'_>,
        #[description = "Message id of the giveaway"] message_id: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let service = &ctx.data().service.giveaway;
        let giveaway = service
            .get(guild_id.get(), parse_message_id(&message_id)?)
            .await?;
        if !giveaway.ended {
            ctx.say("This giveaway hasn't ended yet.").await?;
            return Ok(());
        }
        reroll_giveaway(ctx.http(), service, giveaway).await?;
        Ok(())
    }

    /// List active giveaways
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
    pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let giveaways = ctx.data().service.giveaway.active(guild_id.get()).await?;
        if giveaways.is_empty() {
            ctx.say("There are no active giveaways in this server.").await?;
            return Ok(());
        }
        let mut embed = CreateEmbed::new()
            .title("Active Giveaways")
            .color(GIVEAWAY_COLOR);
        for g in &giveaways {
            embed = embed.field(
                g.prize.clone(),
                format!(
                    "Ends <t:{}:R> | {} winner(s) | Hosted by <@{}>\n[Jump](https://discord.com/channels/{}/{}/{})\nID: `{}`",
                    g.end_time.timestamp(),
                    g.winners,
                    g.host_id,
                    g.guild_id,
                    g.channel_id,
                    g.message_id,
                    g.message_id
                ),
                false,
            );
        }
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Cancel a giveaway without drawing winners
    #[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
    pub async fn cancel(
        ctx: Context<'_>,
        #[description = "Message id of the giveaway"] message_id: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let service = &ctx.data().service.giveaway;
        let giveaway = service
            .get(guild_id.get(), parse_message_id(&message_id)?)
            .await?;

        let embed = CreateEmbed::new()
            .title("🎉 GIVEAWAY CANCELLED 🎉")
            .description(format!(
                "**{}**\n\nThis giveaway has been cancelled by <@{}>.",
                giveaway.prize,
                ctx.author().id
            ))
            .color(GIVEAWAY_COLOR);
        if let Err(e) = ChannelId::new(giveaway.channel_id)
            .edit_message(
                ctx.http(),
                MessageId::new(giveaway.message_id),
                EditMessage::new().embed(embed),
            )
            .await
        {
            warn!("Failed to mark giveaway {} as cancelled: {e}", giveaway.id);
        }
        service.delete(&giveaway).await?;
        ctx.say("Giveaway cancelled.").await?;
        Ok(())
    }
}

impl Cog for GiveawaysCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::giveaway()]
    }
}
