//! Ends giveaways whose time is up and announces their winners.

use std::sync::Arc;

use chrono::Utc;
use log::error;
use log::info;
use log::warn;
use poise::serenity_prelude as serenity;
use serenity::ChannelId;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use serenity::CreateMessage;
use serenity::EditMessage;
use serenity::Http;
use serenity::MessageId;
use serenity::ReactionType;
use serenity::UserId;
use tokio::time::Duration;
use tokio::time::interval;

use crate::model::GiveawayModel;
use crate::service::giveaway_service::GiveawayService;
use crate::service::giveaway_service::draw_winners;

const CHECK_INTERVAL_SECS: u64 = 30;
const REACTION_PAGE: u8 = 100;

pub const GIVEAWAY_EMOJI: &str = "🎉";
pub const GIVEAWAY_COLOR: u32 = 0xFF73FA;

pub fn giveaway_reaction() -> ReactionType {
    ReactionType::Unicode(GIVEAWAY_EMOJI.to_string())
}

/// Non-bot users who reacted with the giveaway emoji.
pub async fn fetch_entrants(http: &Http, giveaway: &GiveawayModel) -> serenity::Result<Vec<u64>> {
    let channel = ChannelId::new(giveaway.channel_id);
    let message = MessageId::new(giveaway.message_id);
    let mut entrants = Vec::new();
    let mut after: Option<UserId> = None;
    loop {
        let page = channel
            .reaction_users(http, message, giveaway_reaction(), Some(REACTION_PAGE), after)
            .await?;
        let full_page = page.len() == REACTION_PAGE as usize;
        after = page.last().map(|u| u.id);
        entrants.extend(page.into_iter().filter(|u| !u.bot).map(|u| u.id.get()));
        if !full_page {
            break;
        }
    }
    Ok(entrants)
}

fn mentions(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| format!("<@{id}>"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn ended_embed(giveaway: &GiveawayModel, winners: &[u64]) -> CreateEmbed {
    let winners_text = if winners.is_empty() {
        "No valid entrants".to_string()
    } else {
        mentions(winners)
    };
    CreateEmbed::new()
        .title("🎉 GIVEAWAY ENDED 🎉")
        .description(format!(
            "**{}**\n\nWinners: {}\nHosted by: <@{}>",
            giveaway.prize, winners_text, giveaway.host_id
        ))
        .color(GIVEAWAY_COLOR)
        .footer(CreateEmbedFooter::new("Ended"))
        .timestamp(giveaway.end_time)
}

/// Draws winners, edits the giveaway message and announces the result.
///
/// Returns `None` when the giveaway was already ended elsewhere.
pub async fn conclude_giveaway(
    http: &Http,
    service: &GiveawayService,
    mut giveaway: GiveawayModel,
) -> anyhow::Result<Option<Vec<u64>>> {
    if !service.claim_end(&giveaway).await? {
        return Ok(None);
    }
    // A deleted message must not keep the giveaway due forever
    let entrants = fetch_entrants(http, &giveaway).await.unwrap_or_else(|e| {
        warn!("Could not read entrants of giveaway {}: {e}", giveaway.id);
        Vec::new()
    });
    let winners = draw_winners(&entrants, giveaway.winners.max(1) as usize);
    service.finish(&mut giveaway, winners.clone()).await?;

    let channel = ChannelId::new(giveaway.channel_id);
    channel
        .edit_message(
            http,
            MessageId::new(giveaway.message_id),
            EditMessage::new().embed(ended_embed(&giveaway, &winners)),
        )
        .await?;

    let announcement = if winners.is_empty() {
        format!(
            "No valid entrants for the giveaway of **{}**. No winners were selected.",
            giveaway.prize
        )
    } else {
        format!(
            "🎉 Congratulations {}! You won **{}**!",
            mentions(&winners),
            giveaway.prize
        )
    };
    channel
        .send_message(http, CreateMessage::new().content(announcement))
        .await?;
    Ok(Some(winners))
}

/// Draws fresh winners for an ended giveaway.
pub async fn reroll_giveaway(
    http: &Http,
    service: &GiveawayService,
    mut giveaway: GiveawayModel,
) -> anyhow::Result<Vec<u64>> {
    let entrants = fetch_entrants(http, &giveaway).await?;
    let winners = draw_winners(&entrants, giveaway.winners.max(1) as usize);
    service.finish(&mut giveaway, winners.clone()).await?;

    let channel = ChannelId::new(giveaway.channel_id);
    let announcement = if winners.is_empty() {
        "No valid entrants to reroll.".to_string()
    } else {
        format!(
            "🎉 New winner(s): {}! You won **{}**!",
            mentions(&winners),
            giveaway.prize
        )
    };
    channel
        .send_message(http, CreateMessage::new().content(announcement))
        .await?;
    Ok(winners)
}

pub struct GiveawayChecker {
    service: Arc<GiveawayService>,
    http: Arc<Http>,
}

impl GiveawayChecker {
    pub fn new(service: Arc<GiveawayService>, http: Arc<Http>) -> Self {
        Self { service, http }
    }

    pub fn start(self) {
        info!("Starting giveaway checker");
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(CHECK_INTERVAL_SECS));
            loop {
                interval.tick().await;
                let due = match self.service.due(Utc::now()).await {
                    Ok(due) => due,
                    Err(e) => {
                        error!("Failed to load due giveaways: {e}");
                        continue;
                    }
                };
                for giveaway in due {
                    let id = giveaway.id;
                    if let Err(e) = conclude_giveaway(&self.http, &self.service, giveaway).await {
                        error!("Failed to end giveaway {id}: {e:?}");
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions_join() {
        assert_eq!(mentions(&[1, 22]), "<@1>, <@22>");
        assert_eq!(mentions(&[]), "");
    }
}
