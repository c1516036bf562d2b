/// Delivers reminders once they come due.
use std::sync::Arc;

use chrono::Utc;
use log::debug;
use log::error;
use log::info;
use poise::serenity_prelude as serenity;
use serenity::ChannelId;
use serenity::CreateEmbed;
use serenity::CreateMessage;
use serenity::Http;
use serenity::UserId;
use tokio::time::Duration;
use tokio::time::interval;

use crate::model::ReminderModel;
use crate::service::reminder_service::ReminderService;

const CHECK_INTERVAL_SECS: u64 = 30;
pub const REMINDER_COLOR: u32 = 0x3498DB;

fn reminder_embed(reminder: &ReminderModel) -> CreateEmbed {
    CreateEmbed::new()
        .title("⏰ Reminder")
        .description(&reminder.content)
        .color(REMINDER_COLOR)
        .field(
            "Set",
            format!("<t:{}:R>", reminder.created_at.timestamp()),
            true,
        )
        .timestamp(reminder.due_at)
}

/// Public reminders go to the channel; private ones to DMs, falling back to the channel.
async fn deliver(http: &Http, reminder: &ReminderModel) -> serenity::Result<()> {
    let channel = ChannelId::new(reminder.channel_id);
    let mention = format!("<@{}>", reminder.user_id);

    if !reminder.public {
        let dm = UserId::new(reminder.user_id)
            .direct_message(http, CreateMessage::new().embed(reminder_embed(reminder)))
            .await;
        match dm {
            Ok(_) => return Ok(()),
            Err(e) => debug!(
                "Could not DM reminder {} to {}: {e}",
                reminder.id, reminder.user_id
            ),
        }
    }
    channel
        .send_message(
            http,
            CreateMessage::new()
                .content(mention)
                .embed(reminder_embed(reminder)),
        )
        .await?;
    Ok(())
}

pub struct ReminderChecker {
    service: Arc<ReminderService>,
    http: Arc<Http>,
}

impl ReminderChecker {
    pub fn new(service: Arc<ReminderService>, http: Arc<Http>) -> Self {
        Self { service, http }
    }

    pub fn start(self) {
        info!("Starting reminder checker");
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(CHECK_INTERVAL_SECS));
            loop {
                interval.tick().await;
                let due = match self.service.due(Utc::now()).await {
                    Ok(due) => due,
                    Err(e) => {
                        error!("Failed to load due reminders: {e}");
                        continue;
                    }
                };
                for reminder in due {
                    if let Err(e) = deliver(&self.http, &reminder).await {
                        error!("Failed to deliver reminder {}: {e}", reminder.id);
                    }
                    // Completed even when delivery failed
                    if let Err(e) = self.service.mark_completed(reminder.id).await {
                        error!("Failed to complete reminder {}: {e}", reminder.id);
                    }
                }
            }
        });
    }
}
