use std::sync::Arc;

use anyhow::Result;
use log::info;
use poise::serenity_prelude as serenity;
use serenity::UserId;

use crate::event::VoiceStateEvent;
use crate::music::player::MusicManager;
use crate::subscriber::Subscriber;

/// Drops the music player when the bot is removed from a voice channel.
pub struct VoiceStateSubscriber {
    music: Arc<MusicManager>,
    bot_id: UserId,
}

impl VoiceStateSubscriber {
    pub fn new(music: Arc<MusicManager>, bot_id: UserId) -> Self {
        Self { music, bot_id }
    }
}

#[async_trait::async_trait]
impl Subscriber<VoiceStateEvent> for VoiceStateSubscriber {
    async fn callback(&self, event: VoiceStateEvent) -> Result<()> {
        if event.new.user_id != self.bot_id || event.new.channel_id.is_some() {
            return Ok(());
        }
        let Some(guild_id) = event.new.guild_id else {
            return Ok(());
        };
        info!("Disconnected from voice in guild {guild_id}");
        self.music.handle_disconnect(&event.ctx, guild_id).await;
        Ok(())
    }
}
