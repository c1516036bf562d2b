//! Songbird-backed playback driving one [`MusicQueue`] per guild.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use log::error;
use log::warn;
use poise::serenity_prelude as serenity;
use serenity::ChannelId;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use serenity::CreateMessage;
use serenity::GuildId;
use songbird::Event;
use songbird::EventContext;
use songbird::Songbird;
use songbird::TrackEvent;
use songbird::input::YoutubeDl;
use songbird::tracks::TrackHandle;
use tokio::sync::Mutex;

use crate::music::error::MusicError;
use crate::music::queue::LoopMode;
use crate::music::queue::MusicQueue;
use crate::music::queue::Track;
use crate::music::queue::format_track_duration;
use crate::music::source::Resolver;
use crate::service::status_service::StatusService;
use crate::task::status_rotation::PresenceState;
use crate::task::status_rotation::restore_rotation;
use crate::task::status_rotation::show_now_playing;

const MUSIC_COLOR: u32 = 0x1DB954;

#[derive(Default)]
struct GuildPlayer {
    queue: MusicQueue,
    handle: Option<TrackHandle>,
    /// Bumped on every start, skip and stop so stale end events are ignored.
    generation: u64,
    text_channel: Option<ChannelId>,
}

/// What happened to a track handed to [`MusicManager::enqueue`].
#[derive(Debug, Clone)]
pub enum Enqueued {
    Started(Track),
    Queued(Track),
}

/// Read-only view of a guild's queue for rendering.
#[derive(Debug, Clone)]
pub struct QueueSnapshot {
    pub tracks: Vec<Track>,
    pub position: usize,
    pub playing: bool,
    pub loop_mode: LoopMode,
    pub volume: u8,
}

pub struct MusicManager {
    songbird: Arc<Songbird>,
    http_client: reqwest::Client,
    resolver: Arc<Resolver>,
    presence: Arc<PresenceState>,
    status: Arc<StatusService>,
    players: Mutex<HashMap<GuildId, GuildPlayer>>,
}

impl MusicManager {
    pub fn new(
        songbird: Arc<Songbird>,
        http_client: reqwest::Client,
        resolver: Arc<Resolver>,
        presence: Arc<PresenceState>,
        status: Arc<StatusService>,
    ) -> Self {
        Self {
            songbird,
            http_client,
            resolver,
            presence,
            status,
            players: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn is_connected(&self, guild_id: GuildId) -> bool {
        self.songbird.get(guild_id).is_some()
    }

    pub async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        text_channel: ChannelId,
    ) -> Result<(), MusicError> {
        self.songbird
            .join(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::JoinError(e.to_string()))?;
        self.players
            .lock()
            .await
            .entry(guild_id)
            .or_default()
            .text_channel = Some(text_channel);
        Ok(())
    }

    /// Disconnects and forgets the guild's queue.
    pub async fn leave(&self, ctx: &serenity::Context, guild_id: GuildId) -> Result<(), MusicError> {
        if self.songbird.get(guild_id).is_none() {
            return Err(MusicError::NotConnected);
        }
        self.drop_player(ctx, guild_id).await;
        self.songbird
            .remove(guild_id)
            .await
            .map_err(|e| MusicError::JoinError(e.to_string()))
    }

    /// Cleans up after the bot was disconnected from voice by someone else.
    pub async fn handle_disconnect(&self, ctx: &serenity::Context, guild_id: GuildId) {
        self.drop_player(ctx, guild_id).await;
        if self.songbird.get(guild_id).is_some()
            && let Err(e) = self.songbird.remove(guild_id).await
        {
            debug!("Failed to drop voice call for guild {guild_id}: {e}");
        }
    }

    async fn drop_player(&self, ctx: &serenity::Context, guild_id: GuildId) {
        if let Some(player) = self.players.lock().await.remove(&guild_id)
            && let Some(handle) = player.handle
        {
            let _ = handle.stop();
        }
        restore_rotation(ctx, &self.presence, &self.status).await;
    }

    /// Adds a track, starting it when nothing is playing.
    pub async fn enqueue(
        self: &Arc<Self>,
        ctx: &serenity::Context,
        guild_id: GuildId,
        text_channel: ChannelId,
        track: Track,
    ) -> Result<Enqueued, MusicError> {
        let mut players = self.players.lock().await;
        let player = players.entry(guild_id).or_default();
        player.text_channel.get_or_insert(text_channel);

        let index = player.queue.add(track.clone());
        if player.handle.is_some() {
            return Ok(Enqueued::Queued(track));
        }
        player.queue.jump_to(index);
        self.start(ctx, guild_id, player, track.clone()).await?;
        Ok(Enqueued::Started(track))
    }

    async fn start(
        self: &Arc<Self>,
        ctx: &serenity::Context,
        guild_id: GuildId,
        player: &mut GuildPlayer,
        track: Track,
    ) -> Result<(), MusicError> {
        let call = self.songbird.get(guild_id).ok_or(MusicError::NotConnected)?;
        if let Some(old) = player.handle.take() {
            let _ = old.stop();
        }
        player.generation += 1;

        debug!("Starting \"{}\" in guild {}", track.title, guild_id);
        let input = YoutubeDl::new(self.http_client.clone(), track.url.clone());
        let handle = call.lock().await.play_input(input.into());
        let _ = handle.set_volume(volume_scale(player.queue.volume));

        for event in [TrackEvent::End, TrackEvent::Error] {
            let notifier = TrackEndNotifier {
                manager: Arc::clone(self),
                ctx: ctx.clone(),
                guild_id,
                generation: player.generation,
            };
            if let Err(e) = handle.add_event(Event::Track(event), notifier) {
                warn!("Failed to register track event for guild {guild_id}: {e}");
            }
        }
        player.handle = Some(handle);

        show_now_playing(ctx, &self.presence, &track.title);
        Ok(())
    }

    /// Plays whatever `advance` picked, or wraps up when it picked nothing.
    async fn play_or_finish(
        self: &Arc<Self>,
        ctx: &serenity::Context,
        guild_id: GuildId,
        player: &mut GuildPlayer,
        track: Option<Track>,
        announce: bool,
    ) -> Result<Option<Track>, MusicError> {
        match track {
            Some(track) => {
                self.start(ctx, guild_id, player, track.clone()).await?;
                if announce && let Some(channel) = player.text_channel {
                    send_embed(ctx, channel, now_playing_embed(&track)).await;
                }
                Ok(Some(track))
            }
            None => {
                player.generation += 1;
                if let Some(handle) = player.handle.take() {
                    let _ = handle.stop();
                }
                if let Some(channel) = player.text_channel {
                    send_embed(ctx, channel, queue_finished_embed()).await;
                }
                restore_rotation(ctx, &self.presence, &self.status).await;
                Ok(None)
            }
        }
    }

    async fn on_track_end(self: &Arc<Self>, ctx: &serenity::Context, guild_id: GuildId, generation: u64) {
        let mut players = self.players.lock().await;
        let Some(player) = players.get_mut(&guild_id) else {
            return;
        };
        if player.generation != generation {
            return;
        }
        player.handle = None;
        let next = player.queue.next().cloned();
        if let Err(e) = self.play_or_finish(ctx, guild_id, player, next, true).await {
            error!("Failed to advance queue in guild {guild_id}: {e}");
        }
    }

    /// Advances past the current track. Returns the new track, if any.
    pub async fn skip(
        self: &Arc<Self>,
        ctx: &serenity::Context,
        guild_id: GuildId,
    ) -> Result<Option<Track>, MusicError> {
        let mut players = self.players.lock().await;
        let player = players
            .get_mut(&guild_id)
            .filter(|p| p.handle.is_some())
            .ok_or(MusicError::NothingPlaying)?;
        let next = player.queue.next().cloned();
        self.play_or_finish(ctx, guild_id, player, next, false).await
    }

    pub async fn previous(
        self: &Arc<Self>,
        ctx: &serenity::Context,
        guild_id: GuildId,
    ) -> Result<Track, MusicError> {
        let mut players = self.players.lock().await;
        let player = players
            .get_mut(&guild_id)
            .filter(|p| !p.queue.is_empty())
            .ok_or_else(|| MusicError::InvalidInput("Queue is empty".to_string()))?;
        let track = player
            .queue
            .previous()
            .cloned()
            .ok_or_else(|| MusicError::InvalidInput("Queue is empty".to_string()))?;
        self.start(ctx, guild_id, player, track.clone()).await?;
        Ok(track)
    }

    /// Stops playback and empties the queue.
    pub async fn stop(&self, ctx: &serenity::Context, guild_id: GuildId) -> Result<(), MusicError> {
        {
            let mut players = self.players.lock().await;
            let player = players
                .get_mut(&guild_id)
                .ok_or(MusicError::NothingPlaying)?;
            player.generation += 1;
            player.queue.clear();
            if let Some(handle) = player.handle.take() {
                let _ = handle.stop();
            }
        }
        restore_rotation(ctx, &self.presence, &self.status).await;
        Ok(())
    }

    pub async fn pause(&self, guild_id: GuildId) -> Result<(), MusicError> {
        self.with_handle(guild_id, |h| h.pause().is_ok()).await
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<(), MusicError> {
        self.with_handle(guild_id, |h| h.play().is_ok()).await
    }

    async fn with_handle(
        &self,
        guild_id: GuildId,
        f: impl FnOnce(&TrackHandle) -> bool,
    ) -> Result<(), MusicError> {
        let players = self.players.lock().await;
        let handle = players
            .get(&guild_id)
            .and_then(|p| p.handle.as_ref())
            .ok_or(MusicError::NothingPlaying)?;
        if f(handle) {
            Ok(())
        } else {
            Err(MusicError::NothingPlaying)
        }
    }

    /// Jumps within the current track.
    pub async fn seek(&self, guild_id: GuildId, position: Duration) -> Result<(), MusicError> {
        let handle = {
            let players = self.players.lock().await;
            players
                .get(&guild_id)
                .and_then(|p| p.handle.clone())
                .ok_or(MusicError::NothingPlaying)?
        };
        handle
            .seek_async(position)
            .await
            .map(|_| ())
            .map_err(|e| MusicError::SourceError(e.to_string()))
    }

    pub async fn now_playing(&self, guild_id: GuildId) -> Option<Track> {
        let players = self.players.lock().await;
        let player = players.get(&guild_id)?;
        player.handle.as_ref()?;
        player.queue.current().cloned()
    }

    pub async fn snapshot(&self, guild_id: GuildId) -> QueueSnapshot {
        let players = self.players.lock().await;
        match players.get(&guild_id) {
            Some(p) => QueueSnapshot {
                tracks: p.queue.tracks().to_vec(),
                position: p.queue.position(),
                playing: p.handle.is_some(),
                loop_mode: p.queue.loop_mode,
                volume: p.queue.volume,
            },
            None => {
                let queue = MusicQueue::new();
                QueueSnapshot {
                    tracks: Vec::new(),
                    position: 0,
                    playing: false,
                    loop_mode: queue.loop_mode,
                    volume: queue.volume,
                }
            }
        }
    }

    pub async fn clear(&self, guild_id: GuildId) {
        if let Some(player) = self.players.lock().await.get_mut(&guild_id) {
            player.queue.clear();
        }
    }

    /// Removes by zero-based index.
    pub async fn remove(&self, guild_id: GuildId, index: usize) -> Result<Track, MusicError> {
        self.players
            .lock()
            .await
            .get_mut(&guild_id)
            .and_then(|p| p.queue.remove(index))
            .ok_or_else(|| MusicError::InvalidInput("Invalid track number".to_string()))
    }

    pub async fn shuffle(&self, guild_id: GuildId) {
        if let Some(player) = self.players.lock().await.get_mut(&guild_id) {
            player.queue.shuffle();
        }
    }

    pub async fn set_loop_mode(&self, guild_id: GuildId, mode: LoopMode) {
        self.players
            .lock()
            .await
            .entry(guild_id)
            .or_default()
            .queue
            .loop_mode = mode;
    }

    pub async fn set_volume(&self, guild_id: GuildId, volume: u8) -> Result<(), MusicError> {
        if volume > 100 {
            return Err(MusicError::InvalidInput(
                "Volume must be between 0 and 100".to_string(),
            ));
        }
        let mut players = self.players.lock().await;
        let player = players.entry(guild_id).or_default();
        player.queue.volume = volume;
        if let Some(handle) = &player.handle {
            let _ = handle.set_volume(volume_scale(volume));
        }
        Ok(())
    }
}

fn volume_scale(volume: u8) -> f32 {
    f32::from(volume) / 100.0
}

struct TrackEndNotifier {
    manager: Arc<MusicManager>,
    ctx: serenity::Context,
    guild_id: GuildId,
    generation: u64,
}

#[async_trait]
impl songbird::EventHandler for TrackEndNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        self.manager
            .on_track_end(&self.ctx, self.guild_id, self.generation)
            .await;
        None
    }
}

async fn send_embed(ctx: &serenity::Context, channel: ChannelId, embed: CreateEmbed) {
    if let Err(e) = channel
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await
    {
        warn!("Failed to send music message to {channel}: {e}");
    }
}

pub fn now_playing_embed(track: &Track) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title("Now Playing")
        .description(format!("[{}]({})", track.title, track.url))
        .color(MUSIC_COLOR)
        .field(
            "Duration",
            track
                .duration
                .map(format_track_duration)
                .unwrap_or_else(|| "Unknown".to_string()),
            true,
        )
        .field(
            "Channel",
            track.uploader.clone().unwrap_or_else(|| "Unknown".to_string()),
            true,
        );
    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    embed
}

fn queue_finished_embed() -> CreateEmbed {
    CreateEmbed::new()
        .title("Queue Empty")
        .description("Playback finished.")
        .color(MUSIC_COLOR)
        .footer(CreateEmbedFooter::new("Use !play to add more songs"))
}
