//! Voice playback commands.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use log::warn;
use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::ChannelId;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use serenity::CreateMessage;
use serenity::GuildId;
use serenity::Mentionable;

use crate::bot::Data;
use crate::bot::checks::author_voice_channel;
use crate::bot::checks::guild_id;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::bot::utils::PAGE_SIZE;
use crate::bot::utils::page_bounds;
use crate::bot::utils::parse_timestamp;
use crate::music::error::MusicError;
use crate::music::player::Enqueued;
use crate::music::player::MusicManager;
use crate::music::player::now_playing_embed;
use crate::music::queue::LoopMode;
use crate::music::queue::format_track_duration;
use crate::music::source::BACKGROUND_SPACING;
use crate::music::source::Query;
use crate::music::source::Target;

const QUEUE_COLOR: u32 = 0x3498DB;

const HELP_ENTRIES: [(&str, &str); 16] = [
    ("join", "Join your voice channel"),
    ("leave", "Leave the voice channel"),
    ("play", "Play a song or add it to the queue"),
    ("pause", "Pause the current track"),
    ("resume", "Resume the current track"),
    ("skip", "Skip the current track"),
    ("previous", "Play the previous track"),
    ("nowplaying", "Show information about the current track"),
    ("queue", "Show the current queue"),
    ("clear", "Clear the music queue"),
    ("remove", "Remove a track from the queue"),
    ("shuffle", "Shuffle the queue"),
    ("loop", "Set loop mode (off, single, queue)"),
    ("volume", "Set the volume (0-100)"),
    ("seek", "Seek to a position in the current track (MM:SS)"),
    ("stop", "Stop playback and clear the queue"),
];

/// Loads the remaining entries of a playlist without blocking the command.
fn spawn_background_load(
    ctx: serenity::Context,
    music: Arc<MusicManager>,
    guild_id: GuildId,
    channel_id: ChannelId,
    targets: Vec<Target>,
) {
    tokio::spawn(async move {
        let total = targets.len();
        let mut added = 0;
        for target in targets {
            tokio::time::sleep(BACKGROUND_SPACING).await;
            if !music.is_connected(guild_id) {
                debug!("Stopped background load for guild {guild_id}: disconnected");
                return;
            }
            let track = match music.resolver().loader().load(&target).await {
                Ok(track) => track,
                Err(e) => {
                    warn!("Skipping playlist entry {target:?}: {e}");
                    continue;
                }
            };
            match music.enqueue(&ctx, guild_id, channel_id, track).await {
                Ok(Enqueued::Started(track)) => {
                    let message = CreateMessage::new().embed(now_playing_embed(&track));
                    if let Err(e) = channel_id.send_message(&ctx.http, message).await {
                        warn!("Failed to announce track in {channel_id}: {e}");
                    }
                    added += 1;
                }
                Ok(Enqueued::Queued(_)) => added += 1,
                Err(e) => warn!("Failed to queue playlist entry in guild {guild_id}: {e}"),
            }
        }
        debug!("Background load for guild {guild_id} added {added}/{total} tracks");
    });
}

pub struct MusicCog;

impl MusicCog {
    /// Join your voice channel
    #[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
    pub async fn join(ctx: Context<'_>) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let channel = author_voice_channel(ctx)?;
        ctx.data()
            .music
            .join(guild_id, channel, ctx.channel_id())
            .await?;
        ctx.say(format!("Joined {}", channel.mention())).await?;
        Ok(())
    }

    /// Leave the voice channel
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Music",
        aliases("disconnect", "dc")
    )]
    pub async fn leave(ctx: Context<'_>) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        ctx.data()
            .music
            .leave(ctx.serenity_context(), guild_id)
            .await?;
        ctx.say("👋 Disconnected from the voice channel.").await?;
        Ok(())
    }

    /// Play a song or add it to the queue
    #[poise::command(prefix_command, slash_command, guild_only, category = "Music", aliases("p"))]
    pub async fn play(
        ctx: Context<'_>,
        #[description = "Search terms, YouTube or Spotify url"]
        #[rest]
        query: String,
    ) -> Result<(), Error> {
        if query.trim().is_empty() {
            return Err(BotError::InvalidCommandArgument {
                parameter: "query".to_string(),
                reason: "Please provide a song to play.".to_string(),
            }
            .into());
        }
        let guild_id = guild_id(ctx)?;
        let channel = author_voice_channel(ctx)?;
        let music = Arc::clone(&ctx.data().music);

        if !music.is_connected(guild_id) {
            music.join(guild_id, channel, ctx.channel_id()).await?;
            ctx.say(format!("Joined {}", channel.mention())).await?;
        }
        ctx.defer().await?;

        let query = Query::parse(&query);
        if let Some(notice) = query.loading_notice() {
            ctx.say(notice).await?;
        }
        let mut targets = music.resolver().targets(&query).await?.into_iter();
        let first = targets
            .next()
            .ok_or_else(|| MusicError::SourceError("No results found for your query.".to_string()))?;
        let track = music.resolver().loader().load(&first).await?;

        match music
            .enqueue(ctx.serenity_context(), guild_id, ctx.channel_id(), track)
            .await?
        {
            Enqueued::Started(track) => {
                ctx.send(CreateReply::default().embed(now_playing_embed(&track)))
                    .await?;
            }
            Enqueued::Queued(track) => {
                ctx.say(format!("Added **{}** to the queue", track.title))
                    .await?;
            }
        }

        let rest: Vec<Target> = targets.collect();
        if !rest.is_empty() {
            ctx.say(format!(
                "Loading the remaining {} tracks in the background...",
                rest.len()
            ))
            .await?;
            spawn_background_load(
                ctx.serenity_context().clone(),
                music,
                guild_id,
                ctx.channel_id(),
                rest,
            );
        }
        Ok(())
    }

    /// Pause the current track
    #[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
    pub async fn pause(ctx: Context<'_>) -> Result<(), Error> {
        ctx.data().music.pause(guild_id(ctx)?).await?;
        ctx.say("⏸️ Paused the current track").await?;
        Ok(())
    }

    /// Resume the current track
    #[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
    pub async fn resume(ctx: Context<'_>) -> Result<(), Error> {
        ctx.data().music.resume(guild_id(ctx)?).await?;
        ctx.say("▶️ Resumed the current track").await?;
        Ok(())
    }

    /// Skip the current track
    #[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
    pub async fn skip(ctx: Context<'_>) -> Result<(), Error> {
        let next = ctx
            .data()
            .music
            .skip(ctx.serenity_context(), guild_id(ctx)?)
            .await?;
        match next {
            Some(track) => {
                ctx.send(
                    CreateReply::default()
                        .content("⏭️ Skipped to next track")
                        .embed(now_playing_embed(&track)),
                )
                .await?;
            }
            None => {
                ctx.say("⏭️ Skipped. Nothing left in the queue.").await?;
            }
        }
        Ok(())
    }

    /// Play the previous track
    #[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
    pub async fn previous(ctx: Context<'_>) -> Result<(), Error> {
        let track = ctx
            .data()
            .music
            .previous(ctx.serenity_context(), guild_id(ctx)?)
            .await?;
        ctx.send(
            CreateReply::default()
                .content("⏮️ Playing previous track")
                .embed(now_playing_embed(&track)),
        )
        .await?;
        Ok(())
    }

    /// Show the current track
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Music",
        aliases("np")
    )]
    pub async fn nowplaying(ctx: Context<'_>) -> Result<(), Error> {
        match ctx.data().music.now_playing(guild_id(ctx)?).await {
            Some(track) => {
                ctx.send(CreateReply::default().embed(now_playing_embed(&track)))
                    .await?;
            }
            None => {
                ctx.say("No song is currently playing").await?;
            }
        }
        Ok(())
    }

    /// Show the queue
    #[poise::command(prefix_command, slash_command, guild_only, category = "Music", aliases("q"))]
    pub async fn queue(
        ctx: Context<'_>,
        #[description = "Page number"] page: Option<u32>,
    ) -> Result<(), Error> {
        let snapshot = ctx.data().music.snapshot(guild_id(ctx)?).await;
        if snapshot.tracks.is_empty() {
            ctx.say("The queue is empty").await?;
            return Ok(());
        }

        let (offset, pages) = page_bounds(page, snapshot.tracks.len() as u32)?;
        let page = offset / PAGE_SIZE + 1;
        let mut embed = CreateEmbed::new()
            .title("Music Queue")
            .description(format!(
                "Total tracks: {} | Loop: {} | Volume: {}%",
                snapshot.tracks.len(),
                snapshot.loop_mode,
                snapshot.volume
            ))
            .color(QUEUE_COLOR);
        for (i, track) in snapshot
            .tracks
            .iter()
            .enumerate()
            .skip(offset as usize)
            .take(PAGE_SIZE as usize)
        {
            let status = if i == snapshot.position && snapshot.playing {
                "🔊 Now Playing".to_string()
            } else {
                format!("#{}", i + 1)
            };
            let duration = track
                .duration
                .map(format_track_duration)
                .unwrap_or_else(|| "Unknown".to_string());
            embed = embed.field(
                status,
                format!("[{}]({}) | {duration}", track.title, track.url),
                false,
            );
        }
        embed = embed.footer(CreateEmbedFooter::new(format!(
            "Page {page}/{pages} | Use {}queue <page> to navigate",
            ctx.prefix()
        )));
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Clear the queue
    #[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
    pub async fn clear(ctx: Context<'_>) -> Result<(), Error> {
        ctx.data().music.clear(guild_id(ctx)?).await;
        ctx.say("Cleared the queue").await?;
        Ok(())
    }

    /// Remove a track from the queue
    #[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
    pub async fn remove(
        ctx: Context<'_>,
        #[description = "Track number as shown in the queue"] index: usize,
    ) -> Result<(), Error> {
        let zero_based = index
            .checked_sub(1)
            .ok_or_else(|| MusicError::InvalidInput("Invalid track number".to_string()))?;
        let track = ctx.data().music.remove(guild_id(ctx)?, zero_based).await?;
        ctx.say(format!("Removed track #{index}: **{}**", track.title))
            .await?;
        Ok(())
    }

    /// Shuffle the upcoming tracks
    #[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
    pub async fn shuffle(ctx: Context<'_>) -> Result<(), Error> {
        ctx.data().music.shuffle(guild_id(ctx)?).await;
        ctx.say("🔀 Shuffled the queue").await?;
        Ok(())
    }

    /// Show or set the loop mode
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Music",
        rename = "loop"
    )]
    pub async fn loop_mode(
        ctx: Context<'_>,
        #[description = "off, single or queue"] mode: Option<String>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let Some(mode) = mode else {
            let current = ctx.data().music.snapshot(guild_id).await.loop_mode;
            ctx.say(format!("Current loop mode: {current}")).await?;
            return Ok(());
        };
        let mode: LoopMode = mode.parse()?;
        ctx.data().music.set_loop_mode(guild_id, mode).await;
        ctx.say(format!("🔁 Set loop mode to '{mode}'")).await?;
        Ok(())
    }

    /// Show or set the volume
    #[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
    pub async fn volume(
        ctx: Context<'_>,
        #[description = "Volume between 0 and 100"] volume: Option<u8>,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let Some(volume) = volume else {
            let current = ctx.data().music.snapshot(guild_id).await.volume;
            ctx.say(format!("Current volume: {current}%")).await?;
            return Ok(());
        };
        ctx.data().music.set_volume(guild_id, volume).await?;
        ctx.say(format!("🔊 Set volume to {volume}%")).await?;
        Ok(())
    }

    /// Jump to a position in the current track
    #[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
    pub async fn seek(
        ctx: Context<'_>,
        #[description = "Position as MM:SS"] position: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let secs = parse_timestamp(&position).ok_or_else(|| {
            MusicError::InvalidInput(
                "Invalid time format. Please use MM:SS format (e.g., 1:30)".to_string(),
            )
        })?;
        let track = ctx
            .data()
            .music
            .now_playing(guild_id)
            .await
            .ok_or(MusicError::NothingPlaying)?;
        let target = Duration::from_secs(secs);
        if let Some(duration) = track.duration
            && target >= duration
        {
            return Err(MusicError::InvalidInput(format!(
                "Position is past the end of the track ({}).",
                format_track_duration(duration)
            ))
            .into());
        }
        ctx.data().music.seek(guild_id, target).await?;
        let length = track
            .duration
            .map(format_track_duration)
            .unwrap_or_else(|| "Unknown".to_string());
        ctx.say(format!(
            "⏩ Seeked to {} in {length}",
            format_track_duration(target)
        ))
        .await?;
        Ok(())
    }

    /// Stop playback and clear the queue
    #[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
    pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        if !ctx.data().music.is_connected(guild_id) {
            return Err(MusicError::NotConnected.into());
        }
        ctx.data()
            .music
            .stop(ctx.serenity_context(), guild_id)
            .await?;
        ctx.say("⏹️ Playback stopped and queue cleared.").await?;
        Ok(())
    }

    /// List the music commands
    #[poise::command(prefix_command, slash_command, category = "Music")]
    pub async fn musichelp(ctx: Context<'_>) -> Result<(), Error> {
        let prefix = ctx.prefix();
        let mut embed = CreateEmbed::new()
            .title("Music Commands")
            .description("Here are all the available music commands:")
            .color(QUEUE_COLOR);
        for (name, description) in HELP_ENTRIES {
            embed = embed.field(format!("{prefix}{name}"), description, false);
        }
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

impl Cog for MusicCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![
            Self::join(),
            Self::leave(),
            Self::play(),
            Self::pause(),
            Self::resume(),
            Self::skip(),
            Self::previous(),
            Self::nowplaying(),
            Self::queue(),
            Self::clear(),
            Self::remove(),
            Self::shuffle(),
            Self::loop_mode(),
            Self::volume(),
            Self::seek(),
            Self::stop(),
            Self::musichelp(),
        ]
    }
}
