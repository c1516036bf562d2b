//! Presence rotation and the shared presence state.
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use log::debug;
use log::error;
use log::info;
use poise::serenity_prelude as serenity;
use serenity::ActivityData;
use serenity::ActivityType;
use tokio::time::interval;

use crate::service::status_service::StatusEntry;
use crate::service::status_service::StatusKind;
use crate::service::status_service::StatusService;

/// Who currently owns the bot's presence.
#[derive(Default)]
pub struct PresenceState {
    manual: AtomicBool,
    music_playing: AtomicBool,
    index: AtomicUsize,
}

impl PresenceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_manual(&self) -> bool {
        self.manual.load(Ordering::SeqCst)
    }

    pub fn set_manual(&self, manual: bool) {
        self.manual.store(manual, Ordering::SeqCst);
    }

    pub fn is_music_playing(&self) -> bool {
        self.music_playing.load(Ordering::SeqCst)
    }

    /// Whether the rotation may change the presence right now.
    pub fn rotation_active(&self) -> bool {
        !self.is_manual() && !self.is_music_playing()
    }

    /// Index to show next for a rotation of `len` entries, advancing the cursor.
    pub fn advance(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let current = self.index.load(Ordering::SeqCst) % len;
        self.index.store((current + 1) % len, Ordering::SeqCst);
        current
    }

    fn reset(&self) {
        self.music_playing.store(false, Ordering::SeqCst);
        self.index.store(0, Ordering::SeqCst);
    }
}

pub fn activity_for(kind: StatusKind, text: String) -> ActivityData {
    let kind = match kind {
        StatusKind::Playing => ActivityType::Playing,
        StatusKind::Listening => ActivityType::Listening,
        StatusKind::Watching => ActivityType::Watching,
        StatusKind::Streaming => ActivityType::Streaming,
        StatusKind::Competing => ActivityType::Competing,
    };
    ActivityData {
        name: text,
        kind,
        state: None,
        url: None,
    }
}

/// Guild count and summed member count from the cache.
pub fn audience(ctx: &serenity::Context) -> (usize, usize) {
    let guilds = ctx.cache.guilds();
    let users = guilds
        .iter()
        .filter_map(|id| ctx.cache.guild(*id).map(|g| g.member_count as usize))
        .sum();
    (guilds.len(), users)
}

fn apply_entry(ctx: &serenity::Context, entry: &StatusEntry) {
    let (guilds, users) = audience(ctx);
    let text = entry.render(guilds, users);
    debug!("Setting presence to {} {}", entry.kind, text);
    ctx.set_activity(Some(activity_for(entry.kind, text)));
}

pub fn show_now_playing(ctx: &serenity::Context, presence: &PresenceState, title: &str) {
    presence.music_playing.store(true, Ordering::SeqCst);
    if !presence.is_manual() {
        ctx.set_activity(Some(activity_for(
            StatusKind::Listening,
            format!("🎵 {title}"),
        )));
    }
}

/// Ends a music presence and shows the first rotation entry again.
pub async fn restore_rotation(
    ctx: &serenity::Context,
    presence: &PresenceState,
    status: &StatusService,
) {
    presence.reset();
    if presence.is_manual() {
        return;
    }
    rotate_once(ctx, presence, status).await;
}

async fn rotate_once(ctx: &serenity::Context, presence: &PresenceState, status: &StatusService) {
    match status.rotation().await {
        Ok(rotation) if !rotation.is_empty() => {
            let index = presence.advance(rotation.len());
            apply_entry(ctx, &rotation[index]);
        }
        Ok(_) => {}
        Err(e) => error!("Failed to load status rotation: {e}"),
    }
}

/// Cycles through the stored rotation on a fixed period.
pub struct StatusRotationTask {
    status: Arc<StatusService>,
    presence: Arc<PresenceState>,
    period: Duration,
}

impl StatusRotationTask {
    pub fn new(status: Arc<StatusService>, presence: Arc<PresenceState>, period: Duration) -> Self {
        Self {
            status,
            presence,
            period,
        }
    }

    pub fn start(self, ctx: serenity::Context) {
        info!("Starting status rotation every {:?}", self.period);
        tokio::spawn(async move {
            let mut interval = interval(self.period);
            loop {
                interval.tick().await;
                if self.presence.rotation_active() {
                    rotate_once(&ctx, &self.presence, &self.status).await;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_wraps_and_tracks_shrinking_rotation() {
        let presence = PresenceState::new();
        assert_eq!(presence.advance(3), 0);
        assert_eq!(presence.advance(3), 1);
        assert_eq!(presence.advance(3), 2);
        assert_eq!(presence.advance(3), 0);
        assert_eq!(presence.advance(3), 1);
        // Cursor at 2, rotation shrank to 2 entries
        assert_eq!(presence.advance(2), 0);
        assert_eq!(presence.advance(0), 0);
    }

    #[test]
    fn test_rotation_active_flags() {
        let presence = PresenceState::new();
        assert!(presence.rotation_active());
        presence.set_manual(true);
        assert!(!presence.rotation_active());
        presence.set_manual(false);
        presence.music_playing.store(true, Ordering::SeqCst);
        assert!(!presence.rotation_active());
        presence.reset();
        assert!(presence.rotation_active());
    }
}
