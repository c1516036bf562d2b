//! Per-guild track queue with a cursor and loop modes.

use std::str::FromStr;
use std::time::Duration;

use rand::seq::SliceRandom;

use crate::music::error::MusicError;

/// Default playback volume in percent.
pub const DEFAULT_VOLUME: u8 = 100;

/// A queued song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    /// Page url or a yt-dlp search target.
    pub url: String,
    pub duration: Option<Duration>,
    pub uploader: Option<String>,
    pub thumbnail: Option<String>,
}

impl Track {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            duration: None,
            uploader: None,
            thumbnail: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Off,
    Single,
    Queue,
}

impl LoopMode {
    pub fn name(&self) -> &'static str {
        match self {
            LoopMode::Off => "off",
            LoopMode::Single => "single",
            LoopMode::Queue => "queue",
        }
    }
}

impl FromStr for LoopMode {
    type Err = MusicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(LoopMode::Off),
            "single" => Ok(LoopMode::Single),
            "queue" => Ok(LoopMode::Queue),
            _ => Err(MusicError::InvalidInput(
                "Invalid loop mode. Please specify 'off', 'single', or 'queue'.".to_string(),
            )),
        }
    }
}

impl std::fmt::Display for LoopMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered tracks plus the index of the current one.
///
/// With [`LoopMode::Off`] the position may move one past the end once the
/// queue is exhausted, in which case there is no current track.
#[derive(Debug, Clone)]
pub struct MusicQueue {
    tracks: Vec<Track>,
    position: usize,
    pub loop_mode: LoopMode,
    pub volume: u8,
}

impl Default for MusicQueue {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            position: 0,
            loop_mode: LoopMode::Off,
            volume: DEFAULT_VOLUME,
        }
    }
}

impl MusicQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Appends a track and returns its index.
    pub fn add(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    /// Moves the cursor to `index` if it exists.
    pub fn jump_to(&mut self, index: usize) -> Option<&Track> {
        if index < self.tracks.len() {
            self.position = index;
        }
        self.tracks.get(index)
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.position)
    }

    /// Advances according to the loop mode.
    pub fn next(&mut self) -> Option<&Track> {
        if self.tracks.is_empty() {
            return None;
        }
        match self.loop_mode {
            LoopMode::Single => {}
            LoopMode::Queue => self.position = (self.position + 1) % self.tracks.len(),
            LoopMode::Off => {
                if self.position < self.tracks.len() {
                    self.position += 1;
                }
            }
        }
        self.tracks.get(self.position)
    }

    /// Steps back one track. Wraps to the end only when looping the queue.
    pub fn previous(&mut self) -> Option<&Track> {
        if self.tracks.is_empty() {
            return None;
        }
        if self.loop_mode != LoopMode::Single {
            self.position = match self.position.checked_sub(1) {
                Some(p) => p.min(self.tracks.len() - 1),
                None if self.loop_mode == LoopMode::Queue => self.tracks.len() - 1,
                None => 0,
            };
        }
        self.tracks.get(self.position)
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.position = 0;
    }

    /// Removes the track at `index`, keeping the cursor on the same track.
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        if index >= self.tracks.len() {
            return None;
        }
        let track = self.tracks.remove(index);
        if index < self.position {
            self.position -= 1;
        }
        Some(track)
    }

    /// Shuffles only the tracks after the current one.
    pub fn shuffle(&mut self) {
        let start = (self.position + 1).min(self.tracks.len());
        self.tracks[start..].shuffle(&mut rand::thread_rng());
    }
}

/// `H:MM:SS` for durations of an hour or more, otherwise `M:SS`.
pub fn format_track_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_of(n: usize) -> MusicQueue {
        let mut queue = MusicQueue::new();
        for i in 0..n {
            queue.add(Track::new(format!("t{i}"), format!("https://x/{i}")));
        }
        queue
    }

    fn title(track: Option<&Track>) -> Option<String> {
        track.map(|t| t.title.clone())
    }

    #[test]
    fn test_next_on_empty_queue() {
        assert!(MusicQueue::new().next().is_none());
    }

    #[test]
    fn test_next_without_loop_runs_off_the_end() {
        let mut queue = queue_of(2);
        assert_eq!(title(queue.next()), Some("t1".into()));
        assert_eq!(title(queue.next()), None);
        assert!(queue.current().is_none());
        // Stays exhausted
        assert_eq!(title(queue.next()), None);
    }

    #[test]
    fn test_next_single_repeats_current() {
        let mut queue = queue_of(3);
        queue.loop_mode = LoopMode::Single;
        assert_eq!(title(queue.next()), Some("t0".into()));
        assert_eq!(title(queue.next()), Some("t0".into()));
    }

    #[test]
    fn test_next_queue_wraps() {
        let mut queue = queue_of(2);
        queue.loop_mode = LoopMode::Queue;
        assert_eq!(title(queue.next()), Some("t1".into()));
        assert_eq!(title(queue.next()), Some("t0".into()));
    }

    #[test]
    fn test_previous_clamps_or_wraps() {
        let mut queue = queue_of(3);
        assert_eq!(title(queue.previous()), Some("t0".into()));

        queue.loop_mode = LoopMode::Queue;
        assert_eq!(title(queue.previous()), Some("t2".into()));
        assert_eq!(title(queue.previous()), Some("t1".into()));

        queue.loop_mode = LoopMode::Single;
        assert_eq!(title(queue.previous()), Some("t1".into()));
    }

    #[test]
    fn test_previous_after_exhaustion_returns_last() {
        let mut queue = queue_of(2);
        queue.next();
        queue.next();
        assert_eq!(title(queue.previous()), Some("t1".into()));
    }

    #[test]
    fn test_remove_before_cursor_keeps_current() {
        let mut queue = queue_of(4);
        queue.jump_to(2);
        assert_eq!(queue.remove(0).map(|t| t.title), Some("t0".into()));
        assert_eq!(queue.position(), 1);
        assert_eq!(title(queue.current()), Some("t2".into()));
        assert!(queue.remove(10).is_none());
    }

    #[test]
    fn test_clear_resets_position() {
        let mut queue = queue_of(3);
        queue.jump_to(2);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.position(), 0);
    }

    #[test]
    fn test_shuffle_keeps_played_prefix() {
        let mut queue = queue_of(20);
        queue.jump_to(5);
        queue.shuffle();
        let titles: Vec<_> = queue.tracks().iter().map(|t| t.title.clone()).collect();
        assert_eq!(&titles[..6], &["t0", "t1", "t2", "t3", "t4", "t5"]);
        assert_eq!(queue.len(), 20);
    }

    #[test]
    fn test_loop_mode_parse() {
        assert_eq!("Queue".parse::<LoopMode>().unwrap(), LoopMode::Queue);
        assert!("forever".parse::<LoopMode>().is_err());
    }

    #[test]
    fn test_format_track_duration() {
        assert_eq!(format_track_duration(Duration::from_secs(65)), "1:05");
        assert_eq!(format_track_duration(Duration::from_secs(3725)), "1:02:05");
    }
}
