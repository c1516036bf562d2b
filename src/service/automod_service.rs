//! Message filters for the automatic moderator.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::LazyLock;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use regex::Regex;

use crate::model::AutomodSettings;
use crate::model::Violation;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid regex"));
static INVITE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"discord(?:\.gg|app\.com/invite)/\S+").expect("valid regex"));

/// Messages shorter than this are never flagged for caps.
pub const CAPS_MIN_LENGTH: usize = 8;

pub fn contains_banned_word(content: &str, words: &[String]) -> bool {
    let lower = content.to_lowercase();
    words
        .iter()
        .any(|w| !w.is_empty() && lower.contains(&w.to_lowercase()))
}

/// True when uppercase letters make up at least `threshold` percent of the letters.
pub fn is_excessive_caps(content: &str, threshold: u8) -> bool {
    if content.chars().count() < CAPS_MIN_LENGTH {
        return false;
    }
    let letters = content.chars().filter(|c| c.is_alphabetic()).count();
    if letters == 0 {
        return false;
    }
    let upper = content.chars().filter(|c| c.is_uppercase()).count();
    upper as f64 / letters as f64 * 100.0 >= threshold as f64
}

pub fn contains_link(content: &str) -> bool {
    LINK_RE.is_match(content)
}

pub fn contains_invite(content: &str) -> bool {
    INVITE_RE.is_match(content)
}

/// Runs the content filters in order and returns the first violation.
///
/// Spam is stateful and checked separately with [`SpamTracker`].
pub fn check_content(settings: &AutomodSettings, content: &str) -> Option<Violation> {
    if settings.banned_words.enabled && contains_banned_word(content, &settings.banned_words.words)
    {
        return Some(Violation::BannedWords);
    }
    if settings.caps.enabled && is_excessive_caps(content, settings.caps.threshold) {
        return Some(Violation::Caps);
    }
    if settings.links.enabled && contains_link(content) {
        return Some(Violation::Links);
    }
    if settings.invites.enabled && contains_invite(content) {
        return Some(Violation::Invites);
    }
    None
}

/// Whether a message in `channel_id` by a member with `roles` skips automod.
pub fn is_exempt(settings: &AutomodSettings, channel_id: u64, roles: &[u64]) -> bool {
    settings.exempt_channels.contains(&channel_id)
        || roles.iter().any(|r| settings.exempt_roles.contains(r))
}

struct SpamWindow {
    window: Duration,
    hits: VecDeque<Instant>,
}

impl SpamWindow {
    fn prune(&mut self, now: Instant) {
        while self
            .hits
            .front()
            .is_some_and(|t| now.duration_since(*t) > self.window)
        {
            self.hits.pop_front();
        }
    }
}

/// Sliding window of recent message times per `(user, channel)`.
///
/// Pairs with no message left inside their window are dropped.
#[derive(Default)]
pub struct SpamTracker {
    windows: Mutex<HashMap<(u64, u64), SpamWindow>>,
}

impl SpamTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message and reports whether more than `limit` fell within `window`.
    pub fn record(
        &self,
        user_id: u64,
        channel_id: u64,
        limit: u32,
        window: Duration,
        now: Instant,
    ) -> bool {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        windows.retain(|_, entry| {
            entry.prune(now);
            !entry.hits.is_empty()
        });
        let entry = windows
            .entry((user_id, channel_id))
            .or_insert_with(|| SpamWindow {
                window,
                hits: VecDeque::new(),
            });
        // Guild settings may have changed since the pair was first seen
        entry.window = window;
        entry.prune(now);
        entry.hits.push_back(now);
        entry.hits.len() > limit as usize
    }

    /// Number of `(user, channel)` pairs currently tracked.
    pub fn tracked(&self) -> usize {
        match self.windows.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BannedWordsFilter;
    use crate::model::CapsFilter;
    use crate::model::ToggleFilter;

    #[test]
    fn test_banned_words_case_insensitive() {
        let words = vec!["Darn".to_string()];
        assert!(contains_banned_word("oh DARN it", &words));
        assert!(!contains_banned_word("all good", &words));
    }

    #[test]
    fn test_caps_threshold_and_min_length() {
        assert!(is_excessive_caps("HELLO WORLD", 70));
        assert!(!is_excessive_caps("Hello World", 70));
        assert!(!is_excessive_caps("HEY", 70));
        assert!(!is_excessive_caps("12345678!", 70));
    }

    #[test]
    fn test_links_and_invites() {
        assert!(contains_link("see https://example.com"));
        assert!(!contains_link("example.com"));
        assert!(contains_invite("join discord.gg/abc"));
        assert!(contains_invite("discordapp.com/invite/xyz"));
        assert!(!contains_invite("discord is fun"));
    }

    #[test]
    fn test_check_content_order_and_toggles() {
        let mut settings = AutomodSettings::default();
        assert_eq!(check_content(&settings, "BAD WORD https://x.y"), None);

        settings.links = ToggleFilter { enabled: true };
        settings.caps = CapsFilter {
            enabled: true,
            threshold: 70,
        };
        assert_eq!(
            check_content(&settings, "BAD WORD https://x.y"),
            Some(Violation::Caps)
        );

        settings.banned_words = BannedWordsFilter {
            enabled: true,
            words: vec!["bad".to_string()],
        };
        assert_eq!(
            check_content(&settings, "BAD WORD https://x.y"),
            Some(Violation::BannedWords)
        );
    }

    #[test]
    fn test_exemptions() {
        let settings = AutomodSettings {
            exempt_roles: vec![10],
            exempt_channels: vec![20],
            ..Default::default()
        };
        assert!(is_exempt(&settings, 20, &[]));
        assert!(is_exempt(&settings, 1, &[5, 10]));
        assert!(!is_exempt(&settings, 1, &[5]));
    }

    #[test]
    fn test_spam_tracker_window() {
        let tracker = SpamTracker::new();
        let start = Instant::now();
        let window = Duration::from_secs(5);
        for i in 0..5 {
            assert!(!tracker.record(1, 1, 5, window, start + Duration::from_millis(i * 100)));
        }
        assert!(tracker.record(1, 1, 5, window, start + Duration::from_millis(600)));
        // Other channel is tracked separately
        assert!(!tracker.record(1, 2, 5, window, start));
        // Old entries fall out of the window
        assert!(!tracker.record(1, 1, 5, window, start + Duration::from_secs(20)));
    }

    #[test]
    fn test_spam_tracker_drops_idle_pairs() {
        let tracker = SpamTracker::new();
        let start = Instant::now();
        let window = Duration::from_secs(5);
        for user in 0..10 {
            tracker.record(user, 1, 5, window, start);
        }
        assert_eq!(tracker.tracked(), 10);

        tracker.record(99, 1, 5, window, start + Duration::from_secs(60));
        assert_eq!(tracker.tracked(), 1);
    }
}
