//! Utility functions for bot commands.

use std::collections::HashMap;

use poise::serenity_prelude as serenity;
use serenity::UserId;

use crate::bot::commands::Context;
use crate::bot::error::BotError;

/// Entries shown on one leaderboard or queue page.
pub const PAGE_SIZE: u32 = 10;

/// Checks a 1-based page against `total` entries and returns `(offset, page count)`.
pub fn page_bounds(page: Option<u32>, total: u32) -> Result<(u32, u32), BotError> {
    let pages = total.div_ceil(PAGE_SIZE).max(1);
    let page = page.unwrap_or(1);
    if page < 1 || page > pages {
        return Err(BotError::InvalidCommandArgument {
            parameter: "page".to_string(),
            reason: format!("Invalid page number. Please choose a page between 1 and {pages}."),
        });
    }
    Ok(((page - 1) * PAGE_SIZE, pages))
}

/// Medal prefix for the top three ranks.
pub fn medal(rank: u32) -> &'static str {
    match rank {
        1 => "🥇 ",
        2 => "🥈 ",
        3 => "🥉 ",
        _ => "",
    }
}

/// Ten-segment text progress bar.
pub fn progress_bar(percent: f64) -> String {
    let filled = (percent.clamp(0.0, 100.0) / 10.0).round() as usize;
    format!("{}{}", "▰".repeat(filled), "▱".repeat(10 - filled))
}

/// Ids of the cached members of the current guild.
pub fn guild_member_ids(ctx: Context<'_>) -> Result<Vec<u64>, BotError> {
    let guild = ctx.guild().ok_or(BotError::GuildOnlyCommand)?;
    Ok(guild.members.keys().map(|id| id.get()).collect())
}

/// Display names of cached guild members, keyed by user id.
pub fn member_names(ctx: Context<'_>, ids: &[u64]) -> HashMap<u64, String> {
    let Some(guild) = ctx.guild() else {
        return HashMap::new();
    };
    ids.iter()
        .filter_map(|id| {
            guild
                .members
                .get(&UserId::new(*id))
                .map(|m| (*id, m.display_name().to_string()))
        })
        .collect()
}

/// Parses a raw id or a `<@id>` / `<@!id>` mention.
pub fn parse_user_id(input: &str) -> Option<u64> {
    input
        .trim()
        .trim_start_matches("<@")
        .trim_start_matches('!')
        .trim_end_matches('>')
        .parse()
        .ok()
}

/// Parses `MM:SS` or `H:MM:SS` into seconds.
pub fn parse_timestamp(input: &str) -> Option<u64> {
    let parts: Vec<u64> = input
        .split(':')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [m, s] if *s < 60 => Some(m * 60 + s),
        [h, m, s] if *m < 60 && *s < 60 => Some(h * 3600 + m * 60 + s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds_accepts_valid_pages() {
        assert_eq!(page_bounds(None, 25).unwrap(), (0, 3));
        assert_eq!(page_bounds(Some(3), 25).unwrap(), (20, 3));
        assert_eq!(page_bounds(Some(1), 0).unwrap(), (0, 1));
    }

    #[test]
    fn test_page_bounds_rejects_out_of_range() {
        match page_bounds(Some(4), 25).unwrap_err() {
            BotError::InvalidCommandArgument { parameter, reason } => {
                assert_eq!(parameter, "page");
                assert!(reason.contains("between 1 and 3"));
            }
            _ => panic!("Expected InvalidCommandArgument error"),
        }
        assert!(page_bounds(Some(0), 25).is_err());
    }

    #[test]
    fn test_medal() {
        assert_eq!(medal(1), "🥇 ");
        assert_eq!(medal(3), "🥉 ");
        assert_eq!(medal(4), "");
    }

    #[test]
    fn test_parse_user_id_accepts_mentions() {
        assert_eq!(parse_user_id("<@!123>"), Some(123));
        assert_eq!(parse_user_id("<@45>"), Some(45));
        assert_eq!(parse_user_id("678"), Some(678));
        assert_eq!(parse_user_id("someone"), None);
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1:30"), Some(90));
        assert_eq!(parse_timestamp("1:02:03"), Some(3723));
        assert_eq!(parse_timestamp("1:75"), None);
        assert_eq!(parse_timestamp("abc"), None);
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0), "▱▱▱▱▱▱▱▱▱▱");
        assert_eq!(progress_bar(50.0), "▰▰▰▰▰▱▱▱▱▱");
        assert_eq!(progress_bar(150.0), "▰▰▰▰▰▰▰▰▰▰");
    }
}
