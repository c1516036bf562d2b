//! About command showing bot statistics and information.

use std::time::Duration;

use chrono::Datelike;
use chrono::Utc;
use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;

use crate::bot::Data;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::task::status_rotation::audience;

const ABOUT_COLOR: u32 = 0x5865F2;

/// Cog for the about command.
pub struct AboutCog;

impl AboutCog {
    /// Show information about the bot
    #[poise::command(prefix_command, slash_command, category = "Utility")]
    pub async fn about(ctx: Context<'_>) -> Result<(), Error> {
        ctx.defer().await?;
        let stats = AboutStats::gather_stats(&ctx).await?;
        let avatar_url = ctx.cache().current_user().face();

        let embed = CreateEmbed::new()
            .title(format!("About {}", ctx.cache().current_user().name))
            .thumbnail(avatar_url)
            .color(ABOUT_COLOR)
            .field("Version", stats.version.clone(), true)
            .field("Uptime", format_uptime(stats.uptime), true)
            .field("Latency", format!("{} ms", stats.latency_ms), true)
            .field("Servers", format_number(stats.guild_count), true)
            .field("Users", format_number(stats.user_count), true)
            .field("Commands", stats.command_count.to_string(), true)
            .field("Memory", format!("{:.1} MB", stats.memory_mb), true)
            .footer(CreateEmbedFooter::new(format!(
                "© {} | v{}",
                stats.current_year, stats.version
            )));
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

impl Cog for AboutCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::about()]
    }
}

/// Formats a duration into a human-readable uptime string.
fn format_uptime(duration: Duration) -> String {
    let days = duration.as_secs() / 86400;
    let hours = (duration.as_secs() % 86400) / 3600;
    let minutes = (duration.as_secs() % 3600) / 60;

    if days > 0 {
        format!("{} days, {} hours, {} minutes", days, hours, minutes)
    } else if hours > 0 {
        format!("{} hours, {} minutes", hours, minutes)
    } else {
        format!("{} minutes", minutes)
    }
}

/// Formats a number with k/M suffixes for readability.
fn format_number(num: usize) -> String {
    if num >= 1_000_000 {
        format!("{:.1}M", num as f64 / 1_000_000.0)
    } else if num >= 1_000 {
        format!("{:.1}k", num as f64 / 1_000.0)
    } else {
        num.to_string()
    }
}

struct AboutStats {
    version: String,
    uptime: Duration,
    guild_count: usize,
    user_count: usize,
    latency_ms: u64,
    command_count: usize,
    memory_mb: f64,
    current_year: i32,
}

impl AboutStats {
    async fn gather_stats(ctx: &Context<'_>) -> Result<AboutStats, Error> {
        let version = ctx.data().config.version.clone();
        let uptime = ctx.data().start_time.elapsed();
        let (guild_count, user_count) = audience(ctx.serenity_context());

        let latency_start = std::time::Instant::now();
        let _ = ctx.http().get_current_user().await?;
        let latency_ms = latency_start.elapsed().as_millis() as u64;

        Ok(AboutStats {
            version,
            uptime,
            guild_count,
            user_count,
            latency_ms,
            command_count: count_commands(&ctx.framework().options().commands),
            memory_mb: process_memory_mb(),
            current_year: Utc::now().year(),
        })
    }
}

fn count_commands<U, E>(commands: &[Command<U, E>]) -> usize {
    commands
        .iter()
        .map(|cmd| 1 + count_commands(&cmd.subcommands))
        .sum()
}

/// Current process memory usage in megabytes.
fn process_memory_mb() -> f64 {
    use sysinfo::ProcessesToUpdate;
    use sysinfo::System;
    use sysinfo::get_current_pid;

    let Ok(pid) = get_current_pid() else {
        return 0.0;
    };
    let mut s = System::new();
    s.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    s.process(pid)
        .map(|process| process.memory() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(59)), "0 minutes");
        assert_eq!(format_uptime(Duration::from_secs(3_660)), "1 hours, 1 minutes");
        assert_eq!(
            format_uptime(Duration::from_secs(90_061)),
            "1 days, 1 hours, 1 minutes"
        );
    }

    #[test]
    fn test_format_number_suffixes() {
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_500), "1.5k");
        assert_eq!(format_number(2_300_000), "2.3M");
    }

    #[test]
    fn test_count_commands_includes_subcommands() {
        let commands = crate::bot::commands::Cogs.commands();
        let top_level = commands.len();
        assert!(count_commands(&commands) > top_level);
    }
}
