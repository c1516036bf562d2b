//! Profiles, achievements and the global top lists.

use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::CreateEmbed;

use crate::bot::Data;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::bot::utils::medal;
use crate::bot::utils::member_names;
use crate::bot::utils::progress_bar;
use crate::model::LeaderboardKind;
use crate::model::LeaderboardOptBuilder;
use crate::service::user_service::level_progress;
use crate::service::user_service::xp_for_level;

const PROFILE_COLOR: u32 = 0x9B59B6;
const TOP_COLOR: u32 = 0xF1C40F;
const PROFILE_ACHIEVEMENTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementCategory {
    Messages,
    Level,
    Economy,
    Commands,
    Other,
}

impl AchievementCategory {
    pub const ALL: [AchievementCategory; 5] = [
        AchievementCategory::Messages,
        AchievementCategory::Level,
        AchievementCategory::Economy,
        AchievementCategory::Commands,
        AchievementCategory::Other,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            AchievementCategory::Messages => "Messages",
            AchievementCategory::Level => "Level",
            AchievementCategory::Economy => "Economy",
            AchievementCategory::Commands => "Commands",
            AchievementCategory::Other => "Other",
        }
    }
}

const CATALOGUE: [(&str, &str, AchievementCategory); 14] = [
    ("Chatty", "Send 10 messages", AchievementCategory::Messages),
    ("Conversador", "Send 100 messages", AchievementCategory::Messages),
    ("Comunicador Experto", "Send 1000 messages", AchievementCategory::Messages),
    ("Reached Level 5", "Reach level 5", AchievementCategory::Level),
    ("Reached Level 10", "Reach level 10", AchievementCategory::Level),
    ("Reached Level 25", "Reach level 25", AchievementCategory::Level),
    ("Reached Level 50", "Reach level 50", AchievementCategory::Level),
    ("Reached Level 100", "Reach level 100", AchievementCategory::Level),
    ("Ahorrador", "Hold 1000 coins", AchievementCategory::Economy),
    ("Rico", "Hold 10000 coins", AchievementCategory::Economy),
    ("Millonario", "Hold 1000000 coins", AchievementCategory::Economy),
    ("Ayudante", "Use help 10 times", AchievementCategory::Commands),
    ("Jugador", "Gamble 50 times", AchievementCategory::Commands),
    ("Creativo", "Create 5 custom commands", AchievementCategory::Commands),
];

/// Description and category of an achievement; unknown names are "Other".
pub fn describe(name: &str) -> (&'static str, AchievementCategory) {
    CATALOGUE
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, description, category)| (*description, *category))
        .unwrap_or(("A mysterious achievement", AchievementCategory::Other))
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum TopKind {
    #[name = "level"]
    Level,
    #[name = "xp"]
    Xp,
    #[name = "coins"]
    Coins,
    #[name = "achievements"]
    Achievements,
}

impl TopKind {
    fn leaderboard_kind(&self) -> LeaderboardKind {
        match self {
            TopKind::Level => LeaderboardKind::Level,
            TopKind::Xp => LeaderboardKind::Xp,
            TopKind::Coins => LeaderboardKind::Coins,
            TopKind::Achievements => LeaderboardKind::Achievements,
        }
    }

    fn unit(&self) -> &'static str {
        match self {
            TopKind::Level => "Level",
            TopKind::Xp => "XP",
            TopKind::Coins => "Coins",
            TopKind::Achievements => "Achievements",
        }
    }
}

pub struct ProfileCog;

impl ProfileCog {
    /// Show a member's profile
    #[poise::command(prefix_command, slash_command, guild_only, category = "Profile", aliases("perfil"))]
    pub async fn profile(
        ctx: Context<'_>,
        #[description = "Member to show"] member: Option<serenity::Member>,
    ) -> Result<(), Error> {
        let member = match member {
            Some(m) => m,
            None => ctx
                .author_member()
                .await
                .ok_or(BotError::GuildOnlyCommand)?
                .into_owned(),
        };
        let services = &ctx.data().service;
        let Some(user) = services.user.get_user(member.user.id.get()).await? else {
            ctx.say(format!("❌ <@{}> does not have a profile yet.", member.user.id))
                .await?;
            return Ok(());
        };
        let balance = services.economy.balance(member.user.id.get()).await?;
        let achievements = services.user.achievements(member.user.id.get()).await?;
        let progress = level_progress(user.level, user.xp);

        let mut embed = CreateEmbed::new()
            .title(format!("{}'s Profile", member.display_name()))
            .thumbnail(member.face())
            .color(PROFILE_COLOR)
            .field("Level", user.level.to_string(), true)
            .field("XP", user.xp.to_string(), true)
            .field("Coins", balance.to_string(), true)
            .field(
                "Progress to next level",
                format!(
                    "{} {}/{} XP ({progress:.0}%)",
                    progress_bar(progress),
                    user.xp,
                    xp_for_level(user.level)
                ),
                false,
            )
            .field(
                "Account created",
                format!("<t:{}:R>", member.user.created_at().unix_timestamp()),
                true,
            )
            .field(
                "Last active",
                format!("<t:{}:R>", user.last_active.timestamp()),
                true,
            );
        if let Some(joined) = member.joined_at {
            embed = embed.field("Joined", format!("<t:{}:R>", joined.unix_timestamp()), true);
        }

        if achievements.is_empty() {
            embed = embed.field("Achievements", "No achievements yet", false);
        } else {
            let mut lines: Vec<String> = achievements
                .iter()
                .take(PROFILE_ACHIEVEMENTS)
                .map(|a| {
                    let (description, _) = describe(&a.achievement_name);
                    format!("🏆 **{}**: {description}", a.achievement_name)
                })
                .collect();
            if achievements.len() > PROFILE_ACHIEVEMENTS {
                lines.push(format!(
                    "... and {} more",
                    achievements.len() - PROFILE_ACHIEVEMENTS
                ));
            }
            embed = embed.field(
                format!("Achievements ({})", achievements.len()),
                lines.join("\n"),
                false,
            );
        }
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// List a member's achievements by category
    #[poise::command(prefix_command, slash_command, category = "Profile", aliases("logros"))]
    pub async fn achievements(
        ctx: Context<'_>,
        #[description = "Member to show"] member: Option<serenity::User>,
    ) -> Result<(), Error> {
        let user = member.unwrap_or_else(|| ctx.author().clone());
        let achievements = ctx.data().service.user.achievements(user.id.get()).await?;
        if achievements.is_empty() {
            ctx.say(format!("❌ <@{}> has no achievements yet.", user.id))
                .await?;
            return Ok(());
        }

        let mut embed = CreateEmbed::new()
            .title(format!("{}'s Achievements", user.name))
            .description(format!("Total: {} achievements", achievements.len()))
            .thumbnail(user.face())
            .color(PROFILE_COLOR);
        for category in AchievementCategory::ALL {
            let lines: Vec<String> = achievements
                .iter()
                .filter_map(|a| {
                    let (description, c) = describe(&a.achievement_name);
                    (c == category).then(|| {
                        format!(
                            "🏆 **{}**: {description} (<t:{}:d>)",
                            a.achievement_name,
                            a.date_achieved.timestamp()
                        )
                    })
                })
                .collect();
            if !lines.is_empty() {
                embed = embed.field(category.title(), lines.join("\n"), false);
            }
        }
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Top 10 users by level, xp, coins or achievements
    #[poise::command(prefix_command, slash_command, category = "Profile", aliases("leaderboard"))]
    pub async fn top(
        ctx: Context<'_>,
        #[description = "What to rank by"] kind: Option<TopKind>,
    ) -> Result<(), Error> {
        let kind = kind.unwrap_or(TopKind::Level);
        let opts = LeaderboardOptBuilder::default()
            .kind(kind.leaderboard_kind())
            .limit(Some(10))
            .build()?;
        let (entries, _) = ctx.data().service.user.leaderboard(&opts).await?;
        if entries.is_empty() {
            ctx.say("❌ No data to show.").await?;
            return Ok(());
        }

        let ids: Vec<u64> = entries.iter().map(|e| e.user_id).collect();
        let names = member_names(ctx, &ids);
        let description = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let rank = i as u32 + 1;
                let marker = match medal(rank) {
                    "" => format!("{rank}. "),
                    m => m.to_string(),
                };
                let name = names
                    .get(&entry.user_id)
                    .cloned()
                    .unwrap_or_else(|| format!("<@{}>", entry.user_id));
                format!("{marker}**{name}**: {} {}", entry.value, kind.unit())
            })
            .collect::<Vec<_>>()
            .join("\n");
        let embed = CreateEmbed::new()
            .title(format!("Top 10 - {}", kind.unit()))
            .description(description)
            .color(TOP_COLOR);
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

impl Cog for ProfileCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::profile(), Self::achievements(), Self::top()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_known_achievements() {
        assert_eq!(describe("Chatty").1, AchievementCategory::Messages);
        assert_eq!(describe("Reached Level 25").1, AchievementCategory::Level);
        assert_eq!(describe("Creativo").1, AchievementCategory::Commands);
    }

    #[test]
    fn test_describe_unknown_is_other() {
        let (description, category) = describe("Something Else");
        assert_eq!(category, AchievementCategory::Other);
        assert_eq!(description, "A mysterious achievement");
    }
}
