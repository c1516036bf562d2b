//! Coins, daily rewards, jobs, gambling, the shop and custom commands.

use chrono::Utc;
use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use serenity::Mentionable;

use crate::bot::Data;
use crate::bot::checks::guild_id;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::commands::builtin_names;
use crate::bot::error::BotError;
use crate::bot::utils::PAGE_SIZE;
use crate::bot::utils::guild_member_ids;
use crate::bot::utils::medal;
use crate::bot::utils::member_names;
use crate::bot::utils::page_bounds;
use crate::model::LeaderboardKind;
use crate::model::LeaderboardOptBuilder;
use crate::model::ShopItemKind;
use crate::service::custom_command_service::CustomCommandService;
use crate::service::economy_service::GambleOutcome;
use crate::service::economy_service::ShopEntry;

const GOLD: u32 = 0xF1C40F;
const GREEN: u32 = 0x2ECC71;
const RED: u32 = 0xE74C3C;
const BLUE: u32 = 0x3498DB;

fn plural_days(n: i64) -> String {
    format!("{n} day{}", if n == 1 { "" } else { "s" })
}

pub struct EconomyCog;

impl EconomyCog {
    /// Check your balance or another member's
    #[poise::command(prefix_command, slash_command, guild_only, aliases("bal"), category = "Economy")]
    pub async fn balance(
        ctx: Context<'_>,
        #[description = "Member to check"] member: Option<serenity::Member>,
    ) -> Result<(), Error> {
        let (user, name) = match &member {
            Some(m) => (m.user.clone(), m.display_name().to_string()),
            None => (ctx.author().clone(), ctx.author().name.clone()),
        };
        let balance = ctx.data().service.economy.balance(user.id.get()).await?;

        let embed = CreateEmbed::new()
            .title(format!("{name}'s Balance"))
            .color(GOLD)
            .thumbnail(user.face())
            .field("Coins", format!("💰 {balance}"), false);
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Claim your daily reward
    #[poise::command(prefix_command, slash_command, category = "Economy")]
    pub async fn daily(ctx: Context<'_>) -> Result<(), Error> {
        let reward = ctx
            .data()
            .service
            .economy
            .claim_daily(ctx.author().id.get(), Utc::now())
            .await?;

        let mut embed = CreateEmbed::new()
            .title("Daily Reward Claimed!")
            .description(format!("You've received **{}** coins!", reward.total()))
            .color(GREEN)
            .field("Base Reward", format!("{} coins", reward.base), true)
            .field("Streak Bonus", format!("{} coins", reward.streak_bonus), true)
            .field(
                "Current Streak",
                format!("🔥 {}", plural_days(reward.streak)),
                false,
            );
        if let Some(bonus) = reward.milestone_bonus {
            embed = embed.field(
                format!("{}-Day Streak Bonus!", reward.streak),
                format!("🎉 +{bonus} coins"),
                false,
            );
        }
        embed = embed.footer(CreateEmbedFooter::new(format!(
            "Balance: {} coins",
            reward.balance
        )));
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Work a random job for coins
    #[poise::command(prefix_command, slash_command, category = "Economy")]
    pub async fn work(ctx: Context<'_>) -> Result<(), Error> {
        let result = ctx
            .data()
            .service
            .economy
            .work(ctx.author().id.get(), Utc::now())
            .await?;

        let embed = CreateEmbed::new()
            .title(format!("You worked as a {}", result.job))
            .description(format!("You earned **{}** coins!", result.earnings))
            .color(GREEN)
            .footer(CreateEmbedFooter::new(format!(
                "Balance: {} coins",
                result.balance
            )));
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Gamble your coins on a roll of 1-100
    #[poise::command(prefix_command, slash_command, category = "Economy")]
    pub async fn gamble(
        ctx: Context<'_>,
        #[description = "Coins to bet"] amount: i64,
    ) -> Result<(), Error> {
        let result = ctx
            .data()
            .service
            .economy
            .gamble(ctx.author().id.get(), amount)
            .await?;

        let (description, color) = match result.outcome {
            GambleOutcome::Lose => (
                format!("You rolled **{}** and lost **{amount}** coins!", result.roll),
                RED,
            ),
            GambleOutcome::BreakEven => (
                format!(
                    "You rolled **{}** and broke even. Your bet has been returned.",
                    result.roll
                ),
                BLUE,
            ),
            GambleOutcome::Win => (
                format!(
                    "You rolled **{}** and won **{}** coins! (1.5x your bet)",
                    result.roll, result.payout
                ),
                GREEN,
            ),
            GambleOutcome::Jackpot => (
                format!(
                    "You rolled **{}** and won **{}** coins! (2x your bet)",
                    result.roll, result.payout
                ),
                GREEN,
            ),
        };
        let embed = CreateEmbed::new()
            .title("🎲 Gambling Results")
            .description(description)
            .color(color)
            .field("New Balance", format!("💰 {} coins", result.balance), false);
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Give coins to another member
    #[poise::command(prefix_command, slash_command, guild_only, category = "Economy")]
    pub async fn give(
        ctx: Context<'_>,
        #[description = "Member to give coins to"] member: serenity::Member,
        #[description = "Coins to give"] amount: i64,
    ) -> Result<(), Error> {
        ctx.data()
            .service
            .economy
            .give(ctx.author().id.get(), member.user.id.get(), amount)
            .await?;

        let embed = CreateEmbed::new()
            .title("Coins Transferred")
            .description(format!(
                "{} gave {} **{amount}** coins!",
                ctx.author().mention(),
                member.mention()
            ))
            .color(GREEN);
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Browse the server shop
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Economy",
        subcommands(
            "Self::shop_list",
            "Self::shop_addrole",
            "Self::shop_removerole",
            "Self::shop_additem",
            "Self::shop_removeitem"
        )
    )]
    pub async fn shop(ctx: Context<'_>) -> Result<(), Error> {
        EconomyCog::show_shop(ctx).await
    }

    /// List the items for sale
    #[poise::command(prefix_command, slash_command, guild_only, rename = "list")]
    pub async fn shop_list(ctx: Context<'_>) -> Result<(), Error> {
        EconomyCog::show_shop(ctx).await
    }

    async fn show_shop(ctx: Context<'_>) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let shop = ctx
            .data()
            .service
            .settings
            .get_server_settings(guild_id.get())
            .await?
            .shop;

        let mut embed = CreateEmbed::new()
            .title("Server Shop")
            .description(format!(
                "Use `{}buy <item_id>` to purchase an item",
                ctx.prefix()
            ))
            .color(BLUE);
        if !shop.roles.is_empty() {
            let roles = shop
                .roles
                .iter()
                .map(|(id, r)| format!("**{id}**: <@&{}> - {} coins", r.role_id, r.price))
                .collect::<Vec<_>>()
                .join("\n");
            embed = embed.field("Roles", roles, false);
        }
        if !shop.items.is_empty() {
            let items = shop
                .items
                .iter()
                .map(|(id, i)| {
                    format!("**{id}**: {} - {} coins\n{}", i.name, i.price, i.description)
                })
                .collect::<Vec<_>>()
                .join("\n");
            embed = embed.field("Items", items, false);
        }
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Add a role to the shop
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        rename = "addrole",
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn shop_addrole(
        ctx: Context<'_>,
        #[description = "Role to sell"] role: serenity::Role,
        #[description = "Price in coins"] price: i64,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let id = ctx
            .data()
            .service
            .economy
            .add_shop_role(guild_id.get(), role.id.get(), &role.name, price)
            .await?;
        ctx.say(format!(
            "Added {} to the shop for {price} coins (ID {id}).",
            role.mention()
        ))
        .await?;
        Ok(())
    }

    /// Remove a role from the shop
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        rename = "removerole",
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn shop_removerole(
        ctx: Context<'_>,
        #[description = "Shop ID of the role"] item_id: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let role = ctx
            .data()
            .service
            .economy
            .remove_shop_role(guild_id.get(), &item_id)
            .await?;
        ctx.say(format!("Removed <@&{}> from the shop.", role.role_id))
            .await?;
        Ok(())
    }

    /// Add a generic item to the shop
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        rename = "additem",
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn shop_additem(
        ctx: Context<'_>,
        #[description = "Item name"] name: String,
        #[description = "Price in coins"] price: i64,
        #[description = "Item description"]
        #[rest]
        description: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let id = ctx
            .data()
            .service
            .economy
            .add_shop_item(guild_id.get(), &name, price, &description)
            .await?;
        ctx.say(format!(
            "Added {name} to the shop for {price} coins (ID {id})."
        ))
        .await?;
        Ok(())
    }

    /// Remove a generic item from the shop
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        rename = "removeitem",
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn shop_removeitem(
        ctx: Context<'_>,
        #[description = "Shop ID of the item"] item_id: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let item = ctx
            .data()
            .service
            .economy
            .remove_shop_item(guild_id.get(), &item_id)
            .await?;
        ctx.say(format!("Removed {} from the shop.", item.name))
            .await?;
        Ok(())
    }

    /// Buy an item from the shop
    #[poise::command(prefix_command, slash_command, guild_only, category = "Economy")]
    pub async fn buy(
        ctx: Context<'_>,
        #[description = "Shop ID of the item"] item_id: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let user_id = ctx.author().id;
        let economy = &ctx.data().service.economy;
        let entry = economy.shop_entry(guild_id.get(), &item_id).await?;
        let price = entry.price();

        match entry {
            ShopEntry::Role(item) => {
                let role_id = serenity::RoleId::new(item.role_id);
                let role_exists = ctx
                    .guild()
                    .is_some_and(|g| g.roles.contains_key(&role_id));
                if !role_exists {
                    return Err(BotError::InvalidCommandArgument {
                        parameter: "item_id".to_string(),
                        reason: "That role no longer exists.".to_string(),
                    }
                    .into());
                }
                let member = guild_id.member(ctx, user_id).await?;
                if member.roles.contains(&role_id) {
                    return Err(BotError::InvalidCommandArgument {
                        parameter: "item_id".to_string(),
                        reason: format!("You already have the {} role.", item.name),
                    }
                    .into());
                }

                economy.debit(user_id.get(), price).await?;
                if let Err(e) = ctx
                    .http()
                    .add_member_role(guild_id, user_id, role_id, Some("Shop purchase"))
                    .await
                {
                    economy.refund(user_id.get(), price).await?;
                    return Err(e.into());
                }
                ctx.say(format!(
                    "You purchased the {} role for {price} coins!",
                    role_id.mention()
                ))
                .await?;
            }
            ShopEntry::Item(item) => {
                economy.debit(user_id.get(), price).await?;
                ctx.say(format!("You purchased {} for {price} coins!", item.name))
                    .await?;
                match item.kind {
                    ShopItemKind::Status => {
                        ctx.say(format!("{} now has {}!", user_id.mention(), item.name))
                            .await?;
                    }
                    ShopItemKind::Command => {
                        ctx.say(format!(
                            "Please use `{}customcommand create <name> <response>` to set up your custom command.",
                            ctx.prefix()
                        ))
                        .await?;
                    }
                    ShopItemKind::Custom => {}
                }
            }
        }
        Ok(())
    }

    /// Manage your custom commands
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Economy",
        subcommands("Self::cc_create", "Self::cc_edit", "Self::cc_delete"),
        subcommand_required
    )]
    pub async fn customcommand(_ctx: Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// Create a custom command
    #[poise::command(prefix_command, slash_command, guild_only, rename = "create")]
    pub async fn cc_create(
        ctx: Context<'_>,
        #[description = "Command name"] name: String,
        #[description = "What the bot replies"]
        #[rest]
        response: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        let normalized = CustomCommandService::normalize(&name);
        if builtin_names().contains(&normalized) {
            return Err(BotError::InvalidCommandArgument {
                parameter: "name".to_string(),
                reason: format!("`{normalized}` is already a built-in command."),
            }
            .into());
        }
        let command = ctx
            .data()
            .service
            .custom_command
            .create(guild_id.get(), ctx.author().id.get(), &name, &response)
            .await?;
        ctx.say(format!(
            "Custom command `{}{}` created successfully!",
            ctx.prefix(),
            command.name
        ))
        .await?;
        Ok(())
    }

    /// Change the response of one of your custom commands
    #[poise::command(prefix_command, slash_command, guild_only, rename = "edit")]
    pub async fn cc_edit(
        ctx: Context<'_>,
        #[description = "Command name"] name: String,
        #[description = "New response"]
        #[rest]
        response: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        ctx.data()
            .service
            .custom_command
            .edit(guild_id.get(), ctx.author().id.get(), &name, &response)
            .await?;
        ctx.say(format!(
            "Custom command `{}{}` updated successfully!",
            ctx.prefix(),
            CustomCommandService::normalize(&name)
        ))
        .await?;
        Ok(())
    }

    /// Delete one of your custom commands
    #[poise::command(prefix_command, slash_command, guild_only, rename = "delete")]
    pub async fn cc_delete(
        ctx: Context<'_>,
        #[description = "Command name"] name: String,
    ) -> Result<(), Error> {
        let guild_id = guild_id(ctx)?;
        ctx.data()
            .service
            .custom_command
            .delete(guild_id.get(), ctx.author().id.get(), &name)
            .await?;
        ctx.say(format!(
            "Custom command `{}{}` deleted successfully!",
            ctx.prefix(),
            CustomCommandService::normalize(&name)
        ))
        .await?;
        Ok(())
    }

    /// Add coins to a member
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Economy",
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn addcoins(
        ctx: Context<'_>,
        #[description = "Member to credit"] member: serenity::Member,
        #[description = "Coins to add"] amount: i64,
    ) -> Result<(), Error> {
        ctx.data()
            .service
            .economy
            .add_coins(member.user.id.get(), amount)
            .await?;
        ctx.say(format!("Added {amount} coins to {}.", member.mention()))
            .await?;
        Ok(())
    }

    /// Remove coins from a member
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Economy",
        required_permissions = "ADMINISTRATOR"
    )]
    pub async fn removecoins(
        ctx: Context<'_>,
        #[description = "Member to debit"] member: serenity::Member,
        #[description = "Coins to remove"] amount: i64,
    ) -> Result<(), Error> {
        let (removed, _) = ctx
            .data()
            .service
            .economy
            .remove_coins(member.user.id.get(), amount)
            .await?;
        ctx.say(format!("Removed {removed} coins from {}.", member.mention()))
            .await?;
        Ok(())
    }

    /// Richest members of this server
    #[poise::command(
        prefix_command,
        slash_command,
        guild_only,
        category = "Economy",
        aliases("eltop", "moneytop")
    )]
    pub async fn economy_leaderboard(
        ctx: Context<'_>,
        #[description = "Page number"] page: Option<u32>,
    ) -> Result<(), Error> {
        let member_ids = guild_member_ids(ctx)?;
        let opts = LeaderboardOptBuilder::default()
            .kind(LeaderboardKind::Coins)
            .user_ids(Some(member_ids));
        let count_opts = opts.build()?;
        let (_, total) = ctx
            .data()
            .service
            .user
            .leaderboard(&count_opts)
            .await?;
        if total == 0 {
            ctx.say("No users found in the economy leaderboard for this server.")
                .await?;
            return Ok(());
        }

        let (offset, pages) = page_bounds(page, total)?;
        let opts = opts.offset(Some(offset)).limit(Some(PAGE_SIZE)).build()?;
        let (entries, _) = ctx.data().service.user.leaderboard(&opts).await?;
        let ids: Vec<u64> = entries.iter().map(|e| e.user_id).collect();
        let names = member_names(ctx, &ids);
        let page = offset / PAGE_SIZE + 1;
        let guild_name = ctx
            .guild()
            .map(|g| g.name.clone())
            .unwrap_or_else(|| "Server".to_string());

        let mut embed = CreateEmbed::new()
            .title(format!("{guild_name} Economy Leaderboard"))
            .description(format!("Page {page}/{pages}"))
            .color(GOLD);
        for (i, entry) in entries.iter().enumerate() {
            let rank = offset + i as u32 + 1;
            let name = names
                .get(&entry.user_id)
                .cloned()
                .unwrap_or_else(|| format!("<@{}>", entry.user_id));
            embed = embed.field(
                format!("{}#{rank}: {name}", medal(rank)),
                format!("💰 {} coins", entry.value),
                false,
            );
        }
        embed = embed.footer(CreateEmbedFooter::new(format!(
            "Use {}economy_leaderboard <page> to navigate pages",
            ctx.prefix()
        )));
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

impl Cog for EconomyCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![
            Self::balance(),
            Self::daily(),
            Self::work(),
            Self::gamble(),
            Self::give(),
            Self::shop(),
            Self::buy(),
            Self::customcommand(),
            Self::addcoins(),
            Self::removecoins(),
            Self::economy_leaderboard(),
        ]
    }
}
