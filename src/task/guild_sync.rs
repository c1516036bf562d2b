/// Mirrors guild members, bans and roles into the database.
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use futures::StreamExt;
use log::error;
use log::info;
use log::warn;
use poise::serenity_prelude as serenity;
use serenity::GuildId;
use serenity::Role;
use tokio::time::interval;

use crate::model::RoleModel;
use crate::service::Services;

pub fn role_model(role: &Role) -> RoleModel {
    RoleModel {
        role_id: role.id.get(),
        guild_id: role.guild_id.get(),
        name: role.name.clone(),
        color: i64::from(role.colour.0),
        position: i64::from(role.position),
    }
}

/// Replaces the stored role snapshot of one guild.
pub async fn sync_roles(
    ctx: &serenity::Context,
    services: &Services,
    guild_id: GuildId,
) -> anyhow::Result<usize> {
    let roles = guild_id.roles(&ctx.http).await?;
    let models: Vec<RoleModel> = roles.values().map(role_model).collect();
    services.role.sync_guild(guild_id.get(), &models).await?;
    Ok(models.len())
}

/// Creates missing users for every non-bot member. Returns how many were created.
async fn sync_members(
    ctx: &serenity::Context,
    services: &Services,
    guild_id: GuildId,
) -> anyhow::Result<usize> {
    let mut created = 0;
    let mut members = guild_id.members_iter(&ctx.http).boxed();
    while let Some(member) = members.next().await {
        let member = member?;
        if member.user.bot {
            continue;
        }
        if services
            .user
            .ensure_user(member.user.id.get(), &member.user.name)
            .await?
        {
            created += 1;
        }
    }
    Ok(created)
}

/// Records every current guild ban that is not on file yet.
async fn sync_bans(
    ctx: &serenity::Context,
    services: &Services,
    guild_id: GuildId,
) -> anyhow::Result<usize> {
    let moderator = ctx.cache.current_user().id.get();
    let mut recorded = 0;
    for ban in guild_id.bans(&ctx.http, None, None).await? {
        let reason = ban.reason.as_deref().unwrap_or("Synced from server bans");
        if services
            .moderation
            .record_ban_if_missing(guild_id.get(), ban.user.id.get(), moderator, reason)
            .await?
        {
            recorded += 1;
        }
    }
    Ok(recorded)
}

pub async fn sync_guilds(ctx: &serenity::Context, services: &Services) {
    let start = Instant::now();
    let (mut users, mut bans) = (0, 0);
    for guild_id in ctx.cache.guilds() {
        match sync_members(ctx, services, guild_id).await {
            Ok(n) => users += n,
            Err(e) => error!("Failed to sync members of guild {guild_id}: {e}"),
        }
        match sync_bans(ctx, services, guild_id).await {
            Ok(n) => bans += n,
            // Missing Ban Members permission is common
            Err(e) => warn!("Failed to sync bans of guild {guild_id}: {e}"),
        }
    }
    info!(
        "Synced guilds: {users} new users, {bans} new bans ({:.2?})",
        start.elapsed()
    );
}

/// Runs [`sync_guilds`] immediately and then every `period`.
pub struct GuildSyncTask {
    services: Arc<Services>,
    period: Duration,
}

impl GuildSyncTask {
    pub fn new(services: Arc<Services>, period: Duration) -> Self {
        Self { services, period }
    }

    pub fn start(self, ctx: serenity::Context) {
        info!("Starting guild sync every {:?}", self.period);
        tokio::spawn(async move {
            for guild_id in ctx.cache.guilds() {
                if let Err(e) = sync_roles(&ctx, &self.services, guild_id).await {
                    error!("Failed to sync roles of guild {guild_id}: {e}");
                }
            }
            let mut interval = interval(self.period);
            loop {
                interval.tick().await;
                sync_guilds(&ctx, &self.services).await;
            }
        });
    }
}
