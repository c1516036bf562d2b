//! Discord bot implementation and command handling.

pub mod checks;
pub mod commands;
pub mod error;
pub mod error_handler;
pub mod interactions;
pub mod utils;

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use anyhow::Result;
use log::debug;
use log::error;
use log::info;
use poise::Framework;
use poise::FrameworkOptions;
use poise::serenity_prelude as serenity;
use serenity::ClientBuilder;
use serenity::FullEvent;
use serenity::GatewayIntents;
use serenity::Interaction;
use serenity::ShardManager;
use serenity::UserId;
use songbird::Songbird;
use tokio::sync::Mutex;

use crate::bot::commands::Cog;
use crate::bot::commands::Cogs;
use crate::bot::error_handler::ErrorHandler;
use crate::config::Config;
use crate::event::MemberJoinEvent;
use crate::event::MemberLeaveEvent;
use crate::event::MemberUpdateEvent;
use crate::event::MessageDeleteEvent;
use crate::event::MessageEditEvent;
use crate::event::MessageEvent;
use crate::event::RoleChange;
use crate::event::RoleChangeEvent;
use crate::event::VoiceStateEvent;
use crate::event::event_bus::EventBus;
use crate::music::player::MusicManager;
use crate::music::source::Resolver;
use crate::music::source::YtDlpLoader;
use crate::music::spotify::SpotifyApi;
use crate::music::spotify::SpotifyClient;
use crate::service::Services;
use crate::subscriber::activity_subscriber::ActivitySubscriber;
use crate::subscriber::audit_log_subscriber::AuditLogSubscriber;
use crate::subscriber::automod_subscriber::AutomodSubscriber;
use crate::subscriber::custom_command_subscriber::CustomCommandSubscriber;
use crate::subscriber::greeting_subscriber::GreetingSubscriber;
use crate::subscriber::role_subscriber::RoleSubscriber;
use crate::subscriber::voice_state_subscriber::VoiceStateSubscriber;
use crate::task::giveaway_checker::GiveawayChecker;
use crate::task::guild_sync::GuildSyncTask;
use crate::task::reminder_checker::ReminderChecker;
use crate::task::status_rotation::PresenceState;
use crate::task::status_rotation::StatusRotationTask;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Data shared across bot commands and contexts.
pub struct Data {
    pub config: Arc<Config>,
    pub service: Arc<Services>,
    pub music: Arc<MusicManager>,
    pub presence: Arc<PresenceState>,
    pub event_bus: Arc<EventBus>,
    pub start_time: Instant,
}

impl Data {
    /// Wires every gateway subscriber once the bot's own id is known.
    fn register_subscribers(&self, bot_id: UserId) {
        let services = self.service.clone();
        let prefix = self.config.prefix.clone();

        let activity = Arc::new(ActivitySubscriber::new(services.clone(), prefix.clone()));
        let automod = Arc::new(AutomodSubscriber::new(services.clone(), bot_id.get()));
        let custom_commands = Arc::new(CustomCommandSubscriber::new(services.clone(), prefix));
        let audit_log = Arc::new(AuditLogSubscriber::new(services.clone()));
        let greetings = Arc::new(GreetingSubscriber::new(services.clone()));
        let roles = Arc::new(RoleSubscriber::new(services));
        let voice = Arc::new(VoiceStateSubscriber::new(self.music.clone(), bot_id));

        self.event_bus
            .register_subscriber::<MessageEvent, _>(activity)
            .register_subscriber::<MessageEvent, _>(automod)
            .register_subscriber::<MessageEvent, _>(custom_commands)
            .register_subscriber::<MessageEvent, _>(audit_log.clone())
            .register_subscriber::<MessageDeleteEvent, _>(audit_log.clone())
            .register_subscriber::<MessageEditEvent, _>(audit_log.clone())
            .register_subscriber::<MemberJoinEvent, _>(audit_log.clone())
            .register_subscriber::<MemberLeaveEvent, _>(audit_log.clone())
            .register_subscriber::<MemberUpdateEvent, _>(audit_log.clone())
            .register_subscriber::<VoiceStateEvent, _>(audit_log)
            .register_subscriber::<MemberJoinEvent, _>(greetings.clone())
            .register_subscriber::<MemberLeaveEvent, _>(greetings)
            .register_subscriber::<RoleChangeEvent, _>(roles)
            .register_subscriber::<VoiceStateEvent, _>(voice);
    }

    fn start_tasks(&self, ctx: &serenity::Context) {
        GiveawayChecker::new(self.service.giveaway.clone(), ctx.http.clone()).start();
        ReminderChecker::new(self.service.reminder.clone(), ctx.http.clone()).start();
        StatusRotationTask::new(
            self.service.status.clone(),
            self.presence.clone(),
            self.config.status_interval,
        )
        .start(ctx.clone());
        GuildSyncTask::new(self.service.clone(), self.config.user_sync_interval)
            .start(ctx.clone());
    }
}

/// Discord bot client and framework.
pub struct Bot {
    client_builder: Option<ClientBuilder>,
    shard_manager: Arc<Mutex<Option<Arc<ShardManager>>>>,
}

impl Bot {
    /// Creates a new bot instance with all required components.
    pub async fn new(config: Arc<Config>, service: Arc<Services>) -> Result<Self> {
        info!("Initializing bot...");

        let songbird = Songbird::serenity();
        let http_client = reqwest::Client::new();
        let spotify = config.spotify.clone().map(|credentials| {
            Arc::new(SpotifyClient::new(credentials, http_client.clone())) as Arc<dyn SpotifyApi>
        });
        if spotify.is_none() {
            info!("Spotify credentials not set, Spotify links are disabled.");
        }
        let resolver = Arc::new(Resolver::new(
            spotify,
            Arc::new(YtDlpLoader::new(http_client.clone())),
        ));
        let presence = Arc::new(PresenceState::new());
        let music = Arc::new(MusicManager::new(
            songbird.clone(),
            http_client,
            resolver,
            presence.clone(),
            service.status.clone(),
        ));

        let data = Data {
            config: config.clone(),
            service,
            music,
            presence,
            event_bus: Arc::new(EventBus::new()),
            start_time: Instant::now(),
        };
        let framework = Self::create_framework(&config, data)?;
        let (token, intents) = Self::create_client_config(&config);

        let client_builder = ClientBuilder::new(token, intents)
            .framework(framework)
            .voice_manager_arc(songbird);

        Ok(Self {
            client_builder: Some(client_builder),
            shard_manager: Arc::new(Mutex::new(None)),
        })
    }

    /// Starts the bot client in a background task.
    pub fn start(&mut self) {
        info!("Starting bot client...");
        let Some(client_builder) = self.client_builder.take() else {
            error!("Bot client was already started.");
            return;
        };
        let shard_manager = self.shard_manager.clone();

        tokio::spawn(async move {
            info!("Connecting bot to Discord...");
            let mut client = match client_builder.await {
                Ok(client) => client,
                Err(e) => {
                    error!("Failed to build Discord client: {e}");
                    return;
                }
            };
            *shard_manager.lock().await = Some(client.shard_manager.clone());
            info!("Bot connected to Discord.");

            if let Err(e) = client.start().await {
                error!("Bot client crashed: {e}");
            }
        });

        info!("Bot client start initiated.");
    }

    /// Closes every shard of a running client.
    pub async fn shutdown(&self) {
        if let Some(shard_manager) = self.shard_manager.lock().await.as_ref() {
            shard_manager.shutdown_all().await;
        }
    }

    /// Creates the Poise framework with commands and configuration.
    fn create_framework(config: &Config, data: Data) -> Result<Framework<Data, Error>> {
        let cogs = Cogs;
        let mut owners = HashSet::new();
        if let Some(admin_id) = &config.admin_id {
            owners.insert(
                UserId::from_str(admin_id).map_err(|_| anyhow::anyhow!("Invalid admin ID"))?,
            );
        }

        let options = FrameworkOptions::<Data, Error> {
            commands: cogs.commands(),
            on_error: |error| Box::pin(Self::on_error(error)),
            event_handler: |ctx, event, _framework, data| {
                Box::pin(BotEventHandler::dispatch(ctx, event, data))
            },
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.prefix.clone()),
                edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(
                    Duration::from_secs(3600),
                ))),
                ..Default::default()
            },
            owners,
            ..Default::default()
        };

        Ok(poise::Framework::builder()
            .options(options)
            .setup(move |ctx, ready, _framework| {
                Box::pin(async move {
                    info!(
                        "Logged in as {} in {} guilds.",
                        ready.user.name,
                        ready.guilds.len()
                    );
                    data.register_subscribers(ready.user.id);
                    data.start_tasks(ctx);
                    Ok(data)
                })
            })
            .build())
    }

    /// Creates Discord client configuration (token and intents).
    fn create_client_config(config: &Config) -> (String, GatewayIntents) {
        let intents = GatewayIntents::non_privileged()
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::MESSAGE_CONTENT;
        (config.discord_token.clone(), intents)
    }

    /// Handles framework errors by delegating to the error handler.
    async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
        ErrorHandler::handle(error).await;
    }
}

/// Republishes gateway events on the event bus and routes component clicks.
pub struct BotEventHandler;

impl BotEventHandler {
    async fn dispatch(
        ctx: &serenity::Context,
        event: &FullEvent,
        data: &Data,
    ) -> Result<(), Error> {
        let bus = &data.event_bus;
        match event {
            FullEvent::Message { new_message } => {
                if !new_message.author.bot {
                    bus.publish(MessageEvent {
                        ctx: ctx.clone(),
                        message: new_message.clone(),
                    });
                }
            }
            FullEvent::MessageDelete {
                channel_id,
                deleted_message_id,
                guild_id: Some(guild_id),
            } => bus.publish(MessageDeleteEvent {
                ctx: ctx.clone(),
                guild_id: *guild_id,
                channel_id: *channel_id,
                message_id: *deleted_message_id,
            }),
            FullEvent::MessageUpdate {
                old_if_available,
                new: Some(new),
                event,
            } => {
                if let Some(guild_id) = event.guild_id
                    && !new.author.bot
                {
                    bus.publish(MessageEditEvent {
                        ctx: ctx.clone(),
                        guild_id,
                        old: old_if_available.clone(),
                        new: new.clone(),
                    });
                }
            }
            FullEvent::GuildMemberAddition { new_member } => bus.publish(MemberJoinEvent {
                ctx: ctx.clone(),
                member: new_member.clone(),
            }),
            FullEvent::GuildMemberRemoval {
                guild_id,
                user,
                member_data_if_available,
            } => bus.publish(MemberLeaveEvent {
                ctx: ctx.clone(),
                guild_id: *guild_id,
                user: user.clone(),
                member: member_data_if_available.clone(),
            }),
            FullEvent::GuildMemberUpdate {
                old_if_available,
                new: Some(new),
                ..
            } => bus.publish(MemberUpdateEvent {
                ctx: ctx.clone(),
                old: old_if_available.clone(),
                new: new.clone(),
            }),
            FullEvent::VoiceStateUpdate { old, new } => bus.publish(VoiceStateEvent {
                ctx: ctx.clone(),
                old: old.clone(),
                new: new.clone(),
            }),
            FullEvent::GuildRoleCreate { new } => bus.publish(RoleChangeEvent {
                ctx: ctx.clone(),
                guild_id: new.guild_id,
                change: RoleChange::Upserted(new.clone()),
            }),
            FullEvent::GuildRoleUpdate { new, .. } => bus.publish(RoleChangeEvent {
                ctx: ctx.clone(),
                guild_id: new.guild_id,
                change: RoleChange::Upserted(new.clone()),
            }),
            FullEvent::GuildRoleDelete {
                guild_id,
                removed_role_id,
                ..
            } => bus.publish(RoleChangeEvent {
                ctx: ctx.clone(),
                guild_id: *guild_id,
                change: RoleChange::Deleted(*removed_role_id),
            }),
            FullEvent::InteractionCreate {
                interaction: Interaction::Component(component),
            } => {
                debug!("Component interaction `{}`", component.data.custom_id);
                interactions::handle_component(ctx, data, component).await?;
            }
            _ => {}
        }
        Ok(())
    }
}
