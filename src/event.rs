//! Gateway events republished on the [`EventBus`](event_bus::EventBus).
//!
//! Each event carries the serenity context it arrived with so subscribers can
//! call the Discord API.

use poise::serenity_prelude as serenity;
use serenity::ChannelId;
use serenity::GuildId;
use serenity::Member;
use serenity::Message;
use serenity::MessageId;
use serenity::Role;
use serenity::RoleId;
use serenity::User;
use serenity::VoiceState;

pub mod event_bus;

/// Marker for types that can be published on the event bus.
pub trait Event: std::any::Any + Clone + Send + Sync + 'static {
    fn event_name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// A guild message from a human author.
#[derive(Clone)]
pub struct MessageEvent {
    pub ctx: serenity::Context,
    pub message: Message,
}

impl Event for MessageEvent {}

#[derive(Clone)]
pub struct MessageDeleteEvent {
    pub ctx: serenity::Context,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

impl Event for MessageDeleteEvent {}

/// An edited message. `old` is only known when it was cached.
#[derive(Clone)]
pub struct MessageEditEvent {
    pub ctx: serenity::Context,
    pub guild_id: GuildId,
    pub old: Option<Message>,
    pub new: Message,
}

impl Event for MessageEditEvent {}

#[derive(Clone)]
pub struct MemberJoinEvent {
    pub ctx: serenity::Context,
    pub member: Member,
}

impl Event for MemberJoinEvent {}

#[derive(Clone)]
pub struct MemberLeaveEvent {
    pub ctx: serenity::Context,
    pub guild_id: GuildId,
    pub user: User,
    pub member: Option<Member>,
}

impl Event for MemberLeaveEvent {}

#[derive(Clone)]
pub struct MemberUpdateEvent {
    pub ctx: serenity::Context,
    pub old: Option<Member>,
    pub new: Member,
}

impl Event for MemberUpdateEvent {}

#[derive(Clone)]
pub struct VoiceStateEvent {
    pub ctx: serenity::Context,
    pub old: Option<VoiceState>,
    pub new: VoiceState,
}

impl Event for VoiceStateEvent {}

#[derive(Clone)]
pub enum RoleChange {
    Upserted(Role),
    Deleted(RoleId),
}

#[derive(Clone)]
pub struct RoleChangeEvent {
    pub ctx: serenity::Context,
    pub guild_id: GuildId,
    pub change: RoleChange,
}

impl Event for RoleChangeEvent {}
