//! Background loops started once the gateway is ready.

pub mod giveaway_checker;
pub mod guild_sync;
pub mod reminder_checker;
pub mod status_rotation;
