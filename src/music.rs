//! Voice playback: queues, sources and the songbird player.

pub mod error;
pub mod player;
pub mod queue;
pub mod source;
pub mod spotify;
