//! zenshell-bot - An all-in-one Discord community bot.
//!
//! This crate provides a Discord bot implementation with features including:
//! - Leveling, achievements and an economy with a per-server shop
//! - Music playback from YouTube, SoundCloud and Spotify links
//! - Moderation, automod, audit logs and support tickets
//! - Polls, giveaways, reminders and greetings

pub mod bot;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod model;
pub mod music;
pub mod repository;
pub mod service;
pub mod subscriber;
pub mod task;
