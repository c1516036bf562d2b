//! Event subscribers that handle published events.

pub mod activity_subscriber;
pub mod audit_log_subscriber;
pub mod automod_subscriber;
pub mod custom_command_subscriber;
pub mod greeting_subscriber;
pub mod role_subscriber;
pub mod voice_state_subscriber;

use anyhow::Result;

/// Trait for event subscribers.
#[async_trait::async_trait]
pub trait Subscriber<E> {
    /// Called when an event of type E is published.
    async fn callback(&self, event: E) -> Result<()>;
}
