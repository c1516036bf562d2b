//! Replies to member-defined `!<name>` commands.

use std::sync::Arc;

use anyhow::Result;
use log::debug;

use crate::event::MessageEvent;
use crate::service::Services;
use crate::subscriber::Subscriber;

/// Extracts the lower-cased command name from a prefixed message.
pub fn invoked_name(content: &str, prefix: &str) -> Option<String> {
    let rest = content.strip_prefix(prefix)?;
    let name = rest.split_whitespace().next()?;
    Some(name.to_lowercase())
}

pub struct CustomCommandSubscriber {
    services: Arc<Services>,
    prefix: String,
}

impl CustomCommandSubscriber {
    pub fn new(services: Arc<Services>, prefix: String) -> Self {
        Self { services, prefix }
    }
}

#[async_trait::async_trait]
impl Subscriber<MessageEvent> for CustomCommandSubscriber {
    async fn callback(&self, event: MessageEvent) -> Result<()> {
        let message = &event.message;
        let Some(guild_id) = message.guild_id else {
            return Ok(());
        };
        let Some(name) = invoked_name(&message.content, &self.prefix) else {
            return Ok(());
        };
        let Some(command) = self
            .services
            .custom_command
            .get(guild_id.get(), &name)
            .await?
        else {
            return Ok(());
        };
        debug!("Custom command `{name}` invoked in guild {guild_id}");
        message
            .channel_id
            .say(&event.ctx.http, command.response)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoked_name() {
        assert_eq!(invoked_name("!Rules please", "!").as_deref(), Some("rules"));
        assert_eq!(invoked_name("rules", "!"), None);
        assert_eq!(invoked_name("! ", "!"), None);
    }
}
