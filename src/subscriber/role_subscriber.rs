//! Keeps the stored role snapshot in step with role gateway events.

use std::sync::Arc;

use anyhow::Result;
use log::debug;

use crate::event::RoleChange;
use crate::event::RoleChangeEvent;
use crate::service::Services;
use crate::subscriber::Subscriber;
use crate::task::guild_sync::role_model;

pub struct RoleSubscriber {
    services: Arc<Services>,
}

impl RoleSubscriber {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait::async_trait]
impl Subscriber<RoleChangeEvent> for RoleSubscriber {
    async fn callback(&self, event: RoleChangeEvent) -> Result<()> {
        match event.change {
            RoleChange::Upserted(role) => {
                debug!("Role {} changed in guild {}", role.id, event.guild_id);
                self.services.role.upsert(&role_model(&role)).await?;
            }
            RoleChange::Deleted(role_id) => {
                debug!("Role {role_id} deleted in guild {}", event.guild_id);
                self.services.role.remove(role_id.get()).await?;
            }
        }
        Ok(())
    }
}
