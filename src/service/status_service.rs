//! The rotating presence list, persisted in bot metadata.

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::model::BotMetaKey;
use crate::service::error::ServiceError;
use crate::service::internal_service::InternalService;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Playing,
    Listening,
    Watching,
    Streaming,
    Competing,
}

impl StatusKind {
    pub const ALL: [StatusKind; 5] = [
        StatusKind::Playing,
        StatusKind::Listening,
        StatusKind::Watching,
        StatusKind::Streaming,
        StatusKind::Competing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StatusKind::Playing => "playing",
            StatusKind::Listening => "listening",
            StatusKind::Watching => "watching",
            StatusKind::Streaming => "streaming",
            StatusKind::Competing => "competing",
        }
    }
}

impl FromStr for StatusKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .ok_or_else(|| {
                ServiceError::InvalidArgument(format!(
                    "Invalid status type. Use one of: {}",
                    Self::ALL.map(|k| k.name()).join(", ")
                ))
            })
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One presence in the rotation. `text` may contain `{guilds}` and `{users}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusEntry {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusEntry {
    pub fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn render(&self, guilds: usize, users: usize) -> String {
        self.text
            .replace("{guilds}", &guilds.to_string())
            .replace("{users}", &users.to_string())
    }
}

pub fn default_rotation() -> Vec<StatusEntry> {
    use StatusKind::*;
    vec![
        StatusEntry::new(Playing, "!help"),
        StatusEntry::new(Playing, "with {guilds} servers"),
        StatusEntry::new(Watching, "{users} users"),
        StatusEntry::new(Competing, "the best Discord experience"),
        StatusEntry::new(Watching, "your commands"),
        StatusEntry::new(Playing, "with roles and levels"),
        StatusEntry::new(Competing, "the server top"),
        StatusEntry::new(Listening, "!help"),
        StatusEntry::new(Listening, "music for you"),
        StatusEntry::new(Playing, "Use !status to change me"),
    ]
}

pub struct StatusService {
    internal: Arc<InternalService>,
}

impl StatusService {
    pub fn new(internal: Arc<InternalService>) -> Self {
        Self { internal }
    }

    /// The stored rotation, or the default one when nothing was saved yet.
    pub async fn rotation(&self) -> Result<Vec<StatusEntry>, ServiceError> {
        match self.internal.get_meta(BotMetaKey::StatusRotation).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| ServiceError::UnexpectedResult {
                message: format!("Corrupt status rotation: {e}"),
            }),
            None => Ok(default_rotation()),
        }
    }

    async fn save(&self, rotation: &[StatusEntry]) -> Result<(), ServiceError> {
        let raw = serde_json::to_string(rotation).map_err(|e| ServiceError::UnexpectedResult {
            message: e.to_string(),
        })?;
        self.internal
            .set_meta(BotMetaKey::StatusRotation, raw)
            .await?;
        Ok(())
    }

    /// Appends an entry. Returns the new length.
    pub async fn add(&self, entry: StatusEntry) -> Result<usize, ServiceError> {
        let mut rotation = self.rotation().await?;
        rotation.push(entry);
        self.save(&rotation).await?;
        Ok(rotation.len())
    }

    /// Removes the entry at a 1-based index. Returns it and the new length.
    pub async fn remove(&self, index: usize) -> Result<(StatusEntry, usize), ServiceError> {
        let mut rotation = self.rotation().await?;
        if index < 1 || index > rotation.len() {
            return Err(ServiceError::InvalidArgument(format!(
                "Invalid index. It must be between 1 and {}.",
                rotation.len()
            )));
        }
        let removed = rotation.remove(index - 1);
        self.save(&rotation).await?;
        Ok((removed, rotation.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_kind_parses_case_insensitively() {
        assert_eq!("Watching".parse::<StatusKind>().unwrap(), StatusKind::Watching);
        assert!("dancing".parse::<StatusKind>().is_err());
    }

    #[test]
    fn test_render_replaces_placeholders() {
        let entry = StatusEntry::new(StatusKind::Playing, "with {guilds} servers and {users} users");
        assert_eq!(entry.render(3, 120), "with 3 servers and 120 users");
    }

    #[test]
    fn test_default_rotation_has_ten_entries() {
        assert_eq!(default_rotation().len(), 10);
    }
}
