//! Role snapshots and role helpers.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::RoleModel;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}){1,2}$").expect("valid regex"));

/// Levels that `autoroles` creates "Level N" roles for.
pub const AUTO_ROLE_LEVELS: [u32; 5] = [5, 10, 20, 50, 100];

/// Parses `#rgb` or `#rrggbb` into a 24-bit colour.
pub fn parse_hex_color(input: &str) -> Result<u32, ServiceError> {
    if !HEX_COLOR_RE.is_match(input) {
        return Err(ServiceError::InvalidArgument(
            "Invalid color. Use a hex code such as `#ff0000` or `#f00`.".to_string(),
        ));
    }
    let hex = &input[1..];
    let expanded: String = if hex.len() == 3 {
        hex.chars().flat_map(|c| [c, c]).collect()
    } else {
        hex.to_string()
    };
    u32::from_str_radix(&expanded, 16)
        .map_err(|e| ServiceError::InvalidArgument(format!("Invalid color: {e}")))
}

pub struct RoleService {
    db: Arc<Repository>,
}

impl RoleService {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// Replaces the stored snapshot of a guild's roles.
    ///
    /// # Performance
    /// * DB calls: 1 + roles
    pub async fn sync_guild(&self, guild_id: u64, roles: &[RoleModel]) -> Result<(), ServiceError> {
        self.db.role.delete_by_guild(guild_id).await?;
        for role in roles {
            self.db.role.replace(role).await?;
        }
        Ok(())
    }

    pub async fn upsert(&self, role: &RoleModel) -> Result<(), ServiceError> {
        self.db.role.replace(role).await?;
        Ok(())
    }

    pub async fn remove(&self, role_id: u64) -> Result<(), ServiceError> {
        self.db.role.delete(&role_id).await?;
        Ok(())
    }

    pub async fn list(&self, guild_id: u64) -> Result<Vec<RoleModel>, ServiceError> {
        Ok(self.db.role.select_by_guild(guild_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff0000").unwrap(), 0xff0000);
        assert_eq!(parse_hex_color("#0F0").unwrap(), 0x00ff00);
        assert!(parse_hex_color("ff0000").is_err());
        assert!(parse_hex_color("#ff00").is_err());
        assert!(parse_hex_color("#gggggg").is_err());
    }
}
