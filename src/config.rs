//! Environment-backed bot configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

/// Runtime configuration read from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    pub discord_token: String,
    pub admin_id: Option<String>,
    pub prefix: String,
    pub db_url: String,
    pub db_path: String,
    pub logs_path: PathBuf,
    pub spotify: Option<SpotifyCredentials>,
    pub status_interval: Duration,
    pub user_sync_interval: Duration,
    pub version: String,
}

#[derive(Clone, Debug)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Config {
    pub fn new() -> Self {
        Self {
            discord_token: String::new(),
            admin_id: None,
            prefix: "!".to_string(),
            db_url: "sqlite://data/data.db".to_string(),
            db_path: "data/data.db".to_string(),
            logs_path: PathBuf::from("logs"),
            spotify: None,
            status_interval: Duration::from_secs(300),
            user_sync_interval: Duration::from_secs(21600),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Overrides defaults with values from the environment.
    pub fn load(&mut self) -> Result<(), AppError> {
        self.discord_token = required("DISCORD_TOKEN")?;
        self.admin_id = optional("ADMIN_ID");

        if let Some(prefix) = optional("PREFIX") {
            self.prefix = prefix;
        }
        if let Some(db_url) = optional("DB_URL") {
            self.db_url = db_url;
        }
        if let Some(db_path) = optional("DB_PATH") {
            self.db_path = db_path;
        }
        if let Some(logs_path) = optional("LOGS_PATH") {
            self.logs_path = PathBuf::from(logs_path);
        }

        self.spotify = match (
            optional("SPOTIFY_CLIENT_ID"),
            optional("SPOTIFY_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => Some(SpotifyCredentials {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        if let Some(secs) = parse_secs("STATUS_INTERVAL")? {
            self.status_interval = secs;
        }
        if let Some(secs) = parse_secs("USER_SYNC_INTERVAL")? {
            self.user_sync_interval = secs;
        }

        Ok(())
    }
}

fn required(key: &str) -> Result<String, AppError> {
    optional(key).ok_or_else(|| AppError::MissingConfig {
        key: key.to_string(),
    })
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_secs(key: &str) -> Result<Option<Duration>, AppError> {
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|v| Some(Duration::from_secs(v.max(1))))
            .map_err(|_| AppError::ConfigurationError {
                msg: format!("{key} must be a whole number of seconds, got \"{raw}\""),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn clear_env() {
        for key in [
            "DISCORD_TOKEN",
            "ADMIN_ID",
            "PREFIX",
            "DB_URL",
            "DB_PATH",
            "LOGS_PATH",
            "SPOTIFY_CLIENT_ID",
            "SPOTIFY_CLIENT_SECRET",
            "STATUS_INTERVAL",
            "USER_SYNC_INTERVAL",
        ] {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn test_load_requires_token() {
        clear_env();
        let mut config = Config::new();
        match config.load() {
            Err(AppError::MissingConfig { key }) => assert_eq!(key, "DISCORD_TOKEN"),
            _ => panic!("Expected MissingConfig error"),
        }
    }

    #[test]
    #[serial]
    fn test_load_keeps_defaults() {
        clear_env();
        unsafe { std::env::set_var("DISCORD_TOKEN", "token") };
        let mut config = Config::new();
        config.load().unwrap();

        assert_eq!(config.prefix, "!");
        assert_eq!(config.db_url, "sqlite://data/data.db");
        assert_eq!(config.status_interval, Duration::from_secs(300));
        assert!(config.spotify.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_spotify_needs_both_keys() {
        clear_env();
        unsafe {
            std::env::set_var("DISCORD_TOKEN", "token");
            std::env::set_var("SPOTIFY_CLIENT_ID", "id");
        }
        let mut config = Config::new();
        config.load().unwrap();
        assert!(config.spotify.is_none());

        unsafe { std::env::set_var("SPOTIFY_CLIENT_SECRET", "secret") };
        config.load().unwrap();
        assert_eq!(config.spotify.unwrap().client_id, "id");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_rejects_bad_interval() {
        clear_env();
        unsafe {
            std::env::set_var("DISCORD_TOKEN", "token");
            std::env::set_var("STATUS_INTERVAL", "soon");
        }
        let mut config = Config::new();
        assert!(matches!(
            config.load(),
            Err(AppError::ConfigurationError { .. })
        ));
        clear_env();
    }
}
