//! Spotify Web API lookups used to turn links into YouTube searches.

use std::num::NonZeroU32;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use governor::Quota;
use governor::RateLimiter;
use governor::clock::QuantaClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use log::debug;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::SpotifyCredentials;
use crate::music::error::MusicError;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_URL: &str = "https://api.spotify.com/v1";

/// A Spotify song reduced to what a YouTube search needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyTrack {
    pub name: String,
    pub artists: Vec<String>,
}

impl SpotifyTrack {
    /// `"name artist1 artist2"`, the query searched on YouTube.
    pub fn search_query(&self) -> String {
        let mut query = self.name.clone();
        for artist in &self.artists {
            query.push(' ');
            query.push_str(artist);
        }
        query
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotifyCollection {
    Playlist,
    Album,
}

impl SpotifyCollection {
    pub fn name(&self) -> &'static str {
        match self {
            SpotifyCollection::Playlist => "playlist",
            SpotifyCollection::Album => "album",
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    async fn track(&self, id: &str) -> Result<SpotifyTrack, MusicError>;

    /// First `limit` tracks of a playlist or album.
    async fn collection_tracks(
        &self,
        kind: SpotifyCollection,
        id: &str,
        limit: usize,
    ) -> Result<Vec<SpotifyTrack>, MusicError>;
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Client-credentials Spotify client with a cached access token.
pub struct SpotifyClient {
    credentials: SpotifyCredentials,
    client: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
    limiter: RateLimiter<NotKeyed, InMemoryState, QuantaClock>,
}

impl SpotifyClient {
    pub fn new(credentials: SpotifyCredentials, client: reqwest::Client) -> Self {
        let limiter = RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN),
        ));
        Self {
            credentials,
            client,
            token: Mutex::new(None),
            limiter,
        }
    }

    async fn access_token(&self) -> Result<String, MusicError> {
        let mut token = self.token.lock().await;
        if let Some(cached) = token.as_ref()
            && cached.expires_at > Instant::now()
        {
            return Ok(cached.value.clone());
        }

        debug!("Requesting Spotify access token");
        let response: Value = self
            .client
            .post(TOKEN_URL)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let value = response["access_token"]
            .as_str()
            .ok_or_else(|| MusicError::SpotifyError("token response has no access_token".into()))?
            .to_string();
        let expires_in = response["expires_in"].as_u64().unwrap_or(3600);
        // Refresh a minute early
        *token = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(expires_in.saturating_sub(60)),
        });
        Ok(value)
    }

    async fn get(&self, path: &str) -> Result<Value, MusicError> {
        self.limiter.until_ready().await;
        let token = self.access_token().await?;
        let response = self
            .client
            .get(format!("{API_URL}{path}"))
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    async fn track(&self, id: &str) -> Result<SpotifyTrack, MusicError> {
        let json = self.get(&format!("/tracks/{id}")).await?;
        parse_track(&json).ok_or_else(|| MusicError::SpotifyError("malformed track".into()))
    }

    async fn collection_tracks(
        &self,
        kind: SpotifyCollection,
        id: &str,
        limit: usize,
    ) -> Result<Vec<SpotifyTrack>, MusicError> {
        let path = match kind {
            SpotifyCollection::Playlist => format!("/playlists/{id}/tracks?limit={limit}"),
            SpotifyCollection::Album => format!("/albums/{id}/tracks?limit={limit}"),
        };
        let json = self.get(&path).await?;
        Ok(parse_items(kind, &json).into_iter().take(limit).collect())
    }
}

fn parse_track(json: &Value) -> Option<SpotifyTrack> {
    let name = json["name"].as_str()?.to_string();
    let artists = json["artists"]
        .as_array()
        .map(|artists| {
            artists
                .iter()
                .filter_map(|a| a["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    Some(SpotifyTrack { name, artists })
}

/// Playlist items wrap each track in `{ "track": ... }`, album items do not.
fn parse_items(kind: SpotifyCollection, json: &Value) -> Vec<SpotifyTrack> {
    let Some(items) = json["items"].as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match kind {
            SpotifyCollection::Playlist => parse_track(&item["track"]),
            SpotifyCollection::Album => parse_track(item),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_search_query_joins_artists() {
        let track = SpotifyTrack {
            name: "Song".into(),
            artists: vec!["A".into(), "B".into()],
        };
        assert_eq!(track.search_query(), "Song A B");
    }

    #[test]
    fn test_parse_items_playlist_and_album_shapes() {
        let playlist = json!({ "items": [
            { "track": { "name": "One", "artists": [{ "name": "X" }] } },
            { "track": null },
        ]});
        let album = json!({ "items": [
            { "name": "Two", "artists": [] },
        ]});

        let tracks = parse_items(SpotifyCollection::Playlist, &playlist);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].search_query(), "One X");

        let tracks = parse_items(SpotifyCollection::Album, &album);
        assert_eq!(tracks[0].name, "Two");
        assert!(tracks[0].artists.is_empty());
    }
}
