//! Turns a `play` query into loadable targets.

use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serde_json::Value;
use songbird::input::Compose;
use songbird::input::YoutubeDl;

use crate::music::error::MusicError;
use crate::music::queue::Track;
use crate::music::spotify::SpotifyApi;
use crate::music::spotify::SpotifyCollection;

/// Upper bound on entries taken from any playlist or album.
pub const PLAYLIST_LIMIT: usize = 25;
/// Pause between background loads of playlist entries.
pub const BACKGROUND_SPACING: Duration = Duration::from_millis(500);

static SPOTIFY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://open\.spotify\.com/(track|playlist|album)/([a-zA-Z0-9]+)")
        .expect("valid regex")
});
static YOUTUBE_PLAYLIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?youtube\.com/playlist\?list=([a-zA-Z0-9_-]+)")
        .expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    SpotifyTrack(String),
    SpotifyCollection(SpotifyCollection, String),
    YoutubePlaylist(String),
    Url(String),
    Search(String),
}

impl Query {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if let Some(caps) = SPOTIFY_RE.captures(input) {
            let id = caps[2].to_string();
            return match &caps[1] {
                "track" => Query::SpotifyTrack(id),
                "album" => Query::SpotifyCollection(SpotifyCollection::Album, id),
                _ => Query::SpotifyCollection(SpotifyCollection::Playlist, id),
            };
        }
        if YOUTUBE_PLAYLIST_RE.is_match(input) {
            return Query::YoutubePlaylist(input.to_string());
        }
        if input.starts_with("http://") || input.starts_with("https://") {
            return Query::Url(input.to_string());
        }
        Query::Search(input.to_string())
    }

    /// Message shown while a multi-entry query is being expanded.
    pub fn loading_notice(&self) -> Option<String> {
        match self {
            Query::SpotifyTrack(_) => {
                Some("Loading Spotify track... This may take a moment.".to_string())
            }
            Query::SpotifyCollection(kind, _) => Some(format!(
                "Loading Spotify {}... This may take a moment.",
                kind.name()
            )),
            Query::YoutubePlaylist(_) => {
                Some("Loading YouTube playlist... This may take a moment.".to_string())
            }
            _ => None,
        }
    }
}

/// Something yt-dlp can fetch: a page url or a search phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Url(String),
    Search(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackLoader: Send + Sync {
    /// Fetches metadata for a single target.
    async fn load(&self, target: &Target) -> Result<Track, MusicError>;

    /// Lists the first `limit` video urls of a YouTube playlist.
    async fn playlist_entries(&self, url: &str, limit: usize) -> Result<Vec<Target>, MusicError>;
}

/// [`TrackLoader`] backed by the `yt-dlp` executable.
pub struct YtDlpLoader {
    client: reqwest::Client,
}

impl YtDlpLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TrackLoader for YtDlpLoader {
    async fn load(&self, target: &Target) -> Result<Track, MusicError> {
        let mut source = match target {
            Target::Url(url) => YoutubeDl::new(self.client.clone(), url.clone()),
            Target::Search(query) => YoutubeDl::new_search(self.client.clone(), query.clone()),
        };
        let meta = source.aux_metadata().await?;
        let url = match (meta.source_url, target) {
            (Some(url), _) => url,
            (None, Target::Url(url)) => url.clone(),
            (None, Target::Search(_)) => {
                return Err(MusicError::SourceError(
                    "No results found for your query.".to_string(),
                ));
            }
        };
        Ok(Track {
            title: meta.title.unwrap_or_else(|| "Unknown title".to_string()),
            url,
            duration: meta.duration,
            uploader: meta.channel.or(meta.artist),
            thumbnail: meta.thumbnail,
        })
    }

    async fn playlist_entries(&self, url: &str, limit: usize) -> Result<Vec<Target>, MusicError> {
        debug!("Expanding YouTube playlist {url}");
        let output = tokio::process::Command::new("yt-dlp")
            .args(["--flat-playlist", "-J", "--playlist-end"])
            .arg(limit.to_string())
            .arg(url)
            .output()
            .await
            .map_err(|e| MusicError::SourceError(e.to_string()))?;
        if !output.status.success() {
            return Err(MusicError::SourceError(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        let json: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| MusicError::SourceError(e.to_string()))?;
        Ok(playlist_targets(&json, limit))
    }
}

fn playlist_targets(json: &Value, limit: usize) -> Vec<Target> {
    let Some(entries) = json["entries"].as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            entry["url"]
                .as_str()
                .map(str::to_string)
                .or_else(|| {
                    entry["id"]
                        .as_str()
                        .map(|id| format!("https://www.youtube.com/watch?v={id}"))
                })
                .map(Target::Url)
        })
        .take(limit)
        .collect()
}

/// Expands queries into ordered targets, Spotify links included when configured.
pub struct Resolver {
    spotify: Option<Arc<dyn SpotifyApi>>,
    loader: Arc<dyn TrackLoader>,
}

impl Resolver {
    pub fn new(spotify: Option<Arc<dyn SpotifyApi>>, loader: Arc<dyn TrackLoader>) -> Self {
        Self { spotify, loader }
    }

    pub fn loader(&self) -> &Arc<dyn TrackLoader> {
        &self.loader
    }

    fn spotify(&self) -> Result<&Arc<dyn SpotifyApi>, MusicError> {
        self.spotify.as_ref().ok_or(MusicError::SpotifyNotConfigured)
    }

    /// Targets for `query` in play order. Never empty on success.
    pub async fn targets(&self, query: &Query) -> Result<Vec<Target>, MusicError> {
        let targets = match query {
            Query::SpotifyTrack(id) => {
                let track = self.spotify()?.track(id).await?;
                vec![Target::Search(track.search_query())]
            }
            Query::SpotifyCollection(kind, id) => self
                .spotify()?
                .collection_tracks(*kind, id, PLAYLIST_LIMIT)
                .await?
                .iter()
                .map(|t| Target::Search(t.search_query()))
                .collect(),
            Query::YoutubePlaylist(url) => {
                self.loader.playlist_entries(url, PLAYLIST_LIMIT).await?
            }
            Query::Url(url) => vec![Target::Url(url.clone())],
            Query::Search(text) => vec![Target::Search(text.clone())],
        };
        if targets.is_empty() {
            return Err(MusicError::SourceError(
                "No results found for your query.".to_string(),
            ));
        }
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::music::spotify::MockSpotifyApi;
    use crate::music::spotify::SpotifyTrack;

    #[test]
    fn test_parse_query_kinds() {
        assert_eq!(
            Query::parse("https://open.spotify.com/track/abc123"),
            Query::SpotifyTrack("abc123".into())
        );
        assert_eq!(
            Query::parse("https://open.spotify.com/album/XYZ"),
            Query::SpotifyCollection(SpotifyCollection::Album, "XYZ".into())
        );
        assert!(matches!(
            Query::parse("https://www.youtube.com/playlist?list=PL_x-1"),
            Query::YoutubePlaylist(_)
        ));
        assert!(matches!(
            Query::parse("https://youtu.be/dQw4w9WgXcQ"),
            Query::Url(_)
        ));
        assert_eq!(
            Query::parse("  never gonna give you up "),
            Query::Search("never gonna give you up".into())
        );
    }

    #[test]
    fn test_loading_notice_only_for_expansions() {
        assert!(Query::Search("x".into()).loading_notice().is_none());
        assert_eq!(
            Query::SpotifyCollection(SpotifyCollection::Playlist, "p".into()).loading_notice(),
            Some("Loading Spotify playlist... This may take a moment.".to_string())
        );
    }

    #[test]
    fn test_playlist_targets_prefers_url_and_caps() {
        let json = json!({ "entries": [
            { "url": "https://www.youtube.com/watch?v=a" },
            { "id": "b" },
            { "title": "no id" },
            { "id": "c" },
        ]});
        assert_eq!(
            playlist_targets(&json, 2),
            vec![
                Target::Url("https://www.youtube.com/watch?v=a".into()),
                Target::Url("https://www.youtube.com/watch?v=b".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_spotify_collection_becomes_searches() {
        let mut spotify = MockSpotifyApi::new();
        spotify
            .expect_collection_tracks()
            .withf(|kind, id, limit| {
                *kind == SpotifyCollection::Playlist && id == "p1" && *limit == PLAYLIST_LIMIT
            })
            .returning(|_, _, _| {
                Ok(vec![
                    SpotifyTrack {
                        name: "One".into(),
                        artists: vec!["A".into()],
                    },
                    SpotifyTrack {
                        name: "Two".into(),
                        artists: vec![],
                    },
                ])
            });
        let resolver = Resolver::new(Some(Arc::new(spotify)), Arc::new(MockTrackLoader::new()));

        let targets = resolver
            .targets(&Query::SpotifyCollection(SpotifyCollection::Playlist, "p1".into()))
            .await
            .unwrap();
        assert_eq!(
            targets,
            vec![Target::Search("One A".into()), Target::Search("Two".into())]
        );
    }

    #[tokio::test]
    async fn test_spotify_without_credentials_fails() {
        let resolver = Resolver::new(None, Arc::new(MockTrackLoader::new()));
        let result = resolver.targets(&Query::SpotifyTrack("t".into())).await;
        assert!(matches!(result, Err(MusicError::SpotifyNotConfigured)));
    }

    #[tokio::test]
    async fn test_empty_playlist_is_an_error() {
        let mut loader = MockTrackLoader::new();
        loader
            .expect_playlist_entries()
            .returning(|_, _| Ok(Vec::new()));
        let resolver = Resolver::new(None, Arc::new(loader));
        let result = resolver
            .targets(&Query::YoutubePlaylist("https://youtube.com/playlist?list=x".into()))
            .await;
        assert!(matches!(result, Err(MusicError::SourceError(_))));
    }
}
