#[derive(Debug, thiserror::Error)]
pub enum MusicError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Not playing any music")]
    NothingPlaying,

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Could not load track: {0}")]
    SourceError(String),

    #[error("Spotify support is not configured.")]
    SpotifyNotConfigured,

    #[error("Spotify request failed: {0}")]
    SpotifyError(String),
}

impl From<reqwest::Error> for MusicError {
    fn from(value: reqwest::Error) -> Self {
        MusicError::SpotifyError(value.to_string())
    }
}

impl From<songbird::input::AudioStreamError> for MusicError {
    fn from(value: songbird::input::AudioStreamError) -> Self {
        MusicError::SourceError(value.to_string())
    }
}
