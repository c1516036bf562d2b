#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BotError {
    #[error("Invalid argument for {parameter}: {reason}")]
    InvalidCommandArgument { parameter: String, reason: String },

    #[error("This command can only be used in a server.")]
    GuildOnlyCommand,

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    HierarchyError(String),

    #[error("You need to be in a voice channel to use this command.")]
    NotInVoiceChannel,

    #[error("{0}")]
    MusicError(String),
}

impl From<crate::music::error::MusicError> for BotError {
    fn from(value: crate::music::error::MusicError) -> Self {
        BotError::MusicError(value.to_string())
    }
}
