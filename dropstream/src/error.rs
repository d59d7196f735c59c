use thiserror::Error;

/// Erreurs du service de streaming
#[derive(Debug, Error)]
pub enum Error {
    #[error("Playlist error: {0}")]
    Playlist(#[from] dropplaylist::Error),

    #[error("Encoder error: {0}")]
    Encoder(#[from] dropffmpeg::HlsStreamError),

    #[error("Invalid start instant '{value}': {source}")]
    InvalidStart {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Progress pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
