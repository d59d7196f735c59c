//! Types d'erreurs pour dropplaylist

/// Erreurs du moteur de playlist
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Seek on a playlist with no entries
    #[error("Playlist must have entries to seek")]
    EmptyPlaylist,

    /// Seek with a negative elapsed time
    #[error("Seek time must be non-negative (got {0})")]
    NegativeSeekTime(i64),

    /// Seek on a playlist whose entries all have a zero duration
    #[error("Playlist has a total duration of zero, nothing can be played")]
    ZeroDuration,

    /// Encoder progress sample not available yet (`N/A`)
    #[error("Progress sample is not available")]
    SampleUnavailable,

    /// Encoder progress sample that is not an integer count of microseconds
    #[error("Invalid progress sample: {0:?}")]
    InvalidSample(String),

    #[error("Probe failed for {path}: {message}")]
    Probe { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type Result spécialisé pour dropplaylist
pub type Result<T> = std::result::Result<T, Error>;
