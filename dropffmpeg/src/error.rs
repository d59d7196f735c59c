//! Error types for the ffmpeg / ffprobe wrappers

/// Errors raised by the HLS encoder process
#[derive(Debug, thiserror::Error)]
pub enum HlsStreamError {
    /// The ffmpeg child process could not be started
    #[error("ffmpeg child process failed: {0}")]
    Spawn(#[source] std::io::Error),

    /// ffmpeg exited with a non-zero code
    #[error("ffmpeg exited with code {code}: {stderr}")]
    Exit { code: i32, stderr: String },

    /// ffmpeg was terminated by a signal
    #[error("ffmpeg process was terminated by signal {0:?}")]
    Signal(Option<i32>),

    /// IO error while talking to the child process
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while probing a media file
#[derive(Debug, thiserror::Error)]
pub enum FfprobeError {
    #[error("ffprobe child process failed: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ffprobe exited with code {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("Failed to parse ffprobe output as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ffprobe output has no format section")]
    MissingFormat,

    #[error("ffprobe reported no duration")]
    MissingDuration,

    #[error("Invalid duration: {0:?}")]
    InvalidDuration(String),
}
