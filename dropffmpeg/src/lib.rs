//! # dropffmpeg - Wrappers autour de `ffmpeg` et `ffprobe`
//!
//! - [`HlsStream`] : encodage HLS en temps réel par un processus `ffmpeg`,
//!   avec les rapports `-progress` transmis sur un canal `mpsc`
//! - [`HlsStreamOptions`] / [`HlsStreamArgs`] : options et arguments ffmpeg
//! - [`HlsStreamProgress`] : rapport de progression de l'encodeur
//! - [`ffprobe_format`] : durée et format d'un fichier média
//!
//! ## Exemple
//!
//! ```rust,no_run
//! use dropffmpeg::{HlsStream, HlsStreamOptions};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), dropffmpeg::HlsStreamError> {
//! let (stream, mut reports) = HlsStream::spawn(
//!     Path::new("meta-playlist.txt"),
//!     Path::new("/srv/stream"),
//!     &HlsStreamOptions::default(),
//! )?;
//!
//! while let Some(report) = reports.recv().await {
//!     println!("out_time_us = {}", report.out_time_us);
//! }
//! stream.wait().await
//! # }
//! ```

mod error;
mod ffprobe;
mod options;
mod progress;
mod stream;

pub use error::{FfprobeError, HlsStreamError};
pub use ffprobe::{ffprobe_format, parse_duration_us, FfprobeFormat, FfprobeResult};
pub use options::{HlsStreamArgs, HlsStreamFormat, HlsStreamOptions};
pub use progress::{HlsStreamProgress, ProgressReader, ProgressState, NOT_AVAILABLE};
pub use stream::HlsStream;
