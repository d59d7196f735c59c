//! Extension pour intégrer la configuration du flux dans dropconfig
//!
//! Ce module fournit le trait `StreamConfigExt` qui ajoute à
//! `dropconfig::Config` les réglages de la radio (section `stream`).
//!
//! # Exemple
//!
//! ```no_run
//! use dropconfig::get_config;
//! use dropstream::StreamConfigExt;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//! let settings = config.get_stream_settings()?;
//! println!("Streaming {} into {}",
//!     settings.input_directory.display(),
//!     settings.output_directory.display());
//! # Ok(())
//! # }
//! ```

use crate::service::StreamSettings;
use crate::start::StartInstant;
use anyhow::Result;
use dropconfig::Config;
use serde_yaml::{Number, Value};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_INPUT_DIRECTORY: &str = "music";
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "stream";
pub const DEFAULT_FILE_EXTENSION: &str = "wav";
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_SEGMENT_DURATION: u32 = 1;
pub const DEFAULT_SEGMENT_COUNT: u32 = 50;

/// Trait d'extension pour gérer la configuration du flux dans dropconfig
///
/// Les répertoires relatifs sont résolus par rapport au répertoire de
/// configuration et créés s'ils n'existent pas.
pub trait StreamConfigExt {
    /// Répertoire des fichiers audio (`stream.input_directory`)
    fn get_stream_input_dir(&self) -> Result<PathBuf>;

    /// Répertoire de sortie HLS (`stream.output_directory`)
    fn get_stream_output_dir(&self) -> Result<PathBuf>;

    /// Extension des fichiers audio à lire (`stream.file_extension`, défaut `wav`)
    fn get_stream_file_extension(&self) -> Result<String>;

    /// Instant de démarrage RFC 3339 (`stream.start`), `None` pour « maintenant »
    fn get_stream_start(&self) -> Result<Option<String>>;

    /// Définit l'instant de démarrage
    fn set_stream_start(&self, start: &str) -> Result<()>;

    /// Intervalle minimum entre deux rapports de progression
    fn get_stream_progress_interval(&self) -> Result<Duration>;

    /// Durée d'un segment HLS en secondes (`stream.hls.segment_duration`)
    fn get_stream_segment_duration(&self) -> Result<u32>;

    /// Nombre de segments gardés dans les playlists HLS (`stream.hls.segment_count`)
    fn get_stream_segment_count(&self) -> Result<u32>;

    /// Tous les réglages du service de streaming
    fn get_stream_settings(&self) -> Result<StreamSettings>;
}

fn get_u64(config: &Config, path: &[&str], default: u64) -> Result<u64> {
    match config.get_value(path) {
        Ok(Value::Number(n)) => Ok(n.as_u64().unwrap_or(default)),
        Ok(Value::String(s)) => Ok(s.trim().parse().unwrap_or(default)),
        _ => {
            config.set_value(path, Value::Number(Number::from(default)))?;
            Ok(default)
        }
    }
}

fn get_u32(config: &Config, path: &[&str], default: u32) -> Result<u32> {
    let value = get_u64(config, path, u64::from(default))?;
    Ok(u32::try_from(value).unwrap_or(default))
}

impl StreamConfigExt for Config {
    fn get_stream_input_dir(&self) -> Result<PathBuf> {
        self.get_managed_dir(&["stream", "input_directory"], DEFAULT_INPUT_DIRECTORY)
            .map(PathBuf::from)
    }

    fn get_stream_output_dir(&self) -> Result<PathBuf> {
        self.get_managed_dir(&["stream", "output_directory"], DEFAULT_OUTPUT_DIRECTORY)
            .map(PathBuf::from)
    }

    fn get_stream_file_extension(&self) -> Result<String> {
        match self.get_value(&["stream", "file_extension"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            _ => {
                self.set_value(
                    &["stream", "file_extension"],
                    Value::String(DEFAULT_FILE_EXTENSION.to_string()),
                )?;
                Ok(DEFAULT_FILE_EXTENSION.to_string())
            }
        }
    }

    fn get_stream_start(&self) -> Result<Option<String>> {
        match self.get_value(&["stream", "start"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    fn set_stream_start(&self, start: &str) -> Result<()> {
        self.set_value(&["stream", "start"], Value::String(start.to_string()))
    }

    fn get_stream_progress_interval(&self) -> Result<Duration> {
        let ms = get_u64(
            self,
            &["stream", "progress_interval_ms"],
            DEFAULT_PROGRESS_INTERVAL_MS,
        )?;
        Ok(Duration::from_millis(ms))
    }

    fn get_stream_segment_duration(&self) -> Result<u32> {
        get_u32(
            self,
            &["stream", "hls", "segment_duration"],
            DEFAULT_SEGMENT_DURATION,
        )
    }

    fn get_stream_segment_count(&self) -> Result<u32> {
        get_u32(self, &["stream", "hls", "segment_count"], DEFAULT_SEGMENT_COUNT)
    }

    fn get_stream_settings(&self) -> Result<StreamSettings> {
        let start = self.get_stream_start()?;
        Ok(StreamSettings {
            input_directory: self.get_stream_input_dir()?,
            output_directory: self.get_stream_output_dir()?,
            file_extension: self.get_stream_file_extension()?,
            start: StartInstant::parse(start.as_deref())?,
            progress_interval: self.get_stream_progress_interval()?,
            segment_duration: self.get_stream_segment_duration()?,
            segment_count: self.get_stream_segment_count()?,
        })
    }
}
