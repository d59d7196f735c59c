//! Parsing of the reports written by `ffmpeg -progress`
//!
//! ffmpeg writes blocks of `key=value` lines, each block terminated by a
//! `progress=continue` (or `progress=end`) line.

use serde::Serialize;

/// Value used by ffmpeg for a field that is not available yet
pub const NOT_AVAILABLE: &str = "N/A";

/// Whether a report is the last one of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressState {
    #[default]
    Continue,
    End,
}

/// One `-progress` report
///
/// Values are kept as ffmpeg writes them; for multi-variant HLS outputs
/// `bitrate` and `total_size` are always `N/A`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HlsStreamProgress {
    pub bitrate: String,
    pub total_size: String,
    /// Output time produced so far, in microseconds
    pub out_time_us: String,
    /// Same as `out_time_us` (deprecated by ffmpeg, see trac ticket 7345)
    pub out_time_ms: String,
    /// Output time as `HH:MM:SS.mmmmmm`
    pub out_time: String,
    /// Encoding speed as a multiple of real time (e.g. `1x`)
    pub speed: String,
    pub progress: ProgressState,
}

impl Default for HlsStreamProgress {
    fn default() -> Self {
        Self {
            bitrate: NOT_AVAILABLE.to_string(),
            total_size: NOT_AVAILABLE.to_string(),
            out_time_us: NOT_AVAILABLE.to_string(),
            out_time_ms: NOT_AVAILABLE.to_string(),
            out_time: NOT_AVAILABLE.to_string(),
            speed: "0.0x".to_string(),
            progress: ProgressState::Continue,
        }
    }
}

impl HlsStreamProgress {
    /// Parses a report block; unknown keys are ignored
    pub fn parse(data: &str) -> Self {
        let mut report = Self::default();
        for line in data.lines() {
            report.apply_line(line);
        }
        report
    }

    fn apply_line(&mut self, line: &str) {
        let Some((key, value)) = line.trim_end_matches('\r').split_once('=') else {
            return;
        };
        let value = value.to_string();
        match key {
            "bitrate" => self.bitrate = value,
            "total_size" => self.total_size = value,
            "out_time_us" => self.out_time_us = value,
            "out_time_ms" => self.out_time_ms = value,
            "out_time" => self.out_time = value,
            "speed" => self.speed = value,
            "progress" => {
                self.progress = if value == "end" {
                    ProgressState::End
                } else {
                    ProgressState::Continue
                }
            }
            _ => {}
        }
    }

    /// `true` once ffmpeg reports a concrete output time
    pub fn is_available(&self) -> bool {
        self.out_time_us != NOT_AVAILABLE
    }

    pub fn is_end(&self) -> bool {
        self.progress == ProgressState::End
    }
}

/// Accumulates stdout lines until a complete report is available
#[derive(Debug, Default)]
pub struct ProgressReader {
    current: Option<HlsStreamProgress>,
}

impl ProgressReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line, returning the report it completes, if any
    pub fn push_line(&mut self, line: &str) -> Option<HlsStreamProgress> {
        let report = self.current.get_or_insert_with(HlsStreamProgress::default);
        report.apply_line(line);
        if line.starts_with("progress=") {
            self.current.take()
        } else {
            None
        }
    }
}
