//! Media format probing with `ffprobe -show_format`

use crate::error::FfprobeError;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Format section of an `ffprobe -show_format` result
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FfprobeFormat {
    pub filename: String,
    #[serde(default)]
    pub nb_streams: u32,
    #[serde(default)]
    pub nb_programs: u32,
    #[serde(default)]
    pub nb_stream_groups: u32,
    #[serde(default)]
    pub format_name: String,
    #[serde(default)]
    pub format_long_name: String,
    /// Duration as `S+.ffffff` seconds
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub bit_rate: Option<String>,
    #[serde(default)]
    pub probe_score: i32,
}

impl FfprobeFormat {
    /// Duration in integer microseconds
    pub fn duration_us(&self) -> Result<u64, FfprobeError> {
        let duration = self
            .duration
            .as_deref()
            .ok_or(FfprobeError::MissingDuration)?;
        parse_duration_us(duration)
    }
}

/// Result of a format probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfprobeResult {
    pub format: FfprobeFormat,
}

#[derive(Deserialize)]
struct RawResult {
    format: Option<FfprobeFormat>,
}

impl FfprobeResult {
    /// Parses the JSON written by ffprobe
    pub fn from_json(data: &[u8]) -> Result<Self, FfprobeError> {
        let raw: RawResult = serde_json::from_slice(data)?;
        let format = raw.format.ok_or(FfprobeError::MissingFormat)?;
        Ok(Self { format })
    }
}

/// Parses `S+[.f{1,6}]` seconds to microseconds without floating point
///
/// Extra fractional digits beyond the microsecond are truncated.
pub fn parse_duration_us(value: &str) -> Result<u64, FfprobeError> {
    let invalid = || FfprobeError::InvalidDuration(value.to_string());
    let value = value.trim();
    let (seconds, fraction) = value.split_once('.').unwrap_or((value, ""));

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if seconds.is_empty() || !all_digits(seconds) || !all_digits(fraction) {
        return Err(invalid());
    }

    let seconds: u64 = seconds.parse().map_err(|_| invalid())?;
    let micros = fraction
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(6)
        .fold(0u64, |acc, b| acc * 10 + u64::from(b - b'0'));

    seconds
        .checked_mul(1_000_000)
        .and_then(|us| us.checked_add(micros))
        .ok_or_else(invalid)
}

/// Probes `input` with ffprobe and returns its format information
pub async fn ffprobe_format(input: impl AsRef<Path>) -> Result<FfprobeResult, FfprobeError> {
    let input = input.as_ref();
    let output = Command::new("ffprobe")
        .args(["-hide_banner", "-show_format", "-of", "json=c=1"])
        .arg(input)
        .output()
        .await
        .map_err(FfprobeError::Spawn)?;

    if !output.status.success() {
        return Err(FfprobeError::Exit {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let result = FfprobeResult::from_json(&output.stdout)?;
    debug!(file=%input.display(), duration=?result.format.duration, "Probed media format");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAV_JSON: &str = r#"{
        "format": {"filename": "file.wav", "nb_streams": 1, "nb_programs": 0,
                   "nb_stream_groups": 0, "format_name": "wav",
                   "format_long_name": "WAV / WAVE (Waveform Audio)",
                   "duration": "169.156646", "size": "32478120",
                   "bit_rate": "1536002", "probe_score": 99}
    }"#;

    #[test]
    fn test_parse_json() {
        let result = FfprobeResult::from_json(WAV_JSON.as_bytes()).unwrap();
        assert_eq!(result.format.filename, "file.wav");
        assert_eq!(result.format.format_name, "wav");
        assert_eq!(result.format.probe_score, 99);
        assert_eq!(result.format.duration_us().unwrap(), 169_156_646);
    }

    #[test]
    fn test_parse_json_errors() {
        assert!(matches!(
            FfprobeResult::from_json(b"{}"),
            Err(FfprobeError::MissingFormat)
        ));
        assert!(matches!(
            FfprobeResult::from_json(b"not json"),
            Err(FfprobeError::Json(_))
        ));

        let result = FfprobeResult::from_json(br#"{"format": {"filename": "x"}}"#).unwrap();
        assert!(matches!(
            result.format.duration_us(),
            Err(FfprobeError::MissingDuration)
        ));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_us("0.000001").unwrap(), 1);
        assert_eq!(parse_duration_us("12").unwrap(), 12_000_000);
        assert_eq!(parse_duration_us("12.5").unwrap(), 12_500_000);
        assert_eq!(parse_duration_us("3.1234567").unwrap(), 3_123_456);
        assert_eq!(parse_duration_us(" 7.25 ").unwrap(), 7_250_000);
    }

    #[test]
    fn test_parse_duration_invalid() {
        for value in ["", ".5", "N/A", "-1.0", "1.2.3", "1e3", "99999999999999999999"] {
            assert!(
                matches!(parse_duration_us(value), Err(FfprobeError::InvalidDuration(_))),
                "{value:?} should be rejected"
            );
        }
    }
}
