//! HLS stream options and their translation to ffmpeg arguments
//!
//! See <https://ffmpeg.org/ffmpeg-formats.html#hls-2> for the meaning of the
//! HLS muxer options used here.

use std::path::Path;

/// Format options for an individual HLS variant stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsStreamFormat {
    /// Name of the variant, used in segment and playlist file names
    pub name: String,
    /// Bitrate in bits per second (e.g. `128k` or `1.53M`)
    pub bitrate: String,
    /// Sample rate in Hertz (e.g. `44100` or `44.1k`)
    pub sample_rate: String,
}

impl HlsStreamFormat {
    pub fn new(
        name: impl Into<String>,
        bitrate: impl Into<String>,
        sample_rate: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            bitrate: bitrate.into(),
            sample_rate: sample_rate.into(),
        }
    }
}

/// Options for an HLS encoding run
///
/// `segment_duration * segment_count` is the "buffer size" of the live
/// stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsStreamOptions {
    pub formats: Vec<HlsStreamFormat>,
    /// Start position in the input, in fractional seconds (e.g. `"5.345"`).
    /// Progress reports are relative to this position.
    pub seek_time: String,
    /// Segment duration in seconds
    pub segment_duration: u32,
    /// Number of segments kept in the variant playlists
    pub segment_count: u32,
    /// Master playlist name, without extension
    pub master_playlist_name: String,
    /// Suffix appended to segment file names, without extension
    pub segment_file_name_suffix: String,
    /// Variant playlist name, without extension
    pub playlist_name: String,
    /// Read the input with the concat demuxer (`-f concat -safe 0`)
    pub concat: bool,
    /// Input loop count (`-stream_loop`), `-1` loops forever
    pub loop_count: Option<i32>,
}

impl Default for HlsStreamOptions {
    fn default() -> Self {
        Self {
            formats: vec![
                HlsStreamFormat::new("01_highest", "1.528M", "96k"),
                HlsStreamFormat::new("02_high", "640k", "48k"),
                HlsStreamFormat::new("03_medium", "128k", "24k"),
                HlsStreamFormat::new("04_low", "32k", "12k"),
                HlsStreamFormat::new("05_lowest", "12k", "7350"),
            ],
            seek_time: "0".to_string(),
            segment_duration: 2,
            segment_count: 4,
            master_playlist_name: "00_stream".to_string(),
            segment_file_name_suffix: String::new(),
            playlist_name: "stream".to_string(),
            concat: false,
            loop_count: None,
        }
    }
}

/// Options translated to partial ffmpeg argument lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsStreamArgs {
    pub input_format: Vec<String>,
    pub seek_time: Vec<String>,
    /// One `-map 0:a` pair per output variant
    pub maps: Vec<String>,
    /// `-ar:a:<i> <rate>` per variant
    pub sample_rates: Vec<String>,
    /// `-b:a:<i> <bitrate>` per variant
    pub bitrates: Vec<String>,
    pub segment_duration: Vec<String>,
    pub segment_count: Vec<String>,
    /// `a:0,name:<n0> a:1,name:<n1> ...`
    pub var_stream_map: Vec<String>,
    pub master_playlist_name: Vec<String>,
    pub segment_file_name: Vec<String>,
    pub playlist_name: String,
}

impl From<&HlsStreamOptions> for HlsStreamArgs {
    fn from(options: &HlsStreamOptions) -> Self {
        let mut input_format = Vec::new();
        if let Some(count) = options.loop_count {
            input_format.extend(["-stream_loop".to_string(), count.to_string()]);
        }
        if options.concat {
            input_format.extend(["-f", "concat", "-safe", "0"].map(String::from));
        }

        let mut maps = Vec::new();
        let mut sample_rates = Vec::new();
        let mut bitrates = Vec::new();
        let mut var_stream_map = Vec::new();
        for (index, format) in options.formats.iter().enumerate() {
            maps.extend(["-map".to_string(), "0:a".to_string()]);
            sample_rates.extend([format!("-ar:a:{index}"), format.sample_rate.clone()]);
            bitrates.extend([format!("-b:a:{index}"), format.bitrate.clone()]);
            var_stream_map.push(format!("a:{index},name:{}", format.name));
        }

        Self {
            input_format,
            seek_time: vec!["-ss".to_string(), options.seek_time.clone()],
            maps,
            sample_rates,
            bitrates,
            segment_duration: vec!["-hls_time".to_string(), options.segment_duration.to_string()],
            segment_count: vec!["-hls_list_size".to_string(), options.segment_count.to_string()],
            var_stream_map: vec!["-var_stream_map".to_string(), var_stream_map.join(" ")],
            master_playlist_name: vec![
                "-master_pl_name".to_string(),
                format!("{}.m3u8", options.master_playlist_name),
            ],
            segment_file_name: vec![
                "-hls_segment_filename".to_string(),
                format!("%v/%Y%m%d_%s{}.ts", options.segment_file_name_suffix),
            ],
            playlist_name: format!("%v/{}.m3u8", options.playlist_name),
        }
    }
}

impl HlsStreamArgs {
    /// Full ffmpeg command line (without the program name) for `input`
    pub fn command_line(&self, input: &Path) -> Vec<String> {
        let mut args: Vec<String> = [
            "-hide_banner",
            // stats would clutter stderr, which is kept for error reports
            "-nostats",
            "-progress",
            "pipe:1",
            // read input in real time to keep the stream live
            "-re",
        ]
        .map(String::from)
        .to_vec();

        args.extend(self.input_format.iter().cloned());
        args.extend(self.seek_time.iter().cloned());
        args.extend(["-i".to_string(), input.to_string_lossy().into_owned()]);
        args.extend(self.maps.iter().cloned());
        args.extend(self.sample_rates.iter().cloned());
        args.extend(self.bitrates.iter().cloned());
        args.extend(["-f", "hls"].map(String::from));
        args.extend(self.segment_duration.iter().cloned());
        args.extend(self.segment_count.iter().cloned());
        args.extend(
            [
                "-hls_flags",
                "discont_start+delete_segments+temp_file+append_list",
                "-hls_allow_cache",
                "0",
            ]
            .map(String::from),
        );
        args.extend(self.var_stream_map.iter().cloned());
        args.extend(["-strftime", "1"].map(String::from));
        args.extend(self.master_playlist_name.iter().cloned());
        args.extend(self.segment_file_name.iter().cloned());
        args.push(self.playlist_name.clone());
        args
    }
}
