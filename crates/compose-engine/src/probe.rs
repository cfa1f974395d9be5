//! Media probing via an external `ffprobe` process.

use std::path::Path;
use std::process::Command;

use clipstack_common::{ClipstackError, ClipstackResult};
use serde::Deserialize;

/// Binary used for probing unless the caller overrides it.
pub const DEFAULT_FFPROBE_BIN: &str = "ffprobe";

/// Geometry and duration of a media file's first video stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaProbe {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// Stream duration in seconds.
    pub duration_secs: f64,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// Probe a media file with the default `ffprobe` binary.
pub fn probe_media(path: &Path) -> ClipstackResult<MediaProbe> {
    probe_media_with(DEFAULT_FFPROBE_BIN, path)
}

/// Probe a media file, selecting the first video stream as authoritative.
pub fn probe_media_with(ffprobe_bin: &str, path: &Path) -> ClipstackResult<MediaProbe> {
    let output = Command::new(ffprobe_bin)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            ClipstackError::probe(format!(
                "Failed to run {ffprobe_bin} on {}: {e}",
                path.display()
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ClipstackError::probe(format!(
            "{ffprobe_bin} exited with {} for {}: {}",
            output.status,
            path.display(),
            stderr.trim()
        )));
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&raw).map_err(|e| match e {
        ClipstackError::Probe { message } => {
            ClipstackError::probe(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

/// Parse the JSON emitted by `ffprobe -of json` into a [`MediaProbe`].
///
/// Kept separate from process invocation so it can be tested against
/// captured output.
pub fn parse_probe_output(raw: &str) -> ClipstackResult<MediaProbe> {
    let parsed: FfprobeOutput = serde_json::from_str(raw)
        .map_err(|e| ClipstackError::probe(format!("malformed probe JSON: {e}")))?;

    let stream = parsed
        .streams
        .first()
        .ok_or_else(|| ClipstackError::probe("no video streams reported"))?;

    let width = stream
        .width
        .ok_or_else(|| ClipstackError::probe("video stream is missing width"))?;
    let height = stream
        .height
        .ok_or_else(|| ClipstackError::probe("video stream is missing height"))?;
    if width == 0 || height == 0 {
        return Err(ClipstackError::probe(format!(
            "video stream reports degenerate geometry {width}x{height}"
        )));
    }

    let duration_raw = stream
        .duration
        .as_deref()
        .ok_or_else(|| ClipstackError::probe("video stream is missing duration"))?;
    let duration_secs = duration_raw
        .trim()
        .parse::<f64>()
        .map_err(|_| ClipstackError::probe(format!("unparsable duration {duration_raw:?}")))?;
    if !duration_secs.is_finite() || duration_secs < 0.0 {
        return Err(ClipstackError::probe(format!(
            "duration out of range: {duration_secs}"
        )));
    }

    Ok(MediaProbe {
        width,
        height,
        duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_probe_output() {
        let raw = r#"{"streams":[{"width":1080,"height":1920,"duration":"12.345000"}]}"#;
        let probe = parse_probe_output(raw).unwrap();
        assert_eq!(probe.width, 1080);
        assert_eq!(probe.height, 1920);
        assert!((probe.duration_secs - 12.345).abs() < 1e-9);
    }

    #[test]
    fn test_first_video_stream_is_authoritative() {
        let raw = r#"{"streams":[
            {"width":1920,"height":1080,"duration":"10.0"},
            {"width":640,"height":360,"duration":"99.0"}
        ]}"#;
        let probe = parse_probe_output(raw).unwrap();
        assert_eq!(probe.width, 1920);
        assert!((probe.duration_secs - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_streams_is_an_error() {
        let err = parse_probe_output(r#"{"streams":[]}"#).unwrap_err();
        assert!(err.to_string().contains("no video streams"));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(parse_probe_output("not json at all").is_err());
    }

    #[test]
    fn test_missing_duration_is_an_error() {
        let raw = r#"{"streams":[{"width":1920,"height":1080}]}"#;
        let err = parse_probe_output(raw).unwrap_err();
        assert!(err.to_string().contains("duration"));
    }

    #[test]
    fn test_unparsable_duration_is_an_error() {
        let raw = r#"{"streams":[{"width":1920,"height":1080,"duration":"N/A"}]}"#;
        assert!(parse_probe_output(raw).is_err());
    }

    #[test]
    fn test_zero_geometry_is_an_error() {
        let raw = r#"{"streams":[{"width":0,"height":1080,"duration":"5.0"}]}"#;
        assert!(parse_probe_output(raw).is_err());
    }

    #[test]
    fn test_probe_of_missing_binary_fails() {
        let err = probe_media_with(
            "clipstack-nonexistent-ffprobe",
            Path::new("/tmp/whatever.mp4"),
        )
        .unwrap_err();
        assert!(matches!(err, ClipstackError::Probe { .. }));
    }
}
