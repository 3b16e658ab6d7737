//! Media probing using ffprobe JSON output.

use std::path::Path;

use serde_json::Value;

use super::error::{MediaError, MediaResult};
use super::runner::ToolRunner;

/// Container-level facts about a media file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaProbe {
    /// Container duration, when ffprobe reports one.
    pub duration_secs: Option<f64>,
    /// Width of the first video stream.
    pub width: Option<u32>,
    /// Height of the first video stream.
    pub height: Option<u32>,
    pub has_video: bool,
    pub has_audio: bool,
}

/// Probe a media file with `ffprobe -show_format -show_streams`.
pub fn probe_media(runner: &ToolRunner, path: &Path) -> MediaResult<MediaProbe> {
    if !path.exists() {
        return Err(MediaError::SourceNotFound(path.to_path_buf()));
    }

    tracing::debug!("Probing media: {}", path.display());

    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        path.display().to_string(),
    ];
    let stdout = runner.run("ffprobe", &args)?;
    let json: Value = serde_json::from_str(&stdout)
        .map_err(|e| MediaError::parse("ffprobe output", e.to_string()))?;

    Ok(parse_probe_json(&json))
}

/// Probe only the duration; `None` when it cannot be determined.
pub fn probe_duration(runner: &ToolRunner, path: &Path) -> Option<f64> {
    match probe_media(runner, path) {
        Ok(probe) => probe.duration_secs,
        Err(e) => {
            tracing::warn!("Duration probe failed for {}: {}", path.display(), e);
            None
        }
    }
}

fn parse_probe_json(json: &Value) -> MediaProbe {
    let mut probe = MediaProbe::default();

    // ffprobe reports numbers as strings ("12.345000")
    probe.duration_secs = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(value_as_f64)
        .filter(|d| d.is_finite() && *d > 0.0);

    if let Some(streams) = json.get("streams").and_then(|s| s.as_array()) {
        for stream in streams {
            match stream.get("codec_type").and_then(|t| t.as_str()) {
                Some("video") if !probe.has_video => {
                    probe.has_video = true;
                    probe.width = stream
                        .get("width")
                        .and_then(|w| w.as_u64())
                        .map(|w| w as u32);
                    probe.height = stream
                        .get("height")
                        .and_then(|h| h.as_u64())
                        .map(|h| h as u32);
                    if probe.duration_secs.is_none() {
                        probe.duration_secs = stream
                            .get("duration")
                            .and_then(value_as_f64)
                            .filter(|d| d.is_finite() && *d > 0.0);
                    }
                }
                Some("audio") => probe.has_audio = true,
                _ => {}
            }
        }
    }

    probe
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_duration_and_dimensions() {
        let json = json!({
            "streams": [
                {"codec_type": "audio", "sample_rate": "44100"},
                {"codec_type": "video", "width": 1080, "height": 1920}
            ],
            "format": {"duration": "61.480000"}
        });
        let probe = parse_probe_json(&json);
        assert_eq!(probe.duration_secs, Some(61.48));
        assert_eq!(probe.width, Some(1080));
        assert_eq!(probe.height, Some(1920));
        assert!(probe.has_audio);
        assert!(probe.has_video);
    }

    #[test]
    fn missing_duration_falls_back_to_stream() {
        let json = json!({
            "streams": [{"codec_type": "video", "width": 640, "height": 360, "duration": "3.5"}],
            "format": {"duration": "N/A"}
        });
        assert_eq!(parse_probe_json(&json).duration_secs, Some(3.5));
    }

    #[test]
    fn unknown_duration_is_none() {
        let json = json!({"streams": [], "format": {}});
        let probe = parse_probe_json(&json);
        assert_eq!(probe.duration_secs, None);
        assert!(!probe.has_video);
    }

    #[test]
    fn probe_rejects_missing_file() {
        let result = probe_media(&ToolRunner::default(), Path::new("/nonexistent/video.mp4"));
        assert!(matches!(result, Err(MediaError::SourceNotFound(_))));
    }
}
