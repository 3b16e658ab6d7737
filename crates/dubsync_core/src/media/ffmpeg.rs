//! FFmpeg operations: decode, encode, tempo, loudness, mux and burn.
//!
//! PCM travels over pipes as raw `f64le` mono samples so that all
//! duration arithmetic happens on in-memory [`AudioBuffer`]s.

use std::path::Path;

use crate::audio::AudioBuffer;
use crate::config::{LoudnessSettings, MuxSettings};

use super::error::{MediaError, MediaResult};
use super::runner::ToolRunner;

const FFMPEG: &str = "ffmpeg";

/// Arguments decoding any media file to mono f64 PCM on stdout.
pub fn decode_args(input: &Path, sample_rate: u32) -> Vec<String> {
    vec![
        "-v".into(),
        "error".into(),
        "-nostdin".into(),
        "-i".into(),
        input.display().to_string(),
        "-vn".into(),
        "-ac".into(),
        "1".into(),
        "-ar".into(),
        sample_rate.to_string(),
        "-f".into(),
        "f64le".into(),
        "-acodec".into(),
        "pcm_f64le".into(),
        "pipe:1".into(),
    ]
}

/// Decode the audio of `input` to mono PCM at `sample_rate`.
pub fn decode_mono(
    runner: &ToolRunner,
    input: &Path,
    sample_rate: u32,
) -> MediaResult<AudioBuffer> {
    if !input.exists() {
        return Err(MediaError::SourceNotFound(input.to_path_buf()));
    }

    let bytes = runner.run_piped(FFMPEG, &decode_args(input, sample_rate), None)?;
    let samples = bytes_to_f64_samples(&bytes);
    if samples.is_empty() {
        return Err(MediaError::NoAudio(input.to_path_buf()));
    }

    tracing::debug!(
        "Decoded {} samples ({:.2}s) from {}",
        samples.len(),
        samples.len() as f64 / sample_rate as f64,
        input.display()
    );

    Ok(AudioBuffer::new(samples, sample_rate))
}

/// Arguments reading f64 PCM from stdin and writing 16-bit WAV.
pub fn encode_wav_args(sample_rate: u32, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-f".into(),
        "f64le".into(),
        "-ar".into(),
        sample_rate.to_string(),
        "-ac".into(),
        "1".into(),
        "-i".into(),
        "pipe:0".into(),
        "-c:a".into(),
        "pcm_s16le".into(),
        output.display().to_string(),
    ]
}

/// Encode a buffer to a 16-bit mono WAV file.
pub fn encode_wav(runner: &ToolRunner, audio: &AudioBuffer, output: &Path) -> MediaResult<()> {
    create_parent(output)?;
    let bytes = f64_samples_to_bytes(audio.samples());
    runner.run_piped(
        FFMPEG,
        &encode_wav_args(audio.sample_rate(), output),
        Some(&bytes),
    )?;
    Ok(())
}

/// Build an `atempo` filter chain, e.g. `atempo=2.000000,atempo=1.200000`.
pub fn atempo_filter(chain: &[f64]) -> String {
    chain
        .iter()
        .map(|f| format!("atempo={:.6}", f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Arguments for piping f64 PCM through an `atempo` chain.
pub fn tempo_args(sample_rate: u32, chain: &[f64]) -> Vec<String> {
    vec![
        "-v".into(),
        "error".into(),
        "-f".into(),
        "f64le".into(),
        "-ar".into(),
        sample_rate.to_string(),
        "-ac".into(),
        "1".into(),
        "-i".into(),
        "pipe:0".into(),
        "-filter:a".into(),
        atempo_filter(chain),
        "-f".into(),
        "f64le".into(),
        "-acodec".into(),
        "pcm_f64le".into(),
        "pipe:1".into(),
    ]
}

/// Speed up (or slow down) audio without changing pitch.
pub fn apply_atempo(
    runner: &ToolRunner,
    audio: &AudioBuffer,
    chain: &[f64],
) -> MediaResult<AudioBuffer> {
    if chain.is_empty() {
        return Ok(audio.clone());
    }
    let input = f64_samples_to_bytes(audio.samples());
    let output = runner.run_piped(
        FFMPEG,
        &tempo_args(audio.sample_rate(), chain),
        Some(&input),
    )?;
    Ok(AudioBuffer::new(
        bytes_to_f64_samples(&output),
        audio.sample_rate(),
    ))
}

/// Arguments for EBU R128 loudness normalization to WAV.
///
/// `-ar` is required: loudnorm upsamples to 192 kHz internally.
pub fn loudnorm_args(
    input: &Path,
    output: &Path,
    settings: &LoudnessSettings,
    sample_rate: u32,
) -> Vec<String> {
    vec![
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-i".into(),
        input.display().to_string(),
        "-af".into(),
        format!(
            "loudnorm=I={}:LRA={}:TP={}",
            settings.integrated, settings.lra, settings.true_peak
        ),
        "-ar".into(),
        sample_rate.to_string(),
        "-ac".into(),
        "1".into(),
        "-c:a".into(),
        "pcm_s16le".into(),
        output.display().to_string(),
    ]
}

pub fn normalize_loudness(
    runner: &ToolRunner,
    input: &Path,
    output: &Path,
    settings: &LoudnessSettings,
    sample_rate: u32,
) -> MediaResult<()> {
    create_parent(output)?;
    runner.run(FFMPEG, &loudnorm_args(input, output, settings, sample_rate))?;
    Ok(())
}

/// Arguments replacing a video's audio with the dub track.
pub fn mux_args(video: &Path, audio: &Path, output: &Path, settings: &MuxSettings) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        video.display().to_string(),
        "-i".into(),
        audio.display().to_string(),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        settings.audio_codec.clone(),
        "-b:a".into(),
        settings.audio_bitrate.clone(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0".into(),
        "-shortest".into(),
        output.display().to_string(),
    ]
}

pub fn mux(
    runner: &ToolRunner,
    video: &Path,
    audio: &Path,
    output: &Path,
    settings: &MuxSettings,
) -> MediaResult<()> {
    create_parent(output)?;
    runner.run(FFMPEG, &mux_args(video, audio, output, settings))?;
    Ok(())
}

/// The `subtitles=` video filter with escaped path and style.
pub fn subtitles_filter(srt: &Path, force_style: &str) -> String {
    format!(
        "subtitles=filename={}:force_style={}",
        escape_filter_value(&srt.display().to_string()),
        escape_filter_value(force_style)
    )
}

/// Arguments burning an SRT file into the picture, copying audio.
pub fn burn_args(video: &Path, srt: &Path, force_style: &str, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        video.display().to_string(),
        "-vf".into(),
        subtitles_filter(srt, force_style),
        "-c:a".into(),
        "copy".into(),
        output.display().to_string(),
    ]
}

pub fn burn_subtitles(
    runner: &ToolRunner,
    video: &Path,
    srt: &Path,
    force_style: &str,
    output: &Path,
) -> MediaResult<()> {
    create_parent(output)?;
    runner.run(FFMPEG, &burn_args(video, srt, force_style, output))?;
    Ok(())
}

/// Escape a filter option value for both ffmpeg parsing levels.
///
/// Option level: `\ ' :` get a backslash. Filtergraph level: `\ ' [ ] , ;`
/// get a backslash on top of that.
pub fn escape_filter_value(value: &str) -> String {
    let mut option_level = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(c);
    }

    let mut graph_level = String::with_capacity(option_level.len() + 8);
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}

/// Convert raw bytes to f64 samples (little-endian).
pub fn bytes_to_f64_samples(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(chunk);
            f64::from_le_bytes(arr)
        })
        .collect()
}

/// Convert f64 samples to raw little-endian bytes.
pub fn f64_samples_to_bytes(samples: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 8);
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    bytes
}

fn create_parent(path: &Path) -> MediaResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| MediaError::io("creating output directory", e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip_partial() {
        let bytes = f64_samples_to_bytes(&[0.5, -0.25]);
        assert_eq!(bytes.len(), 16);
        let mut with_garbage = bytes.clone();
        with_garbage.extend_from_slice(&[1, 2, 3]);
        assert_eq!(bytes_to_f64_samples(&with_garbage), vec![0.5, -0.25]);
    }

    #[test]
    fn atempo_chain_formats_each_step() {
        assert_eq!(atempo_filter(&[2.0, 1.2]), "atempo=2.000000,atempo=1.200000");
        assert_eq!(atempo_filter(&[]), "");
    }

    #[test]
    fn mux_args_map_video_and_dub_audio() {
        let args = mux_args(
            Path::new("in.mp4"),
            Path::new("dub.wav"),
            Path::new("out.mp4"),
            &MuxSettings::default(),
        );
        let joined = args.join(" ");
        assert_eq!(
            joined,
            "-y -i in.mp4 -i dub.wav -c:v copy -c:a aac -b:a 128k -map 0:v:0 -map 1:a:0 -shortest out.mp4"
        );
    }

    #[test]
    fn loudnorm_sets_output_rate() {
        let args = loudnorm_args(
            Path::new("a.wav"),
            Path::new("b.wav"),
            &LoudnessSettings::default(),
            24000,
        );
        assert!(args.contains(&"loudnorm=I=-16:LRA=11:TP=-1.5".to_string()));
        let ar = args.iter().position(|a| a == "-ar").unwrap();
        assert_eq!(args[ar + 1], "24000");
    }

    #[test]
    fn filter_values_escape_both_levels() {
        assert_eq!(escape_filter_value("/tmp/a.srt"), "/tmp/a.srt");
        assert_eq!(escape_filter_value("C:/x"), "C\\\\:/x");
        assert_eq!(escape_filter_value("it's"), "it\\\\\\'s");
        assert_eq!(escape_filter_value("A=1,B=2"), "A=1\\,B=2");
    }

    #[test]
    fn decode_rejects_missing_file() {
        let result = decode_mono(
            &ToolRunner::default(),
            Path::new("/nonexistent/file.mp4"),
            16000,
        );
        assert!(matches!(result, Err(MediaError::SourceNotFound(_))));
    }
}
