//! SRT rendering.

use std::fs;
use std::io;
use std::path::Path;

use crate::models::CaptionEntry;

/// Format seconds as `HH:MM:SS,mmm`.
///
/// Rounds to whole milliseconds first so carries cascade into seconds,
/// minutes and hours. Hours are not bounded. Negative or non-finite
/// input formats as zero.
pub fn format_timestamp(secs: f64) -> String {
    let total_ms = if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as u64
    } else {
        0
    };
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        ms
    )
}

/// Split caption text into at most two lines.
///
/// Text longer than `max_line_chars` is broken at the space closest to
/// its middle; a single unbreakable word stays on one line.
pub fn wrap_caption(text: &str, max_line_chars: usize) -> Vec<String> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_line_chars {
        return vec![text];
    }

    let middle = chars.len() / 2;
    let split = chars
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == ' ')
        .map(|(i, _)| i)
        .min_by_key(|i| i.abs_diff(middle));

    match split {
        Some(i) => vec![
            chars[..i].iter().collect(),
            chars[i + 1..].iter().collect(),
        ],
        None => vec![text],
    }
}

/// Render numbered SRT blocks separated by blank lines.
pub fn render_srt(entries: &[CaptionEntry], max_line_chars: usize) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n",
            i + 1,
            format_timestamp(entry.start),
            format_timestamp(entry.end)
        ));
        for line in wrap_caption(&entry.text, max_line_chars) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

pub fn write_srt(path: &Path, entries: &[CaptionEntry], max_line_chars: usize) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_srt(entries, max_line_chars))
}
