//! Segment merging: coalesce recognizer fragments into speakable phrases.
//!
//! Raw recognizer segments are often a word or two long. Merging short,
//! closely spaced fragments gives the synthesizer whole phrases with
//! natural prosody while keeping each phrase anchored to source timing.

mod normalize;

pub use normalize::normalize_text;

use crate::config::MergeSettings;
use crate::models::{MergedSegment, RawSegment};

/// Shortest window (seconds) a merged unit may have.
pub const MIN_WINDOW_SECS: f64 = 0.001;

/// Window given to a point-like unit, capped at half the pause after it.
const POINT_WINDOW_SECS: f64 = 0.5;

/// Merge raw segments into ordered, non-overlapping phrase units.
///
/// Segments with empty text or non-finite times are dropped first. Every
/// returned unit lasts at least [`MIN_WINDOW_SECS`], and no unit bridges a
/// pause longer than `max_gap_secs`.
pub fn merge_segments(raw: &[RawSegment], settings: &MergeSettings) -> Vec<MergedSegment> {
    let mut cleaned: Vec<RawSegment> = raw
        .iter()
        .filter(|s| s.start.is_finite() && s.end.is_finite())
        .filter_map(|s| {
            let text = normalize_text(&s.text);
            if text.is_empty() {
                return None;
            }
            Some(RawSegment {
                start: s.start.max(0.0),
                end: s.end.max(s.start.max(0.0)),
                text,
            })
        })
        .collect();
    // stable: equal starts keep recognizer order
    cleaned.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged = Vec::new();
    let mut acc: Option<MergedSegment> = None;

    for seg in cleaned {
        let Some(current) = acc.as_mut() else {
            acc = Some(MergedSegment {
                start: seg.start,
                end: seg.end,
                text: seg.text,
            });
            continue;
        };

        let gap = seg.start - current.end;
        let acc_chars = current.text.chars().count();
        let joined_chars = acc_chars + 1 + seg.text.chars().count();
        let fits = gap <= settings.max_gap_secs
            && (acc_chars < settings.min_chars || joined_chars <= settings.max_chars);

        // only a segment touching the unit can be swallowed by it
        let clamped_start = seg.start.max(current.end);
        let contained = seg.start <= current.end && seg.end - clamped_start < MIN_WINDOW_SECS;

        if fits || contained {
            current.text.push(' ');
            current.text.push_str(&seg.text);
            current.end = current.end.max(seg.end);
        } else if let Some(done) = acc.replace(MergedSegment {
            start: clamped_start,
            end: seg.end,
            text: seg.text,
        }) {
            merged.push(finish(done));
        }
    }

    if let Some(done) = acc {
        merged.push(finish(done));
    }

    widen_point_units(merged)
}

/// Give units shorter than [`MIN_WINDOW_SECS`] a speakable window.
///
/// A short unit grows into the pause after it, by at most
/// [`POINT_WINDOW_SECS`] and never past the middle of that pause. A unit
/// with no room to grow is folded into the unit that follows it.
fn widen_point_units(units: Vec<MergedSegment>) -> Vec<MergedSegment> {
    let mut out: Vec<MergedSegment> = Vec::with_capacity(units.len());
    let mut pending: Option<MergedSegment> = None;
    let mut iter = units.into_iter().peekable();

    while let Some(mut unit) = iter.next() {
        if let Some(point) = pending.take() {
            unit.start = point.start;
            unit.text = format!("{} {}", point.text, unit.text);
        }

        if unit.duration() >= MIN_WINDOW_SECS {
            out.push(unit);
            continue;
        }

        let limit = match iter.peek() {
            Some(next) => (unit.start + next.start) / 2.0,
            None => f64::INFINITY,
        };
        let end = (unit.start + POINT_WINDOW_SECS).min(limit);
        if end - unit.start >= MIN_WINDOW_SECS {
            unit.end = end;
            out.push(unit);
        } else {
            pending = Some(unit);
        }
    }

    // only set while another unit follows, so normally empty here
    if let Some(mut point) = pending {
        point.end = point.start + POINT_WINDOW_SECS;
        out.push(point);
    }

    out
}

fn finish(mut segment: MergedSegment) -> MergedSegment {
    segment.text = normalize_text(&segment.text);
    segment
}
