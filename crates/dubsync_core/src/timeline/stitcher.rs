//! Timeline stitching.
//!
//! Fitted clips are laid end to end in segment order. Whenever the track
//! falls behind a segment's source start by at least the negligible-gap
//! threshold, a silence chunk is inserted first, so each speech chunk
//! begins where the original speech did.

use crate::audio::{samples_for, AudioBuffer};
use crate::config::TimelineSettings;
use crate::fit::FittedClip;
use crate::models::MergedSegment;

use super::{TimelineError, TimelineResult};

/// What a chunk of the stitched track holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Silence,
    /// Fitted clip of the merged segment at this index.
    Speech(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineChunk {
    pub kind: ChunkKind,
    /// Offset of the chunk in the stitched track.
    pub start_sample: usize,
    pub len: usize,
}

/// A continuous dub track and the chunks it was built from.
#[derive(Debug, Clone)]
pub struct Timeline {
    chunks: Vec<TimelineChunk>,
    audio: AudioBuffer,
}

impl Timeline {
    pub fn chunks(&self) -> &[TimelineChunk] {
        &self.chunks
    }

    pub fn audio(&self) -> &AudioBuffer {
        &self.audio
    }

    pub fn into_audio(self) -> AudioBuffer {
        self.audio
    }

    pub fn silence_chunks(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| c.kind == ChunkKind::Silence)
            .count()
    }

    pub fn duration_secs(&self) -> f64 {
        self.audio.duration_secs()
    }

    /// Start time of a segment's speech chunk in the stitched track.
    pub fn speech_start_secs(&self, segment_index: usize) -> Option<f64> {
        let sample_rate = self.audio.sample_rate() as f64;
        self.chunks
            .iter()
            .find(|c| c.kind == ChunkKind::Speech(segment_index))
            .map(|c| c.start_sample as f64 / sample_rate)
    }
}

/// Places fitted clips at their segment start times.
pub struct TimelineStitcher {
    settings: TimelineSettings,
    sample_rate: u32,
}

impl TimelineStitcher {
    pub fn new(settings: TimelineSettings, sample_rate: u32) -> Self {
        Self {
            settings,
            sample_rate,
        }
    }

    /// Build the track. Gaps below the minimum are dropped so speech
    /// runs on; the drift this introduces is bounded by that minimum.
    pub fn stitch(
        &self,
        clips: &[FittedClip],
        segments: &[MergedSegment],
    ) -> TimelineResult<Timeline> {
        let mut chunks = Vec::with_capacity(clips.len() * 2);
        let mut parts: Vec<AudioBuffer> = Vec::with_capacity(clips.len() * 2);
        let mut emitted = 0usize;
        let mut previous: Option<usize> = None;

        for clip in clips {
            let segment =
                segments
                    .get(clip.segment_index)
                    .ok_or(TimelineError::UnknownSegment {
                        index: clip.segment_index,
                        count: segments.len(),
                    })?;
            if let Some(prev) = previous {
                if clip.segment_index <= prev {
                    return Err(TimelineError::OutOfOrder {
                        index: clip.segment_index,
                        previous: prev,
                    });
                }
            }
            previous = Some(clip.segment_index);

            let gap = segment.start - emitted as f64 / self.sample_rate as f64;
            if gap >= self.settings.min_gap_secs {
                let silence_len = samples_for(gap, self.sample_rate);
                chunks.push(TimelineChunk {
                    kind: ChunkKind::Silence,
                    start_sample: emitted,
                    len: silence_len,
                });
                parts.push(AudioBuffer::new(vec![0.0; silence_len], self.sample_rate));
                emitted += silence_len;
            }

            chunks.push(TimelineChunk {
                kind: ChunkKind::Speech(clip.segment_index),
                start_sample: emitted,
                len: clip.audio.len(),
            });
            emitted += clip.audio.len();
        }

        // speech parts are borrowed from the clips; interleave in chunk order
        let mut clip_iter = clips.iter();
        let mut silence_iter = parts.iter();
        let ordered = chunks.iter().filter_map(|chunk| match chunk.kind {
            ChunkKind::Silence => silence_iter.next(),
            ChunkKind::Speech(_) => clip_iter.next().map(|c| &c.audio),
        });
        let audio = AudioBuffer::concat(ordered, self.sample_rate)?;

        tracing::debug!(
            chunks = chunks.len(),
            samples = audio.len(),
            "timeline stitched"
        );

        Ok(Timeline { chunks, audio })
    }
}
