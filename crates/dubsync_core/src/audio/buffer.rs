//! Mono PCM buffer with sample-exact editing.

use thiserror::Error;

/// Errors from combining audio buffers.
#[derive(Debug, Error, PartialEq)]
pub enum AudioError {
    #[error("Sample rate mismatch: expected {expected} Hz, got {found} Hz")]
    SampleRateMismatch { expected: u32, found: u32 },

    #[error("Sample rate must be non-zero")]
    ZeroSampleRate,
}

/// Mono f64 samples at a fixed sample rate.
///
/// Every editing operation works in whole samples, so durations
/// derived from `len() / sample_rate` are exact.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Digital silence lasting `round(duration_secs × sample_rate)` samples.
    pub fn silence(duration_secs: f64, sample_rate: u32) -> Self {
        let len = samples_for(duration_secs, sample_rate);
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Pad with trailing silence or truncate to exactly `len` samples.
    pub fn fit_to_len(mut self, len: usize) -> Self {
        self.samples.resize(len, 0.0);
        self
    }

    /// Pad or truncate to exactly `round(duration_secs × sample_rate)` samples.
    pub fn fit_to_duration(self, duration_secs: f64) -> Self {
        let len = samples_for(duration_secs, self.sample_rate);
        self.fit_to_len(len)
    }

    /// First `duration_secs` of audio (or all of it if shorter).
    pub fn head(&self, duration_secs: f64) -> Self {
        let len = samples_for(duration_secs, self.sample_rate).min(self.samples.len());
        Self::new(self.samples[..len].to_vec(), self.sample_rate)
    }

    /// Apply a linear fade-in and fade-out of `fade_len` samples each.
    ///
    /// The fade length is capped at a quarter of the buffer.
    pub fn apply_fades(&mut self, fade_len: usize) {
        let len = self.samples.len();
        let fade_len = fade_len.min(len / 4);
        if fade_len == 0 {
            return;
        }

        for i in 0..fade_len {
            let gain = i as f64 / fade_len as f64;
            self.samples[i] *= gain;
            self.samples[len - 1 - i] *= gain;
        }
    }

    /// Append another buffer with the same sample rate.
    pub fn append(&mut self, other: &AudioBuffer) -> Result<(), AudioError> {
        if other.sample_rate != self.sample_rate {
            return Err(AudioError::SampleRateMismatch {
                expected: self.sample_rate,
                found: other.sample_rate,
            });
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Join chunks end to end.
    ///
    /// The result has exactly the sum of the chunk sample counts.
    pub fn concat<'a>(
        chunks: impl IntoIterator<Item = &'a AudioBuffer>,
        sample_rate: u32,
    ) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::ZeroSampleRate);
        }
        let mut out = AudioBuffer::new(Vec::new(), sample_rate);
        for chunk in chunks {
            out.append(chunk)?;
        }
        Ok(out)
    }

    /// Root-mean-square level of the whole buffer.
    pub fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|s| s * s).sum();
        (sum / self.samples.len() as f64).sqrt()
    }
}

/// Number of samples covering `duration_secs`, rounded to the nearest sample.
///
/// Negative or non-finite durations map to zero.
pub fn samples_for(duration_secs: f64, sample_rate: u32) -> usize {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return 0;
    }
    (duration_secs * sample_rate as f64).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_has_rounded_length() {
        let buf = AudioBuffer::silence(0.5, 24000);
        assert_eq!(buf.len(), 12000);
        assert!(buf.samples().iter().all(|s| *s == 0.0));
        assert!((buf.duration_secs() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn samples_for_clamps_invalid() {
        assert_eq!(samples_for(-1.0, 1000), 0);
        assert_eq!(samples_for(f64::NAN, 1000), 0);
        assert_eq!(samples_for(0.0015, 1000), 2);
    }

    #[test]
    fn fit_pads_and_trims() {
        let buf = AudioBuffer::new(vec![1.0; 10], 10);
        let padded = buf.clone().fit_to_duration(1.5);
        assert_eq!(padded.len(), 15);
        assert_eq!(padded.samples()[14], 0.0);

        let trimmed = buf.fit_to_len(4);
        assert_eq!(trimmed.samples(), &[1.0; 4]);
    }

    #[test]
    fn fades_cap_at_quarter() {
        let mut buf = AudioBuffer::new(vec![1.0; 8], 8);
        buf.apply_fades(100);
        // capped at 2 samples per side
        assert_eq!(buf.samples()[0], 0.0);
        assert_eq!(buf.samples()[1], 0.5);
        assert_eq!(buf.samples()[2], 1.0);
        assert_eq!(buf.samples()[7], 0.0);
        assert_eq!(buf.samples()[6], 0.5);
    }

    #[test]
    fn concat_preserves_total_length() {
        let a = AudioBuffer::new(vec![0.1; 3], 100);
        let b = AudioBuffer::silence(0.05, 100);
        let joined = AudioBuffer::concat([&a, &b, &a], 100).unwrap();
        assert_eq!(joined.len(), 3 + 5 + 3);
    }

    #[test]
    fn concat_rejects_mixed_rates() {
        let a = AudioBuffer::new(vec![0.0; 3], 100);
        let b = AudioBuffer::new(vec![0.0; 3], 200);
        let err = AudioBuffer::concat([&a, &b], 100).unwrap_err();
        assert_eq!(
            err,
            AudioError::SampleRateMismatch {
                expected: 100,
                found: 200
            }
        );
    }

    #[test]
    fn head_bounds_to_length() {
        let buf = AudioBuffer::new(vec![0.5; 100], 10);
        assert_eq!(buf.head(3.0).len(), 30);
        assert_eq!(buf.head(60.0).len(), 100);
    }
}
