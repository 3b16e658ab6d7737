//! Fundamental frequency estimation via FFT autocorrelation.
//!
//! Per window: r = IFFT(|FFT(x)|²), zero-padded so the correlation is
//! linear rather than circular. The strongest lag inside the voice range
//! is accepted only when `r[lag] / r[0]` clears the confidence threshold.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::config::ProfilerSettings;

/// Result of pitch tracking over a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchEstimate {
    /// Median F0 over confident windows; `None` when no window qualified.
    pub median_hz: Option<f64>,
    pub voiced_windows: usize,
    pub total_windows: usize,
}

/// Windowed autocorrelation pitch tracker with pre-planned FFTs.
pub struct PitchTracker {
    sample_rate: u32,
    window_len: usize,
    hop_len: usize,
    min_lag: usize,
    max_lag: usize,
    min_rms: f64,
    confidence: f64,
    fft_len: usize,
    fft: Arc<dyn Fft<f64>>,
    ifft: Arc<dyn Fft<f64>>,
}

impl PitchTracker {
    pub fn new(settings: &ProfilerSettings, sample_rate: u32) -> Self {
        let sr = sample_rate.max(1) as f64;
        let window_len = ((settings.window_ms / 1000.0 * sr).round() as usize).max(4);
        let hop_len = ((settings.hop_ms / 1000.0 * sr).round() as usize).max(1);

        let min_lag = ((sr / settings.max_hz).floor() as usize).max(1);
        let max_lag = ((sr / settings.min_hz).ceil() as usize).min(window_len - 1);

        let fft_len = (2 * window_len).next_power_of_two();
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_len);
        let ifft = planner.plan_fft_inverse(fft_len);

        Self {
            sample_rate,
            window_len,
            hop_len,
            min_lag,
            max_lag,
            min_rms: settings.min_rms,
            confidence: settings.confidence,
            fft_len,
            fft,
            ifft,
        }
    }

    /// Estimate the pitch of one window; `None` if unvoiced or ambiguous.
    pub fn window_pitch(&self, window: &[f64]) -> Option<f64> {
        if window.len() < 2 || self.min_lag > self.max_lag {
            return None;
        }

        let mean = window.iter().sum::<f64>() / window.len() as f64;
        let centered: Vec<f64> = window.iter().map(|s| s - mean).collect();

        let rms = (centered.iter().map(|s| s * s).sum::<f64>() / centered.len() as f64).sqrt();
        if rms < self.min_rms {
            return None;
        }

        let mut buffer: Vec<Complex<f64>> =
            centered.iter().map(|&x| Complex::new(x, 0.0)).collect();
        buffer.resize(self.fft_len, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);
        for c in buffer.iter_mut() {
            *c = *c * c.conj();
        }
        self.ifft.process(&mut buffer);

        let scale = 1.0 / self.fft_len as f64;
        let r0 = buffer[0].re * scale;
        if r0 <= 0.0 {
            return None;
        }

        let max_lag = self.max_lag.min(centered.len() - 1);
        let (best_lag, best_r) = (self.min_lag..=max_lag)
            .map(|lag| (lag, buffer[lag].re * scale))
            .fold((0usize, f64::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });

        if best_lag == 0 || best_r / r0 <= self.confidence {
            return None;
        }

        Some(self.sample_rate as f64 / best_lag as f64)
    }

    /// Track pitch across the whole signal and take the median.
    pub fn estimate(&self, samples: &[f64]) -> PitchEstimate {
        let mut pitches = Vec::new();
        let mut total_windows = 0;

        let mut start = 0;
        while start + self.window_len <= samples.len() {
            total_windows += 1;
            if let Some(hz) = self.window_pitch(&samples[start..start + self.window_len]) {
                pitches.push(hz);
            }
            start += self.hop_len;
        }

        PitchEstimate {
            median_hz: median(&mut pitches),
            voiced_windows: pitches.len(),
            total_windows,
        }
    }
}

/// Median of the values (mean of the middle pair for even counts).
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(hz: f64, secs: f64, sample_rate: u32) -> Vec<f64> {
        let n = (secs * sample_rate as f64) as usize;
        (0..n)
            .map(|i| 0.4 * (2.0 * PI * hz * i as f64 / sample_rate as f64).sin())
            .collect()
    }

    #[test]
    fn detects_pure_tones() {
        let tracker = PitchTracker::new(&ProfilerSettings::default(), 16000);
        for hz in [110.0, 130.0, 165.0, 210.0, 250.0] {
            let estimate = tracker.estimate(&tone(hz, 1.0, 16000));
            let median = estimate.median_hz.unwrap();
            assert!((median - hz).abs() < hz * 0.02, "{} vs {}", median, hz);
            assert!(estimate.voiced_windows > 0);
        }
    }

    #[test]
    fn silence_has_no_pitch() {
        let tracker = PitchTracker::new(&ProfilerSettings::default(), 16000);
        let estimate = tracker.estimate(&vec![0.0; 16000]);
        assert_eq!(estimate.median_hz, None);
        assert_eq!(estimate.voiced_windows, 0);
        assert!(estimate.total_windows > 90);
    }

    #[test]
    fn noise_is_rejected_as_unvoiced() {
        let tracker = PitchTracker::new(&ProfilerSettings::default(), 16000);
        let mut state: u32 = 12345;
        let noise: Vec<f64> = (0..16000)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                ((state >> 16) as f64 / 32768.0) - 1.0
            })
            .collect();
        let estimate = tracker.estimate(&noise);
        assert!(estimate.voiced_windows < estimate.total_windows / 4);
    }

    #[test]
    fn median_handles_even_and_odd() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }
}
