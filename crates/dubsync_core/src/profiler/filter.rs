//! Butterworth high-pass pre-filter.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F64};

/// Cutoff removing DC offset and rumble below the lowest voice pitch.
pub const RUMBLE_CUTOFF_HZ: f64 = 60.0;

/// Apply a second-order Butterworth high-pass filter.
///
/// Returns the input unchanged if the cutoff is invalid for the sample rate.
pub fn high_pass(samples: &[f64], sample_rate: u32, cutoff_hz: f64) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }

    let coeffs = match Coefficients::<f64>::from_params(
        Type::HighPass,
        sample_rate.hz(),
        cutoff_hz.hz(),
        Q_BUTTERWORTH_F64,
    ) {
        Ok(c) => c,
        Err(_) => return samples.to_vec(),
    };

    let mut filter = DirectForm2Transposed::<f64>::new(coeffs);
    samples.iter().map(|&s| filter.run(s)).collect()
}
