//! Duration fitting: make a clip last exactly its time window.

mod chain;
mod fitter;
mod tempo;

pub use chain::tempo_chain;
pub use fitter::{DurationFitter, FittedClip};
pub use tempo::{FfmpegTempo, TempoStretcher};

#[cfg(test)]
pub(crate) use tempo::ResampleTempo;

use thiserror::Error;

use crate::media::MediaError;

/// Errors from duration fitting.
#[derive(Error, Debug)]
pub enum FitError {
    #[error("Target duration must be positive and finite (got {0})")]
    InvalidTarget(f64),

    #[error("Tempo factor must be positive and finite (got {0})")]
    InvalidFactor(f64),

    #[error("Tempo range must satisfy 0 < min < 1 < max (got {min}..{max})")]
    InvalidRange { min: f64, max: f64 },

    #[error("Clip has no samples")]
    EmptyClip,

    #[error("Fitted clip lasts {actual:.4}s, expected {target:.4}s")]
    OutOfTolerance { target: f64, actual: f64 },

    #[error("Tempo change failed: {0}")]
    Stretch(#[from] MediaError),
}

/// Result type for fitting operations.
pub type FitResult<T> = Result<T, FitError>;
