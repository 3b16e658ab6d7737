//! Pipeline step implementations.
//!
//! Each step handles one phase of a dub job, in pipeline order.

mod align;
mod captions;
mod merge;
mod mux;
mod normalize;
mod prepare;
mod profile;
mod stitch;
mod synthesize;
mod transcribe;

pub use align::AlignStep;
pub use captions::CaptionsStep;
pub use merge::MergeStep;
pub use mux::MuxStep;
pub use normalize::NormalizeStep;
pub use prepare::PrepareStep;
pub use profile::ProfileStep;
pub use stitch::StitchStep;
pub use synthesize::SynthesizeStep;
pub use transcribe::TranscribeStep;
