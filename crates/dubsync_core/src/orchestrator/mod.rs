//! Pipeline orchestrator for dub jobs.
//!
//! Each dub job runs a fixed sequence of steps. A step validates what it
//! reads, does its work, records its results in [`JobState`] and is then
//! checked against its own output contract.
//!
//! # Architecture
//!
//! ```text
//! Pipeline
//!     ├── Step: Prepare      probe video, extract source audio
//!     ├── Step: Transcribe   recognize speech, reuse matching outputs
//!     ├── Step: Merge        coalesce fragments into phrases
//!     ├── Step: Profile      pick a voice from source pitch
//!     ├── Step: Synthesize   translate, speak, fit each phrase
//!     ├── Step: Stitch       place clips on the timeline
//!     ├── Step: Align        pad/trim to the video length
//!     ├── Step: Normalize    encode WAV, loudness-normalize
//!     ├── Step: Mux          replace the video's audio
//!     └── Step: Captions     write SRT, burn captions
//! ```
//!
//! # Example
//!
//! ```ignore
//! use dubsync_core::orchestrator::{create_dub_pipeline, Context, JobState};
//!
//! let pipeline = create_dub_pipeline();
//! let ctx = Context::new(job_id, lang, video, settings, layout, logger, runner, services, admission);
//! let mut state = JobState::new(&job_id);
//!
//! let result = pipeline.run(&ctx, &mut state)?;
//! println!("Completed: {:?}", result.steps_completed);
//! ```

mod errors;
mod pipeline;
mod step;
pub mod steps;
#[cfg(test)]
pub(crate) mod test_support;
mod types;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{
    AlignStep, CaptionsStep, MergeStep, MuxStep, NormalizeStep, PrepareStep, ProfileStep,
    StitchStep, SynthesizeStep, TranscribeStep,
};
pub use types::{
    Context, DubServices, JobReport, JobState, PreparedMedia, ProgressCallback, ServiceFactory,
    StepOutcome, TranscriptOutput, VoiceOutput,
};

/// Create the dub pipeline with all steps in order.
pub fn create_dub_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(PrepareStep::new())
        .with_step(TranscribeStep::new())
        .with_step(MergeStep::new())
        .with_step(ProfileStep::new())
        .with_step(SynthesizeStep::new())
        .with_step(StitchStep::new())
        .with_step(AlignStep::new())
        .with_step(NormalizeStep::new())
        .with_step(MuxStep::new())
        .with_step(CaptionsStep::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dub_pipeline_runs_steps_in_order() {
        assert_eq!(
            create_dub_pipeline().step_names(),
            vec![
                "Prepare",
                "Transcribe",
                "Merge",
                "Profile",
                "Synthesize",
                "Stitch",
                "Align",
                "Normalize",
                "Mux",
                "Captions"
            ]
        );
    }
}
