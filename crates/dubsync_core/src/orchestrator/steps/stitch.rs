//! Stitch step - joins gap silence and fitted clips into one track.

use crate::logging::StageDecision;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};
use crate::timeline::TimelineStitcher;

pub struct StitchStep;

impl StitchStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StitchStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for StitchStep {
    fn name(&self) -> &str {
        "Stitch"
    }

    fn description(&self) -> &str {
        "Assemble the dub timeline"
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.synthesis.is_none() || state.segments.is_none() {
            return Err(StepError::precondition_failed("segments not synthesized"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let (Some(output), Some(segments)) = (&state.synthesis, &state.segments) else {
            return Err(StepError::precondition_failed("segments not synthesized"));
        };

        let stitcher =
            TimelineStitcher::new(ctx.settings.timeline.clone(), ctx.settings.fit.sample_rate);
        let timeline = stitcher.stitch(&output.clips, segments)?;

        ctx.decide(StageDecision::TimelineStitched {
            chunks: timeline.chunks().len(),
            silence_chunks: timeline.silence_chunks(),
            duration_secs: timeline.duration_secs(),
        });

        state.stitched = Some(timeline.into_audio());
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.stitched.is_none() {
            return Err(StepError::invalid_output("stitched track not recorded"));
        }
        Ok(())
    }
}
