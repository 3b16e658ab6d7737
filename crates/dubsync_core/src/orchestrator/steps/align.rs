//! Align step - pads or trims the dub track to the video duration.

use crate::logging::StageDecision;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};
use crate::timeline::{align_to_video, Alignment};

pub struct AlignStep;

impl AlignStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AlignStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for AlignStep {
    fn name(&self) -> &str {
        "Align"
    }

    fn description(&self) -> &str {
        "Match dub length to the video"
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.stitched.is_none() {
            return Err(StepError::precondition_failed("timeline not stitched"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let stitched = state
            .stitched
            .clone()
            .ok_or_else(|| StepError::precondition_failed("timeline not stitched"))?;
        let video_secs = state.media.as_ref().and_then(|m| m.video_secs);

        let aligned = match align_to_video(stitched, video_secs) {
            Alignment::Aligned {
                audio,
                before_secs,
                after_secs,
            } => {
                ctx.decide(StageDecision::FinalAlignment {
                    video_secs: video_secs.unwrap_or(after_secs),
                    before_secs,
                    after_secs,
                });
                audio
            }
            Alignment::Skipped { audio, reason } => {
                ctx.decide(StageDecision::AlignmentSkipped { reason });
                audio
            }
        };

        state.aligned = Some(aligned);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match &state.aligned {
            Some(audio) if !audio.is_empty() => Ok(()),
            Some(_) => Err(StepError::invalid_output("dub track is empty")),
            None => Err(StepError::invalid_output("aligned track not recorded")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioBuffer;
    use crate::orchestrator::test_support::TestJob;

    fn state_with(job: &TestJob, video_secs: Option<f64>, stitched_len: usize) -> JobState {
        let mut state = JobState::new("job");
        let mut media = job.prepared_media();
        media.video_secs = video_secs;
        state.media = Some(media);
        state.stitched = Some(AudioBuffer::new(vec![0.1; stitched_len], 1000));
        state
    }

    #[test]
    fn pads_to_video_duration() {
        let job = TestJob::new();
        let ctx = job.context();
        let mut state = state_with(&job, Some(10.0), 6000);

        AlignStep::new().execute(&ctx, &mut state).unwrap();
        AlignStep::new().validate_output(&ctx, &state).unwrap();

        assert_eq!(state.aligned.unwrap().len(), 10_000);
        assert_eq!(
            ctx.logger.decisions(),
            vec![StageDecision::FinalAlignment {
                video_secs: 10.0,
                before_secs: 6.0,
                after_secs: 10.0
            }]
        );
    }

    #[test]
    fn unknown_duration_is_degraded_not_fatal() {
        let job = TestJob::new();
        let ctx = job.context();
        let mut state = state_with(&job, None, 6000);

        AlignStep::new().execute(&ctx, &mut state).unwrap();
        assert_eq!(state.aligned.unwrap().len(), 6000);
        assert!(ctx.logger.decisions()[0].is_degraded());
    }

    #[test]
    fn empty_track_without_video_length_fails() {
        let job = TestJob::new();
        let ctx = job.context();
        let mut state = state_with(&job, None, 0);

        AlignStep::new().execute(&ctx, &mut state).unwrap();
        assert!(AlignStep::new().validate_output(&ctx, &state).is_err());
    }
}
