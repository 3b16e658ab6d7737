//! Prepare step - probes the source video and extracts its audio.

use std::fs;

use crate::media::probe_media;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, PreparedMedia, StepOutcome};

/// Reads video duration and frame height, then decodes the source audio
/// for speaker profiling. Holds the extraction gate while it runs.
pub struct PrepareStep;

impl PrepareStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PrepareStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for PrepareStep {
    fn name(&self) -> &str {
        "Prepare"
    }

    fn description(&self) -> &str {
        "Probe source video and extract audio"
    }

    fn validate_input(&self, ctx: &Context, _state: &JobState) -> StepResult<()> {
        if !ctx.video.is_file() {
            return Err(StepError::file_not_found(&ctx.video));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let _permit = ctx.admission.extraction.acquire();

        fs::create_dir_all(ctx.work_dir())
            .map_err(|e| StepError::io_error("creating work directory", e))?;

        let (video_secs, frame_height) = match probe_media(&ctx.runner, &ctx.video) {
            Ok(probe) => (probe.duration_secs, probe.height),
            Err(e) => {
                ctx.logger
                    .warn(&format!("Could not probe {}: {}", ctx.video.display(), e));
                (None, None)
            }
        };

        let sample_rate = ctx.settings.profiler.sample_rate;
        let source_audio = ctx.services.decoder.decode(&ctx.video, sample_rate)?;

        ctx.logger.info(&format!(
            "Source: duration={} height={} audio={:.3}s @ {} Hz",
            video_secs
                .map(|s| format!("{:.3}s", s))
                .unwrap_or_else(|| "unknown".to_string()),
            frame_height
                .map(|h| h.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            source_audio.duration_secs(),
            sample_rate
        ));

        state.media = Some(PreparedMedia {
            video_secs,
            frame_height,
            source_audio,
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match &state.media {
            Some(media) if !media.source_audio.is_empty() => Ok(()),
            Some(_) => Err(StepError::invalid_output("source audio is empty")),
            None => Err(StepError::invalid_output("source media not recorded")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::test_support::TestJob;

    #[test]
    fn missing_video_fails_validation() {
        let job = TestJob::new();
        let mut ctx = job.context();
        ctx.video = job.dir.path().join("nope.mp4");
        assert!(matches!(
            PrepareStep::new().validate_input(&ctx, &JobState::new("job")),
            Err(StepError::FileNotFound { .. })
        ));
    }

    #[test]
    fn decodes_source_audio() {
        let job = TestJob::new();
        job.write_tone_video(150.0, 2.0);
        let ctx = job.context();
        let step = PrepareStep::new();
        let mut state = JobState::new("job");

        step.validate_input(&ctx, &state).unwrap();
        assert_eq!(step.execute(&ctx, &mut state).unwrap(), StepOutcome::Success);
        step.validate_output(&ctx, &state).unwrap();

        let media = state.media.unwrap();
        let expected = 2 * ctx.settings.profiler.sample_rate as usize;
        assert_eq!(media.source_audio.len(), expected);
        assert!(ctx.work_dir().is_dir());
        assert_eq!(ctx.admission.extraction.in_use(), 0);
    }
}
