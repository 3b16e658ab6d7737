//! Mux step - puts the dub track under the original video stream.

use std::fs;
use std::path::Path;

use crate::media::ffmpeg;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

/// Muxed video before captions are applied.
const MUXED_FILE: &str = "muxed.mp4";

pub struct MuxStep;

impl MuxStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MuxStep {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a produced video is large enough to be real.
pub(crate) fn check_video(path: &Path, min_bytes: u64) -> StepResult<()> {
    let bytes = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if bytes < min_bytes {
        return Err(StepError::invalid_output(format!(
            "video {} is {} bytes (minimum {})",
            path.display(),
            bytes,
            min_bytes
        )));
    }
    Ok(())
}

impl PipelineStep for MuxStep {
    fn name(&self) -> &str {
        "Mux"
    }

    fn description(&self) -> &str {
        "Mux dub audio with the source video"
    }

    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        match &state.audio_path {
            Some(path) if path.is_file() => {}
            _ => return Err(StepError::precondition_failed("dub audio not written")),
        }
        if !ctx.video.is_file() {
            return Err(StepError::file_not_found(&ctx.video));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let audio = state
            .audio_path
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("dub audio not written"))?;
        let output = ctx.work_dir().join(MUXED_FILE);

        ffmpeg::mux(&ctx.runner, &ctx.video, audio, &output, &ctx.settings.mux)?;

        state.muxed_path = Some(output);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        let path = state
            .muxed_path
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("muxed video not recorded"))?;
        check_video(path, ctx.settings.mux.min_video_bytes)
    }
}
