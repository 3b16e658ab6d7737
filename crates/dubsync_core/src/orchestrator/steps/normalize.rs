//! Normalize step - writes the dub WAV with loudness normalization.

use std::fs;

use crate::jobs::AUDIO_FILE;
use crate::logging::StageDecision;
use crate::media::ffmpeg;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

/// Un-normalized WAV of the aligned track.
const RAW_AUDIO_FILE: &str = "dub_raw.wav";

/// A loudnorm failure is degraded, not fatal: the un-normalized track is kept.
pub struct NormalizeStep;

impl NormalizeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NormalizeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for NormalizeStep {
    fn name(&self) -> &str {
        "Normalize"
    }

    fn description(&self) -> &str {
        "Encode and loudness-normalize the dub track"
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.aligned.is_none() {
            return Err(StepError::precondition_failed("dub track not aligned"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let aligned = state
            .aligned
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("dub track not aligned"))?;

        let raw_path = ctx.work_dir().join(RAW_AUDIO_FILE);
        let audio_path = ctx.layout.work_output(AUDIO_FILE);
        ffmpeg::encode_wav(&ctx.runner, aligned, &raw_path)?;
        state.raw_audio_path = Some(raw_path.clone());

        let loudness = &ctx.settings.loudness;
        if !loudness.enabled {
            fs::rename(&raw_path, &audio_path)
                .map_err(|e| StepError::io_error("moving dub audio", e))?;
            state.audio_path = Some(audio_path);
            return Ok(StepOutcome::Skipped(
                "loudness normalization disabled".to_string(),
            ));
        }

        if let Err(e) = ffmpeg::normalize_loudness(
            &ctx.runner,
            &raw_path,
            &audio_path,
            loudness,
            aligned.sample_rate(),
        ) {
            ctx.decide(StageDecision::LoudnessSkipped {
                reason: e.to_string(),
            });
            fs::copy(&raw_path, &audio_path)
                .map_err(|e| StepError::io_error("keeping un-normalized audio", e))?;
        }

        state.audio_path = Some(audio_path);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        let path = state
            .audio_path
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("dub audio not written"))?;
        let bytes = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if bytes < ctx.settings.synthesis.min_clip_bytes {
            return Err(StepError::invalid_output(format!(
                "dub audio {} is only {} bytes",
                path.display(),
                bytes
            )));
        }
        Ok(())
    }
}
