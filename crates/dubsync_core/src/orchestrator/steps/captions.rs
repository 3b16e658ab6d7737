//! Captions step - writes the SRT and burns it into the video.

use std::fs;

use crate::captions::{force_style, select_font, write_srt, CaptionLayout};
use crate::jobs::{CAPTIONS_FILE, VIDEO_FILE};
use crate::logging::StageDecision;
use crate::media::ffmpeg;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

use super::mux::check_video;

pub struct CaptionsStep;

impl CaptionsStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CaptionsStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for CaptionsStep {
    fn name(&self) -> &str {
        "Captions"
    }

    fn description(&self) -> &str {
        "Write and burn captions"
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.synthesis.is_none() {
            return Err(StepError::precondition_failed("no captions produced"));
        }
        match &state.muxed_path {
            Some(path) if path.is_file() => Ok(()),
            _ => Err(StepError::precondition_failed("video not muxed")),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let (Some(output), Some(muxed)) = (&state.synthesis, &state.muxed_path) else {
            return Err(StepError::precondition_failed("video not muxed"));
        };
        let settings = &ctx.settings.captions;

        let srt_path = ctx.layout.work_output(CAPTIONS_FILE);
        write_srt(&srt_path, &output.captions, settings.max_line_chars)
            .map_err(|e| StepError::io_error("writing captions", e))?;
        ctx.logger.info(&format!(
            "Wrote {} captions to {}",
            output.captions.len(),
            srt_path.display()
        ));
        state.captions_path = Some(srt_path.clone());

        let video_path = ctx.layout.work_output(VIDEO_FILE);
        if !settings.burn || output.captions.is_empty() {
            fs::rename(muxed, &video_path)
                .map_err(|e| StepError::io_error("moving muxed video", e))?;
            state.video_path = Some(video_path);
            return Ok(StepOutcome::Success);
        }

        let choice = select_font(
            ctx.language,
            &settings.fonts,
            ctx.services.font_probe.as_ref(),
        );
        if let Some(reason) = &choice.probe_error {
            ctx.logger
                .warn(&format!("Font probe unavailable, using default: {}", reason));
        }
        ctx.decide(StageDecision::FontSelected {
            font: choice.font.clone(),
            fallback: choice.fallback,
        });

        let frame_height = state.media.as_ref().and_then(|m| m.frame_height);
        let layout = CaptionLayout::for_frame(frame_height, settings);
        let style = force_style(settings.style, &choice.font, layout);
        ctx.logger.debug(&format!("force_style={}", style));

        ffmpeg::burn_subtitles(&ctx.runner, muxed, &srt_path, &style, &video_path)?;

        state.video_path = Some(video_path);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        let path = state
            .video_path
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("final video not recorded"))?;
        check_video(path, ctx.settings.mux.min_video_bytes)
    }
}
