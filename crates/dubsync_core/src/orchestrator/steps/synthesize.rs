//! Synthesize step - translate, speak and fit every segment.

use std::sync::Arc;

use crate::fit::DurationFitter;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};
use crate::synthesis::{SegmentSynthesizer, SynthesisPlan};

/// Clip subfolder of the work directory.
const CLIP_DIR: &str = "clips";

pub struct SynthesizeStep;

impl SynthesizeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SynthesizeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for SynthesizeStep {
    fn name(&self) -> &str {
        "Synthesize"
    }

    fn description(&self) -> &str {
        "Translate, synthesize and fit segments"
    }

    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.segments.is_none() || state.transcript.is_none() {
            return Err(StepError::precondition_failed("segments not merged"));
        }
        if state.voice.is_none() {
            return Err(StepError::precondition_failed("speaker not profiled"));
        }
        if ctx.services.synthesizers.is_empty() {
            return Err(StepError::invalid_input("no synthesis backends configured"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let (Some(segments), Some(transcript), Some(voice)) =
            (&state.segments, &state.transcript, &state.voice)
        else {
            return Err(StepError::precondition_failed("segments not merged"));
        };

        let fitter = DurationFitter::new(
            ctx.settings.fit.clone(),
            Arc::clone(&ctx.services.stretcher),
        );
        let mut synthesizer = SegmentSynthesizer::new(
            ctx.services.synthesizers.clone(),
            Arc::clone(&ctx.services.decoder),
            fitter,
            ctx.settings.synthesis.clone(),
            ctx.work_dir().join(CLIP_DIR),
            Arc::clone(&ctx.logger),
        );
        if let Some(translator) = &ctx.services.translator {
            synthesizer = synthesizer.with_translator(Arc::clone(translator));
        }

        let plan = SynthesisPlan {
            target: ctx.language,
            translate: transcript.translate,
            voice: voice.voice.clone(),
            speaker: voice.profile.class,
        };

        ctx.logger.info(&format!(
            "Synthesizing {} segments with {} (translate={})",
            segments.len(),
            plan.voice,
            plan.translate
        ));
        let output = synthesizer.synthesize_all(segments, &plan)?;

        state.synthesis = Some(output);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let output = state
            .synthesis
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("synthesis output not recorded"))?;
        if output.clips.len() != output.captions.len() {
            return Err(StepError::invalid_output(format!(
                "{} clips but {} captions",
                output.clips.len(),
                output.captions.len()
            )));
        }
        Ok(())
    }
}
