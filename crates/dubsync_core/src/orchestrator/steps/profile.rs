//! Profile step - classifies the source speaker and picks a voice.

use crate::logging::StageDecision;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome, VoiceOutput};
use crate::profiler::profile_speaker;
use crate::synthesis::select_voice;

pub struct ProfileStep;

impl ProfileStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProfileStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ProfileStep {
    fn name(&self) -> &str {
        "Profile"
    }

    fn description(&self) -> &str {
        "Estimate speaker pitch class"
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.media.is_none() {
            return Err(StepError::precondition_failed("source audio not extracted"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let media = state
            .media
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("source audio not extracted"))?;

        let profile = profile_speaker(&media.source_audio, &ctx.settings.profiler);
        ctx.decide(StageDecision::SpeakerProfiled {
            class: profile.class,
            median_hz: profile.estimate.as_ref().and_then(|e| e.median_hz),
            voiced_windows: profile
                .estimate
                .as_ref()
                .map(|e| e.voiced_windows)
                .unwrap_or(0),
            forced: profile.forced,
        });

        let voice = select_voice(ctx.language, profile.class, &ctx.settings.synthesis.voices);
        ctx.decide(StageDecision::VoiceSelected {
            voice: voice.clone(),
            class: profile.class,
        });

        state.voice = Some(VoiceOutput { profile, voice });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match &state.voice {
            Some(v) if !v.voice.is_empty() => Ok(()),
            _ => Err(StepError::invalid_output("no voice selected")),
        }
    }
}
