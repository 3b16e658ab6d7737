//! Merge step - coalesces recognizer segments into speakable units.

use crate::logging::StageDecision;
use crate::merge::merge_segments;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

pub struct MergeStep;

impl MergeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MergeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for MergeStep {
    fn name(&self) -> &str {
        "Merge"
    }

    fn description(&self) -> &str {
        "Merge recognizer segments"
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.transcript.is_none() {
            return Err(StepError::precondition_failed("no transcript"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let raw = state
            .transcript
            .as_ref()
            .map(|t| t.segments.as_slice())
            .unwrap_or_default();

        let merged = merge_segments(raw, &ctx.settings.merge);
        ctx.decide(StageDecision::SegmentsMerged {
            raw: raw.len(),
            merged: merged.len(),
        });
        if merged.is_empty() {
            ctx.logger
                .warn("No speech segments; the dub track will be silent");
        }

        state.segments = Some(merged);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let segments = state
            .segments
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("segments not recorded"))?;
        if segments.windows(2).any(|w| w[1].start < w[0].end) {
            return Err(StepError::invalid_output("merged segments overlap"));
        }
        Ok(())
    }
}
