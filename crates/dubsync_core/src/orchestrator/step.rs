//! Pipeline step trait definition.

use super::errors::StepResult;
use super::types::{Context, JobState, StepOutcome};

/// Trait for pipeline steps.
///
/// The pipeline runner calls these methods in order:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work
/// 3. `validate_output` - Verify the step produced valid output
///
/// # Example
///
/// ```ignore
/// struct MergeStep;
///
/// impl PipelineStep for MergeStep {
///     fn name(&self) -> &str { "Merge" }
///
///     fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
///         if state.transcript.is_none() {
///             return Err(StepError::precondition_failed("no transcript"));
///         }
///         Ok(())
///     }
///
///     fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
///         state.segments = Some(merge_segments(..));
///         Ok(StepOutcome::Success)
///     }
///
///     fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait PipelineStep: Send + Sync {
    /// Step name (for logging, status stage and error context).
    fn name(&self) -> &str;

    /// Check that everything this step reads is in place.
    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Perform the step's work and record results in `state`.
    ///
    /// `StepOutcome::Skipped` is not an error; `StepOutcome::Finished`
    /// ends the job early with success.
    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome>;

    /// Verify the step produced valid output. Called after `Success`.
    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
