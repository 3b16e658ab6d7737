//! Transcribe step - runs the recognizer and checks for reusable outputs.

use crate::jobs::job_fingerprint;
use crate::logging::StageDecision;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome, TranscriptOutput};

pub struct TranscribeStep;

impl TranscribeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TranscribeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for TranscribeStep {
    fn name(&self) -> &str {
        "Transcribe"
    }

    fn description(&self) -> &str {
        "Recognize source speech"
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.media.is_none() {
            return Err(StepError::precondition_failed("source media not prepared"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let recognizer = &ctx.services.recognizer;
        let transcript = recognizer.transcribe(&ctx.video)?;
        ctx.logger.info(&format!(
            "{}: {} segments, {} chars",
            recognizer.name(),
            transcript.segments.len(),
            transcript
                .segments
                .iter()
                .map(|s| s.text.chars().count())
                .sum::<usize>()
        ));

        // unknown source language: translate to be safe
        let translate = match &transcript.language {
            Some(code) => !ctx.language.matches_code(code),
            None => true,
        };
        ctx.decide(StageDecision::SourceLanguage {
            detected: transcript.language.clone(),
            translate,
        });

        let translator = ctx.services.translator.as_ref().map(|t| t.identity());
        let fingerprint = job_fingerprint(
            &ctx.video,
            ctx.language,
            &transcript,
            translate,
            translator.as_deref(),
            &ctx.settings,
        );
        ctx.logger.debug(&format!("Job fingerprint {}", fingerprint));

        let reusable = ctx.settings.jobs.reuse_cached
            && ctx.published_fingerprint.as_deref() == Some(fingerprint.as_str())
            && ctx.layout.has_valid_outputs(
                ctx.settings.synthesis.min_clip_bytes,
                ctx.settings.mux.min_video_bytes,
            );

        state.transcript = Some(TranscriptOutput {
            detected_language: transcript.language,
            segments: transcript.segments,
            translate,
            fingerprint,
        });

        if reusable {
            state.cached = true;
            ctx.decide(StageDecision::Cached);
            return Ok(StepOutcome::Finished(
                "published outputs match this job".to_string(),
            ));
        }

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.transcript.is_none() {
            return Err(StepError::invalid_output("transcript not recorded"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DubLanguage;
    use crate::orchestrator::test_support::TestJob;
    use crate::services::{TranslationResult, Translator};
    use std::fs;
    use std::sync::Arc;

    struct Upper;

    impl Translator for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn translate(&self, text: &str, _target: DubLanguage) -> TranslationResult<String> {
            Ok(text.to_uppercase())
        }
    }

    fn with_published_outputs(job: &TestJob) {
        fs::create_dir_all(job.layout.dub_dir()).unwrap();
        fs::write(job.layout.audio_path(), vec![0u8; 4096]).unwrap();
        fs::write(job.layout.video_path(), vec![0u8; 20_000]).unwrap();
    }

    fn prepared(job: &TestJob) -> JobState {
        let mut state = JobState::new("job");
        state.media = Some(job.prepared_media());
        state
    }

    #[test]
    fn records_transcript_and_language() {
        let job = TestJob::new();
        let ctx = job.context();
        let mut state = prepared(&job);

        let outcome = TranscribeStep::new().execute(&ctx, &mut state).unwrap();
        assert_eq!(outcome, StepOutcome::Success);

        let transcript = state.transcript.unwrap();
        assert_eq!(transcript.segments.len(), 3);
        assert!(transcript.translate);
        assert!(matches!(
            ctx.logger.decisions().first(),
            Some(StageDecision::SourceLanguage { translate: true, .. })
        ));
    }

    #[test]
    fn matching_outputs_finish_the_job() {
        let job = TestJob::new();
        let mut state = prepared(&job);

        // first pass learns the fingerprint
        TranscribeStep::new()
            .execute(&job.context(), &mut state)
            .unwrap();
        let fingerprint = state.fingerprint().unwrap().to_string();
        with_published_outputs(&job);

        let ctx = job.context().with_published_fingerprint(Some(fingerprint));
        let mut state = prepared(&job);
        let outcome = TranscribeStep::new().execute(&ctx, &mut state).unwrap();

        assert!(matches!(outcome, StepOutcome::Finished(_)));
        assert!(state.cached);
        assert!(ctx.logger.decisions().contains(&StageDecision::Cached));
    }

    #[test]
    fn stale_fingerprint_runs_normally() {
        let job = TestJob::new();
        with_published_outputs(&job);

        let ctx = job
            .context()
            .with_published_fingerprint(Some("0000".to_string()));
        let mut state = prepared(&job);
        assert_eq!(
            TranscribeStep::new().execute(&ctx, &mut state).unwrap(),
            StepOutcome::Success
        );
        assert!(!state.cached);
    }

    #[test]
    fn outputs_from_an_untranslated_run_are_not_reused_once_translating() {
        let job = TestJob::new();
        let mut state = prepared(&job);
        TranscribeStep::new()
            .execute(&job.context(), &mut state)
            .unwrap();
        let untranslated = state.fingerprint().unwrap().to_string();
        with_published_outputs(&job);

        let mut ctx = job.context().with_published_fingerprint(Some(untranslated.clone()));
        ctx.services.translator = Some(Arc::new(Upper));
        let mut state = prepared(&job);
        let outcome = TranscribeStep::new().execute(&ctx, &mut state).unwrap();

        assert_eq!(outcome, StepOutcome::Success);
        assert!(!state.cached);
        assert_ne!(state.fingerprint(), Some(untranslated.as_str()));
    }
}
