//! Runs one dub request end to end.
//!
//! The runner owns the status lifecycle around the pipeline: it rejects
//! unsupported languages, waits for the dubbing gate, keeps the heartbeat
//! alive, publishes outputs only on success and always clears the work
//! folder (unless configured to keep it).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::logging::{JobLogger, LogConfig};
use crate::media::{require_tool, ToolRunner};
use crate::models::DubLanguage;
use crate::orchestrator::{
    create_dub_pipeline, Context, JobReport, JobState, PipelineError, PipelineResult,
    ServiceFactory,
};

use super::admission::Admission;
use super::heartbeat::Heartbeat;
use super::layout::DubLayout;
use super::status::{DubStatus, StatusHandle, StatusResult, StatusStore};

/// Tools every job shells out to.
pub const REQUIRED_TOOLS: [&str; 2] = ["ffmpeg", "ffprobe"];

/// One dub to produce.
#[derive(Debug, Clone)]
pub struct DubRequest {
    pub job_id: String,
    /// Target language code (`hi`, `en`, `es`).
    pub lang: String,
    pub video: PathBuf,
}

/// A finished dub.
#[derive(Debug, Clone)]
pub struct DubOutcome {
    pub status: DubStatus,
    pub report: JobReport,
    /// Output files moved into the dub folder (empty when reused).
    pub published: Vec<PathBuf>,
}

pub struct DubJobRunner {
    settings: Settings,
    services: ServiceFactory,
    admission: Arc<Admission>,
    required_tools: Vec<String>,
}

impl DubJobRunner {
    pub fn new(settings: Settings, services: ServiceFactory) -> Self {
        Self {
            settings,
            services,
            admission: Arc::new(Admission::new()),
            required_tools: REQUIRED_TOOLS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Share admission gates with other runners of the same worker.
    pub fn with_admission(mut self, admission: Arc<Admission>) -> Self {
        self.admission = admission;
        self
    }

    /// Binaries checked on PATH before a job starts.
    pub fn with_required_tools(mut self, tools: Vec<String>) -> Self {
        self.required_tools = tools;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn admission(&self) -> &Arc<Admission> {
        &self.admission
    }

    pub fn layout(&self, job_id: &str, language: DubLanguage) -> DubLayout {
        DubLayout::new(&self.settings.paths, job_id, language.code())
    }

    /// Current status of a dub, if it has ever been requested.
    pub fn status(&self, job_id: &str, language: DubLanguage) -> StatusResult<Option<DubStatus>> {
        StatusStore::new(self.layout(job_id, language).status_path()).load()
    }

    pub fn run(&self, request: &DubRequest) -> PipelineResult<DubOutcome> {
        let language = match request.lang.parse::<DubLanguage>() {
            Ok(language) => language,
            Err(e) => {
                tracing::warn!("Rejecting job {}: {}", request.job_id, e);
                self.record_rejection(request);
                return Err(PipelineError::validation_failed(
                    &request.job_id,
                    "unsupported lang",
                ));
            }
        };

        let layout = self.layout(&request.job_id, language);
        let store = StatusStore::new(layout.status_path());
        let previous = store.load().unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable status: {}", e);
            None
        });
        let published_fingerprint = previous.and_then(|s| s.fingerprint);

        let mut initial = DubStatus::new(&request.job_id, language.code());
        initial.fingerprint = published_fingerprint.clone();
        let status = StatusHandle::new(store, initial);
        status
            .mark_queued()
            .map_err(|e| PipelineError::setup_failed(&request.job_id, e.to_string()))?;

        let _permit = self.admission.dubbing.acquire();
        tracing::info!("Dubbing {} into {}", request.job_id, language);

        status
            .mark_running()
            .map_err(|e| PipelineError::setup_failed(&request.job_id, e.to_string()))?;
        let mut heartbeat = Heartbeat::start(
            status.clone(),
            Duration::from_secs(self.settings.jobs.heartbeat_interval_secs.max(1)),
        );

        let result = match JobLogger::new(
            &request.job_id,
            layout.log_path(),
            LogConfig::from_settings(&self.settings.logging),
            None,
        ) {
            Ok(logger) => {
                let logger = Arc::new(logger);
                let result = self.execute(
                    request,
                    language,
                    &layout,
                    &status,
                    Arc::clone(&logger),
                    published_fingerprint,
                );
                if let Err(e) = &result {
                    logger.error(&e.status_message());
                    if let PipelineError::StepFailed { source, .. } = e {
                        let tail = source.output_tail();
                        if !tail.is_empty() {
                            logger.section("output tail");
                            for line in tail {
                                logger.info(line);
                            }
                        }
                    }
                }
                logger.close();
                result
            }
            Err(e) => Err(PipelineError::setup_failed(
                &request.job_id,
                format!("cannot open job log: {}", e),
            )),
        };

        heartbeat.stop();

        if let Err(e) = &result {
            if let Err(write_err) = status.mark_error(&e.status_message()) {
                tracing::error!("Could not record failure of {}: {}", request.job_id, write_err);
            }
        }

        if !self.settings.paths.keep_work_files {
            if let Err(e) = layout.remove_work_dir() {
                tracing::warn!(
                    "Could not remove work folder {}: {}",
                    layout.work_dir().display(),
                    e
                );
            }
        }

        result
    }

    fn execute(
        &self,
        request: &DubRequest,
        language: DubLanguage,
        layout: &DubLayout,
        status: &StatusHandle,
        logger: Arc<JobLogger>,
        published_fingerprint: Option<String>,
    ) -> PipelineResult<DubOutcome> {
        logger.marker("DUB START");
        logger.info(&format!(
            "job={} lang={} video={}",
            request.job_id,
            language,
            request.video.display()
        ));

        for tool in &self.required_tools {
            require_tool(tool)
                .map_err(|e| PipelineError::setup_failed(&request.job_id, e.to_string()))?;
        }

        let runner = ToolRunner::new(self.settings.logging.error_tail as usize)
            .with_logger(Arc::clone(&logger))
            .log_json(self.settings.logging.show_commands_json);
        let services = (self.services)(&runner);

        let stage_status = status.clone();
        let ctx = Context::new(
            &request.job_id,
            language,
            request.video.clone(),
            self.settings.clone(),
            layout.clone(),
            Arc::clone(&logger),
            runner,
            services,
            Arc::clone(&self.admission),
        )
        .with_published_fingerprint(published_fingerprint)
        .with_progress_callback(Box::new(move |step, _, _| {
            if let Err(e) = stage_status.set_stage(step) {
                tracing::warn!("Could not record stage {}: {}", step, e);
            }
        }));

        let mut state = JobState::new(&request.job_id);
        let run = create_dub_pipeline().run(&ctx, &mut state)?;

        let published = if state.cached {
            Vec::new()
        } else {
            layout.publish().map_err(|e| {
                PipelineError::setup_failed(&request.job_id, format!("publishing outputs: {}", e))
            })?
        };
        for path in &published {
            logger.info(&format!("Published {}", path.display()));
        }

        let report = JobReport::build(&ctx, &state, &run);
        if let Err(e) = write_report(&layout.report_path(), &report) {
            logger.warn(&format!("Could not write report: {}", e));
        }

        status
            .mark_done(state.cached, state.fingerprint().map(str::to_string))
            .map_err(|e| PipelineError::setup_failed(&request.job_id, e.to_string()))?;
        logger.marker("DUB DONE");

        Ok(DubOutcome {
            status: status.snapshot(),
            report,
            published,
        })
    }

    /// Persist an `error` status for a request naming an unsupported language.
    fn record_rejection(&self, request: &DubRequest) {
        let code = request.lang.trim().to_ascii_lowercase();
        // the code becomes a directory name
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return;
        }
        let layout = DubLayout::new(&self.settings.paths, &request.job_id, &code);
        let handle = StatusHandle::new(
            StatusStore::new(layout.status_path()),
            DubStatus::new(&request.job_id, &code),
        );
        if let Err(e) = handle.mark_error("unsupported lang") {
            tracing::warn!("Could not record rejection: {}", e);
        }
    }
}

fn write_report(path: &Path, report: &JobReport) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    let temp_file = path.with_extension("json.tmp");
    fs::write(&temp_file, json)?;
    fs::rename(&temp_file, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{job_fingerprint, DubState};
    use crate::logging::StageDecision;
    use crate::models::Transcript;
    use crate::orchestrator::test_support::{fixture_segments, fixture_services, TestJob};

    fn runner(job: &TestJob) -> DubJobRunner {
        let clip_rate = job.settings.fit.sample_rate;
        DubJobRunner::new(
            job.settings.clone(),
            Arc::new(move |_: &ToolRunner| fixture_services(clip_rate)),
        )
        .with_required_tools(Vec::new())
    }

    fn request(job: &TestJob, lang: &str) -> DubRequest {
        DubRequest {
            job_id: "job".to_string(),
            lang: lang.to_string(),
            video: job.video.clone(),
        }
    }

    #[test]
    fn unsupported_language_is_rejected_with_status() {
        let job = TestJob::new();
        let err = runner(&job).run(&request(&job, "fr")).unwrap_err();
        assert!(matches!(err, PipelineError::ValidationFailed { .. }));

        let status_path = Path::new(&job.settings.paths.data_root).join("job/dubs/fr/status.json");
        let status = StatusStore::new(status_path).load().unwrap().unwrap();
        assert_eq!(status.state, DubState::Error);
        assert_eq!(status.error.as_deref(), Some("unsupported lang"));
    }

    #[test]
    fn missing_video_fails_without_publishing() {
        let job = TestJob::new();
        let runner = runner(&job);
        let err = runner.run(&request(&job, "hi")).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StepFailed { ref step_name, .. } if step_name == "Prepare"
        ));

        let status = runner.status("job", DubLanguage::Hindi).unwrap().unwrap();
        assert_eq!(status.state, DubState::Error);
        assert!(status.error.unwrap().contains("source.mp4"));
        assert!(!job.layout.audio_path().exists());
        assert!(!job.layout.work_dir().exists());

        let log = fs::read_to_string(job.layout.log_path()).unwrap();
        assert!(log.contains("== DUB START =="));
        assert!(log.contains("ERROR: "));
    }

    #[test]
    fn matching_published_outputs_are_reused() {
        let job = TestJob::new();
        job.write_tone_video(120.0, 1.0);
        fs::create_dir_all(job.layout.dub_dir()).unwrap();
        fs::write(job.layout.audio_path(), vec![0u8; 4096]).unwrap();
        fs::write(job.layout.video_path(), vec![0u8; 20_000]).unwrap();

        let transcript = Transcript {
            language: Some("en".to_string()),
            segments: fixture_segments(),
        };
        let fingerprint = job_fingerprint(
            &job.video,
            DubLanguage::Hindi,
            &transcript,
            true,
            None,
            &job.settings,
        );
        let mut previous = DubStatus::new("job", "hi");
        previous.state = DubState::Done;
        previous.fingerprint = Some(fingerprint.clone());
        StatusStore::new(job.layout.status_path())
            .save(&previous)
            .unwrap();

        let outcome = runner(&job).run(&request(&job, "hi")).unwrap();

        assert_eq!(outcome.status.state, DubState::Done);
        assert!(outcome.status.cached);
        assert_eq!(outcome.status.fingerprint, Some(fingerprint));
        assert!(outcome.published.is_empty());
        assert!(outcome.report.decisions.contains(&StageDecision::Cached));
        assert!(job.layout.report_path().is_file());

        let log = fs::read_to_string(job.layout.log_path()).unwrap();
        assert!(log.contains("== DUB DONE =="));
    }

    #[test]
    fn missing_tool_fails_setup() {
        let job = TestJob::new();
        let runner = runner(&job).with_required_tools(vec!["dubsync-no-such-tool".to_string()]);
        let err = runner.run(&request(&job, "es")).unwrap_err();
        assert!(matches!(err, PipelineError::SetupFailed { .. }));
        assert_eq!(
            runner
                .status("job", DubLanguage::Spanish)
                .unwrap()
                .unwrap()
                .state,
            DubState::Error
        );
    }
}
