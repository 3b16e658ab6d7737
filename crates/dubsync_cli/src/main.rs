//! dubsync - command line entry point
//!
//! Handles:
//! - Configuration loading (platform config dir or `--config`)
//! - Application-level logging (stderr plus a daily file in the logs folder)
//! - Running a dub job and reporting its status

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use dubsync_core::config::{ConfigManager, Settings};
use dubsync_core::jobs::{DubJobRunner, DubLayout, DubRequest, JobHealth, StatusStore};
use dubsync_core::logging::{init_tracing_with_file, LogLevel};
use dubsync_core::media::ToolRunner;
use dubsync_core::models::DubLanguage;
use dubsync_core::orchestrator::{DubServices, PipelineError};
use dubsync_core::services::{HttpTranslator, Recognizer, TranscriptFileRecognizer, Translator};

/// The job failed in a pipeline step.
const EXIT_JOB_FAILED: u8 = 1;
/// The request was rejected before the job started.
const EXIT_REJECTED: u8 = 2;
/// A running job has stopped heartbeating.
const EXIT_STALLED: u8 = 3;

#[derive(Debug, Parser)]
#[command(name = "dubsync")]
#[command(about = "Timed dub alignment: synthesize, fit and mux a dubbed audio track")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config folder).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr and the log file.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Produce a dub of one video.
    Run {
        /// Job id; outputs land in `<data_root>/<job>/dubs/<lang>/`.
        #[arg(long)]
        job: String,
        /// Target language (hi, en, es).
        #[arg(long)]
        lang: String,
        /// Source video.
        #[arg(long)]
        video: PathBuf,
        /// Recognizer JSON for the video's speech.
        #[arg(long)]
        transcript: PathBuf,
        /// Speak the source text without calling the translator.
        #[arg(long)]
        no_translate: bool,
    },
    /// Show a dub's status, flagging stalled jobs.
    Status {
        #[arg(long)]
        job: String,
        #[arg(long)]
        lang: String,
        /// Print the raw status JSON.
        #[arg(long)]
        json: bool,
    },
    /// Write a config file with every default filled in.
    InitConfig {
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Platform config path, or `.config/dubsync.toml` when no home is known.
fn default_config_path() -> PathBuf {
    ProjectDirs::from("", "", "dubsync")
        .map(|dirs| dirs.config_dir().join("dubsync.toml"))
        .unwrap_or_else(|| PathBuf::from(".config").join("dubsync.toml"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    if let Commands::InitConfig { force } = cli.command {
        return init_config(&config_path, force);
    }

    let mut config = ConfigManager::new(&config_path);
    config
        .load_or_create()
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let _log_guard = init_tracing_with_file(level, &config.logs_folder());

    tracing::debug!("dubsync {} config={}", dubsync_core::version(), config_path.display());

    match cli.command {
        Commands::Run {
            job,
            lang,
            video,
            transcript,
            no_translate,
        } => {
            config
                .ensure_dirs_exist()
                .context("creating data, work and log folders")?;
            run_job(
                config.settings().clone(),
                DubRequest {
                    job_id: job,
                    lang,
                    video,
                },
                transcript,
                no_translate,
            )
        }
        Commands::Status { job, lang, json } => show_status(config.settings(), &job, &lang, json),
        Commands::InitConfig { .. } => Ok(ExitCode::SUCCESS),
    }
}

fn init_config(path: &Path, force: bool) -> Result<ExitCode> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to replace it)", path.display());
    }
    if force && path.exists() {
        std::fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
    }
    let mut config = ConfigManager::new(path);
    config
        .load_or_create()
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn run_job(
    settings: Settings,
    request: DubRequest,
    transcript: PathBuf,
    no_translate: bool,
) -> Result<ExitCode> {
    if !transcript.is_file() {
        bail!("transcript {} not found", transcript.display());
    }

    // constructed once and shared by every job this process runs
    let recognizer: Arc<dyn Recognizer> = Arc::new(TranscriptFileRecognizer::new(transcript));
    let translator: Option<Arc<dyn Translator>> = if no_translate {
        None
    } else {
        let client = HttpTranslator::new(&settings.translation)
            .context("building translation client")?;
        Some(Arc::new(client))
    };

    let service_settings = settings.clone();
    let runner = DubJobRunner::new(
        settings,
        Arc::new(move |tools: &ToolRunner| {
            DubServices::process_backed(
                tools,
                &service_settings,
                Arc::clone(&recognizer),
                translator.clone(),
            )
        }),
    );

    match runner.run(&request) {
        Ok(outcome) => {
            let status = outcome.status;
            if status.cached {
                println!("{} [{}]: done (reused earlier outputs)", status.job_id, status.lang);
            } else {
                println!("{} [{}]: done", status.job_id, status.lang);
            }
            for path in &outcome.published {
                println!("  {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ PipelineError::ValidationFailed { .. }) => {
            eprintln!("Rejected: {}", e.status_message());
            Ok(ExitCode::from(EXIT_REJECTED))
        }
        Err(e) => {
            eprintln!("Failed: {}", e);
            Ok(ExitCode::from(EXIT_JOB_FAILED))
        }
    }
}

fn show_status(settings: &Settings, job: &str, lang: &str, json: bool) -> Result<ExitCode> {
    let language: DubLanguage = lang.parse()?;
    let stale_after = settings.jobs.stale_after_secs;
    let layout = DubLayout::new(&settings.paths, job, language.code());

    let Some(status) = StatusStore::new(layout.status_path())
        .load()
        .context("reading status file")?
    else {
        eprintln!("No dub for {} [{}]", job, language);
        return Ok(ExitCode::FAILURE);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    }

    let now = Utc::now();
    let health = status.health(now, stale_after);
    if !json {
        println!("{} [{}]: {}", status.job_id, status.lang, status.state);
        if let Some(stage) = &status.stage {
            println!("  stage: {}", stage);
        }
        if let Some(error) = &status.error {
            println!("  error: {}", error);
        }
        if status.cached {
            println!("  reused earlier outputs");
        }
        println!(
            "  updated: {} ({}s ago)",
            status.updated_at.to_rfc3339(),
            (now - status.updated_at).num_seconds()
        );
    }

    match health {
        JobHealth::Stalled { heartbeat_age_secs } => {
            eprintln!(
                "  STALLED: no heartbeat for {}s (threshold {}s)",
                heartbeat_age_secs, stale_after
            );
            Ok(ExitCode::from(EXIT_STALLED))
        }
        JobHealth::Failed => Ok(ExitCode::from(EXIT_JOB_FAILED)),
        JobHealth::Queued | JobHealth::Running | JobHealth::Done => Ok(ExitCode::SUCCESS),
    }
}
