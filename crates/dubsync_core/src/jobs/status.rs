//! Persisted dub status (`status.json`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("I/O error on status file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid status file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StatusResult<T> = Result<T, StatusError>;

/// Lifecycle of one dub job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DubState {
    Queued,
    Running,
    Done,
    Error,
}

impl std::fmt::Display for DubState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DubState::Queued => write!(f, "queued"),
            DubState::Running => write!(f, "running"),
            DubState::Done => write!(f, "done"),
            DubState::Error => write!(f, "error"),
        }
    }
}

/// The only record that outlives a job run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DubStatus {
    pub job_id: String,
    pub lang: String,
    pub state: DubState,
    #[serde(default)]
    pub error: Option<String>,
    /// Pipeline step currently running.
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub heartbeat_at: Option<DateTime<Utc>>,
    /// Outputs were reused from an earlier identical run.
    #[serde(default)]
    pub cached: bool,
    /// Fingerprint of the inputs that produced the published outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// What a reader should make of a status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobHealth {
    Queued,
    Running,
    /// Running, but the heartbeat is older than the stale threshold.
    Stalled { heartbeat_age_secs: i64 },
    Done,
    Failed,
}

impl DubStatus {
    pub fn new(job_id: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            lang: lang.into(),
            state: DubState::Queued,
            error: None,
            stage: None,
            started_at: None,
            updated_at: Utc::now(),
            heartbeat_at: None,
            cached: false,
            fingerprint: None,
        }
    }

    /// Seconds since the last sign of life (heartbeat, else last update).
    pub fn heartbeat_age(&self, now: DateTime<Utc>) -> Duration {
        now - self.heartbeat_at.unwrap_or(self.updated_at)
    }

    pub fn health(&self, now: DateTime<Utc>, stale_after_secs: u64) -> JobHealth {
        match self.state {
            DubState::Queued => JobHealth::Queued,
            DubState::Done => JobHealth::Done,
            DubState::Error => JobHealth::Failed,
            DubState::Running => {
                let age = self.heartbeat_age(now).num_seconds();
                if age > stale_after_secs as i64 {
                    JobHealth::Stalled {
                        heartbeat_age_secs: age,
                    }
                } else {
                    JobHealth::Running
                }
            }
        }
    }
}

/// Reads and atomically writes one status file.
#[derive(Debug, Clone)]
pub struct StatusStore {
    path: PathBuf,
}

impl StatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the status; `None` if no file exists yet.
    pub fn load(&self) -> StatusResult<Option<DubStatus>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(|e| self.io_err(e))?;
        let status = serde_json::from_str(&content).map_err(|source| StatusError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(status))
    }

    /// Write via a temp file and rename so readers never see a partial file.
    pub fn save(&self, status: &DubStatus) -> StatusResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let json = serde_json::to_string_pretty(status).map_err(|source| StatusError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let temp_file = self.path.with_extension("json.tmp");
        fs::write(&temp_file, &json).map_err(|e| self.io_err(e))?;
        fs::rename(&temp_file, &self.path).map_err(|e| self.io_err(e))?;

        tracing::debug!(
            "Saved status {} ({}) to {}",
            status.state,
            status.stage.as_deref().unwrap_or("-"),
            self.path.display()
        );
        Ok(())
    }

    fn io_err(&self, source: io::Error) -> StatusError {
        StatusError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Shared, write-through view of a running job's status.
///
/// The job thread and the heartbeat thread both update it; every update
/// is persisted under the lock so writes never interleave.
#[derive(Clone)]
pub struct StatusHandle {
    inner: Arc<Mutex<DubStatus>>,
    store: StatusStore,
}

impl StatusHandle {
    pub fn new(store: StatusStore, status: DubStatus) -> Self {
        Self {
            inner: Arc::new(Mutex::new(status)),
            store,
        }
    }

    pub fn snapshot(&self) -> DubStatus {
        self.inner.lock().clone()
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    fn update(&self, change: impl FnOnce(&mut DubStatus)) -> StatusResult<()> {
        let mut status = self.inner.lock();
        change(&mut status);
        status.updated_at = Utc::now();
        self.store.save(&status)
    }

    pub fn mark_queued(&self) -> StatusResult<()> {
        self.update(|s| {
            s.state = DubState::Queued;
            s.error = None;
            s.stage = None;
        })
    }

    pub fn mark_running(&self) -> StatusResult<()> {
        self.update(|s| {
            let now = Utc::now();
            s.state = DubState::Running;
            s.error = None;
            s.cached = false;
            s.started_at = Some(now);
            s.heartbeat_at = Some(now);
        })
    }

    pub fn set_stage(&self, stage: &str) -> StatusResult<()> {
        self.update(|s| {
            s.stage = Some(stage.to_string());
            s.heartbeat_at = Some(Utc::now());
        })
    }

    pub fn beat(&self) -> StatusResult<()> {
        self.update(|s| s.heartbeat_at = Some(Utc::now()))
    }

    pub fn mark_done(&self, cached: bool, fingerprint: Option<String>) -> StatusResult<()> {
        self.update(|s| {
            s.state = DubState::Done;
            s.error = None;
            s.stage = None;
            s.cached = cached;
            if fingerprint.is_some() {
                s.fingerprint = fingerprint;
            }
        })
    }

    pub fn mark_error(&self, message: &str) -> StatusResult<()> {
        self.update(|s| {
            s.state = DubState::Error;
            s.error = Some(message.to_string());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_load_roundtrip_is_atomic() {
        let dir = tempdir().unwrap();
        let store = StatusStore::new(dir.path().join("dubs/hi/status.json"));
        assert!(store.load().unwrap().is_none());

        let status = DubStatus::new("job-1", "hi");
        store.save(&status).unwrap();

        assert_eq!(store.load().unwrap(), Some(status));
        assert!(!dir.path().join("dubs/hi/status.json.tmp").exists());
    }

    #[test]
    fn serializes_snake_case_state() {
        let json = serde_json::to_string(&DubStatus::new("j", "es")).unwrap();
        assert!(json.contains("\"state\":\"queued\""));
        assert!(!json.contains("fingerprint"));
    }

    #[test]
    fn handle_tracks_lifecycle() {
        let dir = tempdir().unwrap();
        let store = StatusStore::new(dir.path().join("status.json"));
        let handle = StatusHandle::new(store.clone(), DubStatus::new("job", "en"));

        handle.mark_running().unwrap();
        handle.set_stage("Synthesize").unwrap();
        let on_disk = store.load().unwrap().unwrap();
        assert_eq!(on_disk.state, DubState::Running);
        assert_eq!(on_disk.stage.as_deref(), Some("Synthesize"));
        assert!(on_disk.heartbeat_at.is_some());

        handle.mark_error("boom").unwrap();
        let on_disk = store.load().unwrap().unwrap();
        assert_eq!(on_disk.state, DubState::Error);
        assert_eq!(on_disk.error.as_deref(), Some("boom"));
    }

    #[test]
    fn done_keeps_previous_fingerprint_when_none_given() {
        let dir = tempdir().unwrap();
        let mut status = DubStatus::new("job", "en");
        status.fingerprint = Some("abc".into());
        let handle = StatusHandle::new(StatusStore::new(dir.path().join("s.json")), status);

        handle.mark_done(true, None).unwrap();
        let snapshot = handle.snapshot();
        assert!(snapshot.cached);
        assert_eq!(snapshot.fingerprint.as_deref(), Some("abc"));
    }

    #[test]
    fn stalled_when_heartbeat_is_old() {
        let now = Utc::now();
        let mut status = DubStatus::new("job", "hi");
        status.state = DubState::Running;
        status.heartbeat_at = Some(now - Duration::seconds(200));

        assert_eq!(
            status.health(now, 180),
            JobHealth::Stalled {
                heartbeat_age_secs: 200
            }
        );

        status.heartbeat_at = Some(now - Duration::seconds(30));
        assert_eq!(status.health(now, 180), JobHealth::Running);

        status.state = DubState::Done;
        status.heartbeat_at = Some(now - Duration::seconds(10_000));
        assert_eq!(status.health(now, 180), JobHealth::Done);
    }
}
