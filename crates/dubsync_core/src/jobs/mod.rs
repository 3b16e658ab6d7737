//! Dub job lifecycle: status file, heartbeat, admission and outputs.
//!
//! A job is one `(job_id, lang)` pair. Everything a caller can observe
//! about it lives in `<data_root>/<job_id>/dubs/<lang>/`; intermediate
//! files live in a per-job work folder that is removed afterwards.

mod admission;
mod fingerprint;
mod heartbeat;
mod layout;
mod runner;
mod status;

pub use admission::{Admission, AdmissionGate, GatePermit};
pub use fingerprint::job_fingerprint;
pub use heartbeat::Heartbeat;
pub use layout::{
    DubLayout, AUDIO_FILE, CAPTIONS_FILE, LOG_FILE, PUBLISHED_FILES, REPORT_FILE, STATUS_FILE,
    VIDEO_FILE,
};
pub use runner::{DubJobRunner, DubOutcome, DubRequest, REQUIRED_TOOLS};
pub use status::{
    DubState, DubStatus, JobHealth, StatusError, StatusHandle, StatusResult, StatusStore,
};
