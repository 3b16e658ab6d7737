//! dubsync core - timed dub alignment engine.
//!
//! This crate contains all dubbing logic with zero CLI dependencies:
//! segment merging, speaker profiling, synthesis with duration fitting,
//! timeline stitching, caption generation and the ffmpeg-driven
//! mux/burn stages. It can be driven by the `dubsync` CLI or embedded
//! in a worker service.

pub mod audio;
pub mod captions;
pub mod config;
pub mod fit;
pub mod jobs;
pub mod logging;
pub mod media;
pub mod merge;
pub mod models;
pub mod orchestrator;
pub mod profiler;
pub mod services;
pub mod synthesis;
pub mod timeline;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
