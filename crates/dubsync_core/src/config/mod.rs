//! Configuration management for dubsync.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use dubsync_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new("dubsync.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Merge gap: {}", config.settings().merge.max_gap_secs);
//!
//! config.settings_mut().captions.burn = false;
//! config.update_section(ConfigSection::Captions).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    CaptionSettings, ConfigSection, FitSettings, JobSettings, LoggingSettings, LoudnessSettings,
    MergeSettings, MuxSettings, PathSettings, ProfilerSettings, Settings, SynthesisSettings,
    TimelineSettings, TranslationSettings, VoiceSet,
};
