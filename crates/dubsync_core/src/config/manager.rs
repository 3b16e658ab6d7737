//! Config manager for loading, saving, and atomic updates.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Section-level updates (only modified section is changed)
//! - Validation on load (unknown sections trigger a rewrite)
//! - Preserves comments and formatting with toml_edit

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages dubsync configuration.
///
/// Handles loading, saving, and atomic section-level updates.
pub struct ConfigManager {
    /// Path to the TOML file.
    config_path: PathBuf,
    /// Settings as last loaded or edited in memory.
    settings: Settings,
}

impl ConfigManager {
    /// Create a new config manager with the given config file path.
    ///
    /// Does not load the config - call `load()` or `load_or_create()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    /// Path of the managed config file.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Current settings (read-only).
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Changes are only in memory until `save()` or `update_section()` is called.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file. Returns error if the file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        let settings: Settings = toml::from_str(&content)?;
        validate(&settings)?;
        self.settings = settings;
        Ok(())
    }

    /// Load config from file, creating with defaults if it doesn't exist.
    ///
    /// Also validates and cleans up the config, saving if changes were made.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let (settings, was_modified) = self.parse_validate_and_clean(&content)?;
            self.settings = settings;

            if was_modified {
                tracing::debug!("Rewriting config {}", self.config_path.display());
                self.save()?;
            }
        } else {
            if let Some(parent) = self.config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            self.settings = Settings::default();
            self.save()?;
        }
        Ok(())
    }

    /// Ensure data, work and log directories exist.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let dirs = [
            &self.settings.paths.data_root,
            &self.settings.paths.work_root,
            &self.settings.paths.logs_folder,
        ];

        for dir in dirs {
            fs::create_dir_all(dir)?;
        }

        Ok(())
    }

    /// Folder for the application log files.
    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Parse, validate, and report whether the file needs rewriting.
    fn parse_validate_and_clean(&self, content: &str) -> ConfigResult<(Settings, bool)> {
        let doc: DocumentMut = content.parse()?;
        let settings: Settings = toml::from_str(content)?;
        validate(&settings)?;

        let valid_sections: Vec<&str> = ConfigSection::all()
            .iter()
            .map(|s| s.table_name())
            .collect();
        let has_unknown = doc.iter().any(|(key, _)| !valid_sections.contains(&key));
        let missing_section = valid_sections.iter().any(|name| !doc.contains_key(name));

        Ok((settings, has_unknown || missing_section))
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Update a specific section atomically.
    ///
    /// Re-reads the file from disk, replaces only the given table and
    /// writes back, so comments in other sections survive.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current_content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current_content.is_empty() {
            DocumentMut::new()
        } else {
            current_content.parse()?
        };

        let section_toml = self.section_toml(section)?;
        let section_doc: DocumentMut = section_toml.parse()?;
        doc[section.table_name()] = Item::Table(section_doc.as_table().clone());

        self.atomic_write(&doc.to_string())?;
        Ok(())
    }

    fn section_toml(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        let out = match section {
            ConfigSection::Paths => toml::to_string_pretty(&s.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
            ConfigSection::Merge => toml::to_string_pretty(&s.merge)?,
            ConfigSection::Profiler => toml::to_string_pretty(&s.profiler)?,
            ConfigSection::Translation => toml::to_string_pretty(&s.translation)?,
            ConfigSection::Synthesis => toml::to_string_pretty(&s.synthesis)?,
            ConfigSection::Fit => toml::to_string_pretty(&s.fit)?,
            ConfigSection::Timeline => toml::to_string_pretty(&s.timeline)?,
            ConfigSection::Loudness => toml::to_string_pretty(&s.loudness)?,
            ConfigSection::Captions => toml::to_string_pretty(&s.captions)?,
            ConfigSection::Mux => toml::to_string_pretty(&s.mux)?,
            ConfigSection::Jobs => toml::to_string_pretty(&s.jobs)?,
        };
        Ok(out)
    }

    /// Generate config content with a comment above each section.
    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut output = String::new();
        output.push_str("# dubsync configuration\n");
        output.push_str(
            "# This file is auto-generated. Comments may be preserved on section updates.\n\n",
        );

        for section in ConfigSection::all() {
            let body = self.section_toml(*section)?;
            let mut doc: DocumentMut = body.parse()?;
            doc.as_table_mut().set_implicit(false);

            let mut wrapped = DocumentMut::new();
            wrapped[section.table_name()] = Item::Table(doc.as_table().clone());

            output.push_str(&format!("# {}\n", section.description()));
            output.push_str(&wrapped.to_string());
            output.push('\n');
        }

        Ok(output)
    }

    /// Write content to the config file via temp file + rename.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;
        Ok(())
    }
}

/// Reject values that would break the timing invariants.
fn validate(settings: &Settings) -> ConfigResult<()> {
    let fit = &settings.fit;
    if !(fit.min_tempo > 0.0 && fit.min_tempo < 1.0 && fit.max_tempo > 1.0) {
        return Err(ConfigError::Invalid(format!(
            "fit tempo range must satisfy 0 < min < 1 < max (got {}..{})",
            fit.min_tempo, fit.max_tempo
        )));
    }
    if fit.sample_rate == 0 || settings.profiler.sample_rate == 0 {
        return Err(ConfigError::Invalid("sample rates must be non-zero".into()));
    }
    if settings.synthesis.rate_ladder.is_empty() {
        return Err(ConfigError::Invalid(
            "synthesis.rate_ladder must have at least one rate".into(),
        ));
    }
    let prof = &settings.profiler;
    if prof.min_hz <= 0.0 || prof.max_hz <= prof.min_hz {
        return Err(ConfigError::Invalid(format!(
            "profiler pitch range {}..{} Hz is empty",
            prof.min_hz, prof.max_hz
        )));
    }
    if settings.captions.min_scale > settings.captions.max_scale {
        return Err(ConfigError::Invalid(
            "captions.min_scale exceeds captions.max_scale".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_or_create_creates_default() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(".config").join("dubsync.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[fit]"));
        assert!(content.contains("# Clip duration fitting"));
    }

    #[test]
    fn generated_file_parses_back() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("dubsync.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let mut reloaded = ConfigManager::new(&config_path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().merge.min_chars, 10);
        assert_eq!(reloaded.settings().captions.reference_height, 1080);
    }

    #[test]
    fn load_or_create_preserves_existing() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("dubsync.toml");

        fs::write(&config_path, "[paths]\ndata_root = \"/srv/dubs\"\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().paths.data_root, "/srv/dubs");
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[synthesis]"));
    }

    #[test]
    fn update_section_only_changes_target() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("dubsync.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        manager.settings_mut().logging.compact = false;
        manager.update_section(ConfigSection::Logging).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("compact = false"));
        assert!(content.contains("[paths]"));
        assert!(content.contains("# Data, work and log directories"));
    }

    #[test]
    fn rejects_inverted_tempo_range() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("dubsync.toml");
        fs::write(&config_path, "[fit]\nmin_tempo = 2.0\nmax_tempo = 0.5\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        assert!(matches!(manager.load(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn atomic_write_creates_no_temp_on_success() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("dubsync.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let temp_path = config_path.with_extension("toml.tmp");
        assert!(!temp_path.exists());
    }
}
