//! On-disk layout of a dub job.
//!
//! ```text
//! <data_root>/<job_id>/dubs/<lang>/
//!     status.json  audio.wav  video.mp4  captions.srt  log.txt  report.json
//! <work_root>/<job_id>-<lang>/
//!     clips/ ...   intermediate audio and video
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::PathSettings;

pub const AUDIO_FILE: &str = "audio.wav";
pub const VIDEO_FILE: &str = "video.mp4";
pub const CAPTIONS_FILE: &str = "captions.srt";
pub const LOG_FILE: &str = "log.txt";
pub const REPORT_FILE: &str = "report.json";
pub const STATUS_FILE: &str = "status.json";

/// Output files moved into the dub folder on success.
pub const PUBLISHED_FILES: [&str; 3] = [AUDIO_FILE, VIDEO_FILE, CAPTIONS_FILE];

#[derive(Debug, Clone)]
pub struct DubLayout {
    dub_dir: PathBuf,
    work_dir: PathBuf,
}

impl DubLayout {
    pub fn new(paths: &PathSettings, job_id: &str, lang: &str) -> Self {
        Self {
            dub_dir: Path::new(&paths.data_root)
                .join(job_id)
                .join("dubs")
                .join(lang),
            work_dir: Path::new(&paths.work_root).join(format!("{}-{}", job_id, lang)),
        }
    }

    pub fn dub_dir(&self) -> &Path {
        &self.dub_dir
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn status_path(&self) -> PathBuf {
        self.dub_dir.join(STATUS_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.dub_dir.join(LOG_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.dub_dir.join(REPORT_FILE)
    }

    pub fn audio_path(&self) -> PathBuf {
        self.dub_dir.join(AUDIO_FILE)
    }

    pub fn video_path(&self) -> PathBuf {
        self.dub_dir.join(VIDEO_FILE)
    }

    pub fn captions_path(&self) -> PathBuf {
        self.dub_dir.join(CAPTIONS_FILE)
    }

    /// Path of a work file that becomes a published output.
    pub fn work_output(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }

    /// Published outputs exist and are large enough to be real.
    pub fn has_valid_outputs(&self, min_audio_bytes: u64, min_video_bytes: u64) -> bool {
        let size = |p: PathBuf| fs::metadata(p).map(|m| m.len()).unwrap_or(0);
        size(self.audio_path()) > min_audio_bytes && size(self.video_path()) > min_video_bytes
    }

    /// Move finished work outputs into the dub folder.
    ///
    /// Files missing from the work folder are skipped.
    pub fn publish(&self) -> io::Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dub_dir)?;
        let mut published = Vec::new();
        for name in PUBLISHED_FILES {
            let from = self.work_output(name);
            if !from.exists() {
                continue;
            }
            let to = self.dub_dir.join(name);
            move_file(&from, &to)?;
            published.push(to);
        }
        Ok(published)
    }

    pub fn remove_work_dir(&self) -> io::Result<()> {
        if self.work_dir.exists() {
            fs::remove_dir_all(&self.work_dir)?;
        }
        Ok(())
    }
}

/// Rename, falling back to copy + remove across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn layout(root: &Path) -> DubLayout {
        let paths = PathSettings {
            data_root: root.join("data").display().to_string(),
            work_root: root.join("work").display().to_string(),
            ..PathSettings::default()
        };
        DubLayout::new(&paths, "job-7", "es")
    }

    #[test]
    fn paths_follow_job_and_language() {
        let dir = tempdir().unwrap();
        let layout = layout(dir.path());
        assert!(layout
            .status_path()
            .ends_with("data/job-7/dubs/es/status.json"));
        assert!(layout.work_dir().ends_with("work/job-7-es"));
    }

    #[test]
    fn publish_moves_present_outputs() {
        let dir = tempdir().unwrap();
        let layout = layout(dir.path());
        fs::create_dir_all(layout.work_dir()).unwrap();
        fs::write(layout.work_output(AUDIO_FILE), vec![1u8; 4096]).unwrap();
        fs::write(layout.work_output(VIDEO_FILE), vec![1u8; 20_000]).unwrap();

        let published = layout.publish().unwrap();
        assert_eq!(published.len(), 2);
        assert!(!layout.work_output(AUDIO_FILE).exists());
        assert!(layout.has_valid_outputs(2048, 10_000));
        assert!(!layout.captions_path().exists());

        layout.remove_work_dir().unwrap();
        assert!(!layout.work_dir().exists());
    }

    #[test]
    fn undersized_outputs_are_not_valid() {
        let dir = tempdir().unwrap();
        let layout = layout(dir.path());
        fs::create_dir_all(layout.dub_dir()).unwrap();
        fs::write(layout.audio_path(), vec![0u8; 100]).unwrap();
        fs::write(layout.video_path(), vec![0u8; 20_000]).unwrap();
        assert!(!layout.has_valid_outputs(2048, 10_000));
    }
}
