//! Durable filesystem layout for jobs
//!
//! The filesystem is the only durable state. One directory per job:
//!
//! ```text
//! <jobs-root>/<job_id>/
//!   input.<ext>
//!   status.json
//!   stems/<name>.wav
//!   midi/<name>.mid
//!   <project-name>.rpp
//! ```
//!
//! `status.json` is only ever replaced through an atomic rename, so a
//! concurrent reader sees either the previous record or the new one,
//! never a torn write.

use crate::models::{ArtifactCategory, JobRecord};
use std::path::{Path, PathBuf};
use stemforge_common::{Error, Result};
use uuid::Uuid;

/// Stem output subdirectory name
pub const STEMS_DIR: &str = "stems";
/// Note-data output subdirectory name
pub const MIDI_DIR: &str = "midi";
/// Status record file name
pub const STATUS_FILE: &str = "status.json";
/// Exported project bundle extension
pub const PROJECT_EXT: &str = "rpp";

/// Filesystem-backed job storage rooted at a jobs directory
#[derive(Debug, Clone)]
pub struct JobStorage {
    jobs_root: PathBuf,
}

impl JobStorage {
    pub fn new(jobs_root: impl Into<PathBuf>) -> Self {
        Self {
            jobs_root: jobs_root.into(),
        }
    }

    /// Jobs root directory
    pub fn jobs_root(&self) -> &Path {
        &self.jobs_root
    }

    /// Directory for one job
    pub fn job_dir(&self, job_id: Uuid) -> PathBuf {
        self.jobs_root.join(job_id.to_string())
    }

    /// `stems/` subdirectory for one job
    pub fn stems_dir(&self, job_id: Uuid) -> PathBuf {
        self.job_dir(job_id).join(STEMS_DIR)
    }

    /// `midi/` subdirectory for one job
    pub fn midi_dir(&self, job_id: Uuid) -> PathBuf {
        self.job_dir(job_id).join(MIDI_DIR)
    }

    /// Allocate a job directory and store the input file as `input.<ext>`.
    ///
    /// Fails if the directory already exists; job ids are never reused.
    pub fn create(&self, job_id: Uuid, input_ext: &str, input_bytes: &[u8]) -> Result<PathBuf> {
        let job_dir = self.job_dir(job_id);
        std::fs::create_dir_all(&self.jobs_root)?;
        std::fs::create_dir(&job_dir).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                Error::Storage(format!("job directory already exists: {}", job_dir.display()))
            } else {
                Error::Io(e)
            }
        })?;
        std::fs::create_dir(job_dir.join(STEMS_DIR))?;
        std::fs::create_dir(job_dir.join(MIDI_DIR))?;

        let input_path = job_dir.join(format!("input.{}", input_ext));
        std::fs::write(&input_path, input_bytes)?;
        Ok(input_path)
    }

    /// Persist a record atomically: write to a temp file in the job
    /// directory, then rename over `status.json`.
    pub fn write_status(&self, job_id: Uuid, record: &JobRecord) -> Result<()> {
        let job_dir = self.job_dir(job_id);
        if !job_dir.is_dir() {
            return Err(Error::NotFound(format!("job not found: {}", job_id)));
        }

        let content = serde_json::to_vec_pretty(record)
            .map_err(|e| Error::Internal(format!("serialize status failed: {}", e)))?;
        let tmp_path = job_dir.join(format!("{}.tmp", STATUS_FILE));
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, job_dir.join(STATUS_FILE))?;
        Ok(())
    }

    /// Read the current record, or `NotFound` for unknown job ids
    pub fn read_status(&self, job_id: Uuid) -> Result<JobRecord> {
        let status_path = self.job_dir(job_id).join(STATUS_FILE);
        let content = std::fs::read_to_string(&status_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("job not found: {}", job_id))
            } else {
                Error::Io(e)
            }
        })?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Storage(format!("corrupt status record for {}: {}", job_id, e)))
    }

    /// List files currently present for a category, sorted by name.
    ///
    /// Stages never self-report exhaustively; the listing is always taken
    /// from what physically exists on disk.
    pub fn list_artifacts(&self, job_id: Uuid, category: ArtifactCategory) -> Result<Vec<String>> {
        let (dir, ext_filter) = match category {
            ArtifactCategory::Stems => (self.stems_dir(job_id), None),
            ArtifactCategory::Midi => (self.midi_dir(job_id), None),
            ArtifactCategory::Project => (self.job_dir(job_id), Some(PROJECT_EXT)),
        };

        let mut names = Vec::new();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(Error::Io(e)),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            match ext_filter {
                Some(ext) if !name.ends_with(&format!(".{}", ext)) => continue,
                _ => names.push(name),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Locate the stored input file for a job (`input.<ext>`)
    pub fn input_path(&self, job_id: Uuid) -> Result<PathBuf> {
        let job_dir = self.job_dir(job_id);
        for entry in std::fs::read_dir(&job_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with("input.") {
                return Ok(entry.path());
            }
        }
        Err(Error::Storage(format!("input file missing for job {}", job_id)))
    }

    /// Enumerate all job ids present under the jobs root.
    ///
    /// Used by startup recovery; entries that are not UUID-named
    /// directories are skipped.
    pub fn scan_job_ids(&self) -> Result<Vec<Uuid>> {
        let mut ids = Vec::new();
        let entries = match std::fs::read_dir(&self.jobs_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(Error::Io(e)),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Ok(id) = Uuid::parse_str(&entry.file_name().to_string_lossy()) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}
