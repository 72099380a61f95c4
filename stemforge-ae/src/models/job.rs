//! Job lifecycle state machine
//!
//! A job progresses through exactly one of two state sequences:
//! `queued → running → success` or `queued → running → failed`.
//! Terminal records are never mutated again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stemforge_common::{Error, Result};
use uuid::Uuid;

/// Job lifecycle state (closed set; unknown states rejected at parse time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Submitted, waiting for a worker slot
    Queued,
    /// Worker slot granted, pipeline active
    Running,
    /// All stages completed
    Success,
    /// A stage aborted or a system-level fault occurred
    Failed,
}

impl JobState {
    /// Whether this state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Failed)
    }
}

/// Categorized artifact listing, populated from the job directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    /// Stem audio files under `stems/`
    pub stems: Vec<String>,
    /// Note-data files under `midi/`
    pub midi: Vec<String>,
    /// Exported project bundle(s) at the job root
    pub project: Vec<String>,
}

/// Artifact category names used in the job directory layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactCategory {
    Stems,
    Midi,
    Project,
}

/// Failing stage name and cause, set only on `failed` records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub stage: String,
    pub cause: String,
}

/// Durable record of one job, serialized to `status.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job identifier, assigned at submission
    pub job_id: Uuid,

    /// Current lifecycle state
    pub state: JobState,

    /// Name of the stage currently executing; empty when queued or terminal
    #[serde(default)]
    pub stage: String,

    /// Completion percentage 0-100, non-decreasing while running
    pub progress: u8,

    /// Human-readable current-status text
    pub message: String,

    /// Files produced so far, by category
    pub artifacts: Artifacts,

    /// Reviewer output, attached when the validation collaborator ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_report: Option<String>,

    /// Failing stage and cause; present only when `state == failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,

    /// Submission timestamp, immutable
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a freshly submitted record in `queued` state
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            state: JobState::Queued,
            stage: String::new(),
            progress: 0,
            message: "Queued, waiting for a worker slot".to_string(),
            artifacts: Artifacts::default(),
            validation_report: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Grant a worker slot: `queued → running`
    pub fn start(&mut self) -> Result<()> {
        if self.state != JobState::Queued {
            return Err(Error::Internal(format!(
                "job {} cannot start from state {:?}",
                self.job_id, self.state
            )));
        }
        self.state = JobState::Running;
        Ok(())
    }

    /// Terminal success: `running → success`
    ///
    /// Clears the stage field and pins progress at 100.
    pub fn succeed(&mut self, message: String) -> Result<()> {
        if self.state != JobState::Running {
            return Err(Error::Internal(format!(
                "job {} cannot succeed from state {:?}",
                self.job_id, self.state
            )));
        }
        self.state = JobState::Success;
        self.stage.clear();
        self.progress = 100;
        self.message = message;
        Ok(())
    }

    /// Terminal failure from any non-terminal state
    ///
    /// `queued → failed` is reachable only through startup recovery of
    /// orphaned jobs; the normal path is `running → failed`.
    pub fn fail(&mut self, stage: impl Into<String>, cause: impl Into<String>) -> Result<()> {
        if self.state.is_terminal() {
            return Err(Error::Internal(format!(
                "job {} already terminal ({:?})",
                self.job_id, self.state
            )));
        }
        let error = JobError {
            stage: stage.into(),
            cause: cause.into(),
        };
        self.state = JobState::Failed;
        self.stage.clear();
        self.message = format!("An error occurred during processing: {}", error.cause);
        self.error = Some(error);
        Ok(())
    }

    /// Update progress, clamped to 0-100 and never decreasing
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
    }

    /// Whether the record is terminal (read-only from here on)
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
