//! Staged processing pipeline
//!
//! A job is processed by a fixed, ordered sequence of stages. Each stage
//! reads and writes the job directory through a shared [`StageContext`]
//! and reports what it produced; the orchestrator owns all status-record
//! bookkeeping around the stage boundary.

mod orchestrator;
mod stages;

pub use orchestrator::PipelineOrchestrator;
pub use stages::{
    CompositeSynthesisStage, ExportStage, RefinementStage, SeparationStage, TranscriptionStage,
    ValidationStage, PROJECT_FILE,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use stemforge_common::NoteEvent;
use uuid::Uuid;

/// Per-job execution context shared by all stages in sequence.
///
/// Stages run strictly one at a time, but the note blackboard is behind a
/// mutex so the context can be shared by reference across await points.
pub struct StageContext {
    pub job_id: Uuid,
    pub job_dir: PathBuf,
    pub stems_dir: PathBuf,
    pub midi_dir: PathBuf,
    pub input_path: PathBuf,
    /// Separation model identifier chosen at submission
    pub model: String,
    /// Note events keyed by stem name (without extension), published by
    /// transcription and consumed by composite synthesis and validation
    transcriptions: Mutex<HashMap<String, Vec<NoteEvent>>>,
    validation_report: Mutex<Option<String>>,
}

impl StageContext {
    pub fn new(
        job_id: Uuid,
        job_dir: PathBuf,
        stems_dir: PathBuf,
        midi_dir: PathBuf,
        input_path: PathBuf,
        model: String,
    ) -> Self {
        Self {
            job_id,
            job_dir,
            stems_dir,
            midi_dir,
            input_path,
            model,
            transcriptions: Mutex::new(HashMap::new()),
            validation_report: Mutex::new(None),
        }
    }

    pub fn record_transcription(&self, stem_name: impl Into<String>, events: Vec<NoteEvent>) {
        self.transcriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(stem_name.into(), events);
    }

    pub fn transcription(&self, stem_name: &str) -> Option<Vec<NoteEvent>> {
        self.transcriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(stem_name)
            .cloned()
    }

    /// All transcribed tracks, sorted by stem name for stable output
    pub fn transcribed_tracks(&self) -> Vec<(String, Vec<NoteEvent>)> {
        let mut tracks: Vec<_> = self
            .transcriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, events)| (name.clone(), events.clone()))
            .collect();
        tracks.sort_by(|a, b| a.0.cmp(&b.0));
        tracks
    }

    pub fn set_validation_report(&self, report: String) {
        *self
            .validation_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(report);
    }

    pub fn take_validation_report(&self) -> Option<String> {
        self.validation_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Files a stage reports having produced.
///
/// Advisory only: artifact listings in the status record are always taken
/// from the job directory itself, never from stage self-reports.
#[derive(Debug, Default)]
pub struct StageOutput {
    pub produced: Vec<PathBuf>,
}

impl StageOutput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn of(produced: Vec<PathBuf>) -> Self {
        Self { produced }
    }
}

/// One step of the processing pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name as surfaced in the status record and error reports
    fn name(&self) -> &'static str;

    /// Whether a failure of this stage terminates the job.
    ///
    /// Advisory stages (validation) override this to `false`; their
    /// errors are logged and the pipeline continues.
    fn fatal(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutput>;
}
