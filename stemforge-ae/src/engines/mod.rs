//! External collaborator capabilities
//!
//! The pipeline core depends only on these narrow contracts, never on the
//! DSP or ML internals behind them. Production implementations shell out to
//! the same tools the service has always used (Demucs, ffmpeg, basic-pitch)
//! or call a configured HTTP reviewer; tests substitute stubs.

mod basic_pitch;
mod demucs;
mod ffmpeg;
mod reviewer;
mod rpp;

pub use basic_pitch::BasicPitchTranscriber;
pub use demucs::DemucsSeparator;
pub use ffmpeg::FfmpegRefiner;
pub use reviewer::LlmNoteValidator;
pub use rpp::RppExporter;

use crate::config::ServiceConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stemforge_common::NoteEvent;

/// How one sub-stem is derived from its parent stem
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitKind {
    /// Center-channel extraction: (L + R) / 2
    MidSideLead,
    /// Side-channel residual: (L - R) / 2
    MidSideResidual,
    /// Frequency band isolation; `None` bounds are open-ended
    Band {
        low_hz: Option<f32>,
        high_hz: Option<f32>,
    },
}

/// Recipe for one refined sub-stem
#[derive(Debug, Clone, Copy)]
pub struct SubStemSpec {
    /// Output stem name without extension (e.g. `kick`)
    pub name: &'static str,
    pub kind: SplitKind,
}

/// Separates a mixed track into foundational stems
#[async_trait]
pub trait Separator: Send + Sync {
    /// Separate `input` with the given model, writing stem `.wav` files
    /// into `stems_dir`. Returns the produced stem paths.
    async fn separate(
        &self,
        input: &Path,
        model: &str,
        stems_dir: &Path,
    ) -> anyhow::Result<Vec<PathBuf>>;
}

/// Splits an already-separated stem into one finer sub-component
#[async_trait]
pub trait Refiner: Send + Sync {
    async fn refine(
        &self,
        source: &Path,
        spec: &SubStemSpec,
        out_path: &Path,
    ) -> anyhow::Result<()>;
}

/// Converts a stem into discrete note events
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, stem: &Path) -> anyhow::Result<Vec<NoteEvent>>;
}

/// Reviews produced note data for musical correctness (always non-fatal)
#[async_trait]
pub trait NoteValidator: Send + Sync {
    /// Review the named note tracks and return a report text
    async fn review(&self, tracks: &[(String, Vec<NoteEvent>)]) -> anyhow::Result<String>;
}

/// Serializes the final stem/MIDI file lists into a project bundle
#[async_trait]
pub trait ProjectExporter: Send + Sync {
    async fn export(
        &self,
        stems: &[String],
        midi_files: &[String],
        out_path: &Path,
    ) -> anyhow::Result<()>;
}

/// The full set of collaborator capabilities wired into a pipeline
#[derive(Clone)]
pub struct EngineSet {
    pub separator: Arc<dyn Separator>,
    pub refiner: Arc<dyn Refiner>,
    pub transcriber: Arc<dyn Transcriber>,
    /// Optional: absence skips the validation stage entirely
    pub validator: Option<Arc<dyn NoteValidator>>,
    pub exporter: Arc<dyn ProjectExporter>,
}

impl EngineSet {
    /// Production engine set: Demucs separation, ffmpeg band/mid-side
    /// refinement, basic-pitch transcription, optional HTTP reviewer,
    /// REAPER project export.
    pub fn production(config: &ServiceConfig) -> Self {
        let validator: Option<Arc<dyn NoteValidator>> =
            match (&config.reviewer_endpoint, &config.reviewer_api_key) {
                (Some(endpoint), Some(key)) => Some(Arc::new(LlmNoteValidator::new(
                    endpoint.clone(),
                    key.clone(),
                ))),
                _ => {
                    tracing::info!("Reviewer not configured; validation stage will be skipped");
                    None
                }
            };

        Self {
            separator: Arc::new(DemucsSeparator::from_env()),
            refiner: Arc::new(FfmpegRefiner::from_env()),
            transcriber: Arc::new(BasicPitchTranscriber::from_env()),
            validator,
            exporter: Arc::new(RppExporter::new()),
        }
    }
}
