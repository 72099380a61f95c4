//! Shared test fixtures: stub engines and a manager factory
//!
//! Stubs write tiny placeholder files so pipeline behavior can be
//! exercised without any ML tooling installed.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use stemforge_ae::engines::{
    EngineSet, NoteValidator, Refiner, RppExporter, Separator, SubStemSpec, Transcriber,
};
use stemforge_ae::manager::JobManager;
use stemforge_ae::models::JobRecord;
use stemforge_ae::pipeline::PipelineOrchestrator;
use stemforge_ae::storage::JobStorage;
use stemforge_common::NoteEvent;
use uuid::Uuid;

/// Foundational stems every stub separation produces
pub const FOUNDATIONAL_STEMS: &[&str] = &["vocals.wav", "drums.wav", "bass.wav", "other.wav"];

/// Writes four placeholder foundational stems, optionally sleeping
/// first to simulate a long inference call
pub struct StubSeparator {
    pub delay: Duration,
}

impl StubSeparator {
    pub fn instant() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Separator for StubSeparator {
    async fn separate(
        &self,
        _input: &Path,
        _model: &str,
        stems_dir: &Path,
    ) -> anyhow::Result<Vec<PathBuf>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut produced = Vec::new();
        for name in FOUNDATIONAL_STEMS {
            let path = stems_dir.join(name);
            std::fs::write(&path, b"stub-audio")?;
            produced.push(path);
        }
        Ok(produced)
    }
}

/// Copies the source stem bytes to each derived sub-stem
pub struct StubRefiner;

#[async_trait]
impl Refiner for StubRefiner {
    async fn refine(
        &self,
        source: &Path,
        _spec: &SubStemSpec,
        out_path: &Path,
    ) -> anyhow::Result<()> {
        std::fs::copy(source, out_path)?;
        Ok(())
    }
}

/// Returns canned note events chosen so the composite-synthesis merge
/// has one duplicate pair (pitch 60) and one unique event (pitch 64)
pub struct StubTranscriber;

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, stem: &Path) -> anyhow::Result<Vec<NoteEvent>> {
        let name = stem
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(match name.as_str() {
            "keys_synth" => vec![NoteEvent::new(60, 0.000, 0.50, 80)],
            "guitars" => vec![
                NoteEvent::new(60, 0.010, 0.80, 96),
                NoteEvent::new(64, 0.000, 0.50, 70),
            ],
            _ => vec![NoteEvent::new(40, 0.0, 0.25, 90)],
        })
    }
}

/// Always fails, for failure-injection tests
pub struct FailingTranscriber;

#[async_trait]
impl Transcriber for FailingTranscriber {
    async fn transcribe(&self, _stem: &Path) -> anyhow::Result<Vec<NoteEvent>> {
        anyhow::bail!("model exited with status 1")
    }
}

/// Returns a fixed review report
pub struct StubValidator;

#[async_trait]
impl NoteValidator for StubValidator {
    async fn review(&self, tracks: &[(String, Vec<NoteEvent>)]) -> anyhow::Result<String> {
        Ok(format!("{} tracks reviewed, all plausible", tracks.len()))
    }
}

/// Always fails; review faults must never fail the job
pub struct FailingValidator;

#[async_trait]
impl NoteValidator for FailingValidator {
    async fn review(&self, _tracks: &[(String, Vec<NoteEvent>)]) -> anyhow::Result<String> {
        anyhow::bail!("reviewer endpoint returned 503")
    }
}

/// Engine set with instant stubs everywhere and no validator
pub fn stub_engines() -> EngineSet {
    EngineSet {
        separator: Arc::new(StubSeparator::instant()),
        refiner: Arc::new(StubRefiner),
        transcriber: Arc::new(StubTranscriber),
        validator: None,
        exporter: Arc::new(RppExporter::new()),
    }
}

/// Manager over the given jobs root with `worker_slots` capacity
pub fn build_test_manager(
    jobs_root: &Path,
    worker_slots: usize,
    engines: EngineSet,
) -> (Arc<JobManager>, Arc<JobStorage>) {
    let storage = Arc::new(JobStorage::new(jobs_root));
    let orchestrator = Arc::new(PipelineOrchestrator::with_default_stages(
        storage.clone(),
        &engines,
    ));
    let manager = Arc::new(JobManager::new(
        storage.clone(),
        orchestrator,
        worker_slots,
        vec!["htdemucs".to_string(), "mdx_extra".to_string()],
        "htdemucs".to_string(),
    ));
    (manager, storage)
}

/// Poll a job until it reaches a terminal state
pub async fn wait_for_terminal(storage: &JobStorage, job_id: Uuid) -> JobRecord {
    for _ in 0..1500 {
        if let Ok(record) = storage.read_status(job_id) {
            if record.is_terminal() {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {} never reached a terminal state", job_id);
}
