//! Per-job pipeline execution
//!
//! The orchestrator is the sole writer of a job's directory while the
//! job runs. It translates stage outcomes into status-record updates and
//! never lets a stage fault escape: every path out of `execute` leaves
//! the record terminal or an `Err` that the scheduler turns into a
//! system-fault failure.

use crate::engines::EngineSet;
use crate::models::{ArtifactCategory, JobRecord};
use crate::pipeline::{Stage, StageContext};
use crate::storage::JobStorage;
use std::sync::Arc;
use stemforge_common::Result;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub struct PipelineOrchestrator {
    storage: Arc<JobStorage>,
    stages: Vec<Arc<dyn Stage>>,
}

impl PipelineOrchestrator {
    pub fn new(storage: Arc<JobStorage>, stages: Vec<Arc<dyn Stage>>) -> Self {
        Self { storage, stages }
    }

    /// The standard eight-stage sequence wired to a concrete engine set
    pub fn with_default_stages(storage: Arc<JobStorage>, engines: &EngineSet) -> Self {
        use crate::pipeline::stages::*;

        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(SeparationStage::new(engines.separator.clone())),
            Arc::new(RefinementStage::vocal(engines.refiner.clone())),
            Arc::new(RefinementStage::drum(engines.refiner.clone())),
            Arc::new(RefinementStage::instrument(engines.refiner.clone())),
            Arc::new(TranscriptionStage::new(engines.transcriber.clone())),
            Arc::new(CompositeSynthesisStage::new()),
            Arc::new(ValidationStage::new(engines.validator.clone())),
            Arc::new(ExportStage::new(engines.exporter.clone())),
        ];
        Self::new(storage, stages)
    }

    /// Run the full stage sequence for one job.
    ///
    /// Stage faults and cancellation are absorbed into the status record;
    /// an `Err` return means the record itself could not be maintained.
    pub async fn execute(
        &self,
        job_id: Uuid,
        model: String,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut record = self.storage.read_status(job_id)?;
        record.start()?;
        record.message = "Starting processing pipeline".to_string();
        self.storage.write_status(job_id, &record)?;
        tracing::info!(job_id = %job_id, model = %model, "Pipeline started");

        let ctx = StageContext::new(
            job_id,
            self.storage.job_dir(job_id),
            self.storage.stems_dir(job_id),
            self.storage.midi_dir(job_id),
            self.storage.input_path(job_id)?,
            model,
        );

        let total = self.stages.len();
        for (index, stage) in self.stages.iter().enumerate() {
            // Cooperative cancellation, checked only at stage boundaries:
            // inference calls are non-preemptible units
            if cancel.is_cancelled() {
                tracing::info!(job_id = %job_id, stage = stage.name(), "Job cancelled");
                record.fail(stage.name(), "cancelled")?;
                self.refresh_artifacts(job_id, &mut record)?;
                self.storage.write_status(job_id, &record)?;
                return Ok(());
            }

            record.stage = stage.name().to_string();
            record.message = format!("Running {}...", stage.name());
            self.storage.write_status(job_id, &record)?;

            match stage.run(&ctx).await {
                Ok(output) => {
                    let progress = (((index + 1) * 100) as f64 / total as f64).round() as u8;
                    record.set_progress(progress);
                    record.message = format!("{} complete", stage.name());
                    self.refresh_artifacts(job_id, &mut record)?;
                    self.storage.write_status(job_id, &record)?;
                    tracing::info!(
                        job_id = %job_id,
                        stage = stage.name(),
                        produced = output.produced.len(),
                        progress,
                        "Stage complete"
                    );
                }
                Err(e) if stage.fatal() => {
                    let cause = format!("{:#}", e);
                    tracing::error!(
                        job_id = %job_id,
                        stage = stage.name(),
                        error = %cause,
                        "Stage failed, terminating job"
                    );
                    record.fail(stage.name(), cause)?;
                    // Artifacts from completed stages stay on disk and listed
                    self.refresh_artifacts(job_id, &mut record)?;
                    self.storage.write_status(job_id, &record)?;
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        job_id = %job_id,
                        stage = stage.name(),
                        error = %format!("{:#}", e),
                        "Advisory stage failed, continuing"
                    );
                    let progress = (((index + 1) * 100) as f64 / total as f64).round() as u8;
                    record.set_progress(progress);
                    self.storage.write_status(job_id, &record)?;
                }
            }
        }

        record.validation_report = ctx.take_validation_report();
        record.succeed(
            "Processing complete. Stems, note data, and project bundle are ready.".to_string(),
        )?;
        self.refresh_artifacts(job_id, &mut record)?;
        self.storage.write_status(job_id, &record)?;
        tracing::info!(job_id = %job_id, "Pipeline finished");
        Ok(())
    }

    /// Re-list artifacts from the job directory; disk is the source of
    /// truth, never stage self-reports
    fn refresh_artifacts(&self, job_id: Uuid, record: &mut JobRecord) -> Result<()> {
        record.artifacts.stems = self.storage.list_artifacts(job_id, ArtifactCategory::Stems)?;
        record.artifacts.midi = self.storage.list_artifacts(job_id, ArtifactCategory::Midi)?;
        record.artifacts.project = self
            .storage
            .list_artifacts(job_id, ArtifactCategory::Project)?;
        Ok(())
    }
}
