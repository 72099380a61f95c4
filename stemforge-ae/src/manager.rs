//! Job scheduling authority
//!
//! The manager validates submissions at the boundary, persists the
//! initial record, and enqueues each job for execution. A dispatcher
//! task drains the queue in submission order and acquires a worker slot
//! from a counting semaphore before launching each job's orchestrator,
//! so admission into `running` is strictly first-submitted-first-run.
//! That admission order is the only fairness guarantee offered.

use crate::models::JobRecord;
use crate::pipeline::PipelineOrchestrator;
use crate::storage::JobStorage;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use stemforge_common::{Error, Result};
use tokio::sync::{mpsc, RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Audio containers accepted at submission
pub const ACCEPTED_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg", "m4a"];

/// One accepted submission waiting for a worker slot
struct QueuedJob {
    job_id: Uuid,
    model: String,
    cancel: CancellationToken,
}

pub struct JobManager {
    storage: Arc<JobStorage>,
    /// Submission-ordered hand-off to the dispatcher task
    queue_tx: mpsc::UnboundedSender<QueuedJob>,
    cancel_tokens: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
    accepted_models: Vec<String>,
    default_model: String,
}

impl JobManager {
    /// Must be called from within a tokio runtime; spawns the dispatcher.
    pub fn new(
        storage: Arc<JobStorage>,
        orchestrator: Arc<PipelineOrchestrator>,
        worker_slots: usize,
        accepted_models: Vec<String>,
        default_model: String,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let cancel_tokens = Arc::new(RwLock::new(HashMap::new()));
        let slots = Arc::new(Semaphore::new(worker_slots.max(1)));
        tokio::spawn(Self::dispatch(
            queue_rx,
            slots,
            storage.clone(),
            orchestrator,
            cancel_tokens.clone(),
        ));
        Self {
            storage,
            queue_tx,
            cancel_tokens,
            accepted_models,
            default_model,
        }
    }

    /// Drain the queue in submission order, blocking on a worker slot
    /// before each launch. Because the slot is acquired here, not inside
    /// the per-job task, no later submission can overtake an earlier one.
    async fn dispatch(
        mut queue_rx: mpsc::UnboundedReceiver<QueuedJob>,
        slots: Arc<Semaphore>,
        storage: Arc<JobStorage>,
        orchestrator: Arc<PipelineOrchestrator>,
        tokens: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
    ) {
        while let Some(job) = queue_rx.recv().await {
            let permit = match slots.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return, // pool closed, shutting down
            };
            tracing::debug!(job_id = %job.job_id, "Worker slot acquired");

            let storage = storage.clone();
            let orchestrator = orchestrator.clone();
            let tokens = tokens.clone();
            tokio::spawn(async move {
                if let Err(e) = orchestrator
                    .execute(job.job_id, job.model, job.cancel)
                    .await
                {
                    tracing::error!(job_id = %job.job_id, error = %e, "Orchestration fault");
                    // Surface bookkeeping faults as a terminal system failure
                    if let Ok(mut record) = storage.read_status(job.job_id) {
                        if !record.is_terminal()
                            && record
                                .fail("system", format!("system fault: {}", e))
                                .is_ok()
                        {
                            let _ = storage.write_status(job.job_id, &record);
                        }
                    }
                }

                tokens.write().await.remove(&job.job_id);
                // Slot released on every exit path
                drop(permit);
            });
        }
    }

    /// Validate and enqueue a submission; returns immediately with the
    /// new job id while processing continues in the background.
    pub async fn submit(
        &self,
        file_name: &str,
        bytes: &[u8],
        model: Option<&str>,
    ) -> Result<Uuid> {
        if bytes.is_empty() {
            return Err(Error::InvalidInput("submitted file is empty".to_string()));
        }
        let ext = Path::new(file_name)
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_lowercase)
            .ok_or_else(|| {
                Error::InvalidInput(format!("file name has no extension: {}", file_name))
            })?;
        if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(Error::InvalidInput(format!(
                "unsupported audio container: .{}",
                ext
            )));
        }
        let model = model.unwrap_or(&self.default_model);
        if !self.accepted_models.iter().any(|m| m == model) {
            return Err(Error::InvalidInput(format!(
                "unknown separation model: {}",
                model
            )));
        }

        let job_id = Uuid::new_v4();
        self.storage.create(job_id, &ext, bytes)?;
        self.storage.write_status(job_id, &JobRecord::new(job_id))?;
        tracing::info!(
            job_id = %job_id,
            model = %model,
            bytes = bytes.len(),
            "Job submitted"
        );

        let cancel = CancellationToken::new();
        self.cancel_tokens
            .write()
            .await
            .insert(job_id, cancel.clone());

        self.queue_tx
            .send(QueuedJob {
                job_id,
                model: model.to_string(),
                cancel,
            })
            .map_err(|_| Error::Internal("job queue closed".to_string()))?;

        Ok(job_id)
    }

    /// Current record snapshot for a job
    pub fn get(&self, job_id: Uuid) -> Result<JobRecord> {
        self.storage.read_status(job_id)
    }

    /// Request cooperative cancellation of a non-terminal job.
    ///
    /// The job transitions to `failed` with cause `cancelled` at the next
    /// stage boundary; a stage already in flight runs to completion.
    pub async fn cancel(&self, job_id: Uuid) -> Result<()> {
        let record = self.storage.read_status(job_id)?;
        if record.is_terminal() {
            return Err(Error::InvalidInput(format!(
                "job {} is already terminal",
                job_id
            )));
        }
        match self.cancel_tokens.read().await.get(&job_id) {
            Some(token) => {
                token.cancel();
                tracing::info!(job_id = %job_id, "Cancellation requested");
                Ok(())
            }
            None => Err(Error::NotFound(format!(
                "no running task for job {}",
                job_id
            ))),
        }
    }

    /// Fail every non-terminal job found on disk at startup.
    ///
    /// Jobs orphaned by a process restart are never resumed; inference
    /// steps are not known to be idempotent, so re-running them against
    /// a half-populated job directory is unsafe.
    pub fn recover_orphans(&self) -> Result<usize> {
        let mut recovered = 0;
        for job_id in self.storage.scan_job_ids()? {
            let mut record = match self.storage.read_status(job_id) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(job_id = %job_id, error = %e, "Skipping unreadable job record");
                    continue;
                }
            };
            if record.is_terminal() {
                continue;
            }
            let stage = if record.stage.is_empty() {
                "system".to_string()
            } else {
                record.stage.clone()
            };
            record.fail(stage, "orchestrator restarted before completion")?;
            self.storage.write_status(job_id, &record)?;
            tracing::warn!(job_id = %job_id, "Failed orphaned job during startup recovery");
            recovered += 1;
        }
        Ok(recovered)
    }
}
