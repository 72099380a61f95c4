//! Advisory note-data review

use crate::engines::NoteValidator;
use crate::pipeline::{Stage, StageContext, StageOutput};
use async_trait::async_trait;
use std::sync::Arc;

/// Hands the transcribed note tracks to the configured reviewer and
/// attaches its report to the context.
///
/// Always non-fatal: a reviewer fault or absence only means the final
/// record carries no `validation_report`.
pub struct ValidationStage {
    validator: Option<Arc<dyn NoteValidator>>,
}

impl ValidationStage {
    pub fn new(validator: Option<Arc<dyn NoteValidator>>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Stage for ValidationStage {
    fn name(&self) -> &'static str {
        "Validation"
    }

    fn fatal(&self) -> bool {
        false
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutput> {
        let Some(validator) = &self.validator else {
            tracing::debug!(job_id = %ctx.job_id, "No reviewer configured, skipping validation");
            return Ok(StageOutput::none());
        };

        let tracks = ctx.transcribed_tracks();
        if tracks.is_empty() {
            tracing::debug!(job_id = %ctx.job_id, "No note tracks to review");
            return Ok(StageOutput::none());
        }

        match validator.review(&tracks).await {
            Ok(report) => {
                tracing::info!(
                    job_id = %ctx.job_id,
                    tracks = tracks.len(),
                    "Reviewer accepted note data"
                );
                ctx.set_validation_report(report);
            }
            Err(e) => {
                // Advisory only; the record simply carries no report
                tracing::warn!(job_id = %ctx.job_id, error = %format!("{:#}", e), "Reviewer unavailable");
            }
        }
        Ok(StageOutput::none())
    }
}
