//! Foundational stem separation

use crate::engines::Separator;
use crate::pipeline::{Stage, StageContext, StageOutput};
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;

/// Runs the separation model over the job input, producing the
/// foundational stems (vocals, drums, bass, other) under `stems/`.
pub struct SeparationStage {
    separator: Arc<dyn Separator>,
}

impl SeparationStage {
    pub fn new(separator: Arc<dyn Separator>) -> Self {
        Self { separator }
    }
}

#[async_trait]
impl Stage for SeparationStage {
    fn name(&self) -> &'static str {
        "Separation"
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutput> {
        let produced = self
            .separator
            .separate(&ctx.input_path, &ctx.model, &ctx.stems_dir)
            .await
            .context("stem separation")?;
        tracing::debug!(
            job_id = %ctx.job_id,
            stems = produced.len(),
            "Separation produced foundational stems"
        );
        Ok(StageOutput::of(produced))
    }
}
