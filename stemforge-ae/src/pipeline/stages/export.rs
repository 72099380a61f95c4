//! Project bundle export

use crate::engines::ProjectExporter;
use crate::pipeline::{Stage, StageContext, StageOutput};
use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Exported project file name at the job root
pub const PROJECT_FILE: &str = "project.rpp";

/// Serializes the final stem and MIDI listings into one project bundle
/// at the job root.
pub struct ExportStage {
    exporter: Arc<dyn ProjectExporter>,
}

impl ExportStage {
    pub fn new(exporter: Arc<dyn ProjectExporter>) -> Self {
        Self { exporter }
    }

    fn sorted_file_names(dir: &Path, ext: &str) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in
            std::fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_file() && name.ends_with(ext) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl Stage for ExportStage {
    fn name(&self) -> &'static str {
        "Export"
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutput> {
        let stems = Self::sorted_file_names(&ctx.stems_dir, ".wav")?;
        let midi_files = Self::sorted_file_names(&ctx.midi_dir, ".mid")?;

        let out_path = ctx.job_dir.join(PROJECT_FILE);
        self.exporter
            .export(&stems, &midi_files, &out_path)
            .await
            .context("export project bundle")?;

        tracing::debug!(
            job_id = %ctx.job_id,
            stems = stems.len(),
            midi = midi_files.len(),
            "Exported project bundle"
        );
        Ok(StageOutput::of(vec![out_path]))
    }
}
