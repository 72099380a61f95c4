//! Composite note-track synthesis

use crate::midi;
use crate::pipeline::{Stage, StageContext, StageOutput};
use anyhow::Context;
use async_trait::async_trait;
use stemforge_common::merge_note_events;

const LEFT_SOURCE: &str = "keys_synth";
const RIGHT_SOURCE: &str = "guitars";
const COMPOSITE_OUTPUT: &str = "harmony_composite.mid";

/// Merges the sustained (keys/synth) and plucked (guitar) transcriptions
/// into one deliverable harmony track, collapsing duplicate attacks that
/// both models heard while keeping genuine polyphony.
///
/// Skipped when either source transcription is absent.
pub struct CompositeSynthesisStage;

impl CompositeSynthesisStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CompositeSynthesisStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for CompositeSynthesisStage {
    fn name(&self) -> &'static str {
        "CompositeSynthesis"
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutput> {
        let (left, right) = match (ctx.transcription(LEFT_SOURCE), ctx.transcription(RIGHT_SOURCE))
        {
            (Some(left), Some(right)) => (left, right),
            _ => {
                tracing::debug!(
                    job_id = %ctx.job_id,
                    "Source transcriptions incomplete, skipping composite synthesis"
                );
                return Ok(StageOutput::none());
            }
        };

        let merged = merge_note_events(&left, &right);
        let out_path = ctx.midi_dir.join(COMPOSITE_OUTPUT);
        midi::write_midi_file(&out_path, &merged, midi::DEFAULT_BPM)
            .with_context(|| format!("write {}", COMPOSITE_OUTPUT))?;

        tracing::debug!(
            job_id = %ctx.job_id,
            left = left.len(),
            right = right.len(),
            merged = merged.len(),
            "Synthesized composite harmony track"
        );
        Ok(StageOutput::of(vec![out_path]))
    }
}
