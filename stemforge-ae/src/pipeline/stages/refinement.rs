//! Stem refinement stages
//!
//! Each refinement stage splits one foundational stem into finer
//! sub-stems and removes the source stem afterwards. A missing source
//! stem is skipped with a warning rather than failing the job, since
//! some separation models legitimately omit stems for sparse material.

use crate::engines::{Refiner, SplitKind, SubStemSpec};
use crate::pipeline::{Stage, StageContext, StageOutput};
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;

/// Vocal mid/side split: center-panned lead vs side-panned backing
const VOCAL_SPECS: &[SubStemSpec] = &[
    SubStemSpec {
        name: "vocals_lead",
        kind: SplitKind::MidSideLead,
    },
    SubStemSpec {
        name: "vocals_backing",
        kind: SplitKind::MidSideResidual,
    },
];

/// Drum band split: kick below 150 Hz, snare body 150-3000 Hz, hats above
const DRUM_SPECS: &[SubStemSpec] = &[
    SubStemSpec {
        name: "kick",
        kind: SplitKind::Band {
            low_hz: None,
            high_hz: Some(150.0),
        },
    },
    SubStemSpec {
        name: "snare",
        kind: SplitKind::Band {
            low_hz: Some(150.0),
            high_hz: Some(3000.0),
        },
    },
    SubStemSpec {
        name: "hats",
        kind: SplitKind::Band {
            low_hz: Some(3000.0),
            high_hz: None,
        },
    },
];

/// "Other" instrument band split: harmony pads, guitars, keys/synths
const INSTRUMENT_SPECS: &[SubStemSpec] = &[
    SubStemSpec {
        name: "harmony",
        kind: SplitKind::Band {
            low_hz: Some(100.0),
            high_hz: Some(500.0),
        },
    },
    SubStemSpec {
        name: "guitars",
        kind: SplitKind::Band {
            low_hz: Some(500.0),
            high_hz: Some(2500.0),
        },
    },
    SubStemSpec {
        name: "keys_synth",
        kind: SplitKind::Band {
            low_hz: Some(2500.0),
            high_hz: None,
        },
    },
];

/// Generic refinement: derive `outputs` from `source`, then remove it
pub struct RefinementStage {
    name: &'static str,
    source: &'static str,
    outputs: &'static [SubStemSpec],
    refiner: Arc<dyn Refiner>,
}

impl RefinementStage {
    /// vocals.wav -> vocals_lead.wav + vocals_backing.wav
    pub fn vocal(refiner: Arc<dyn Refiner>) -> Self {
        Self {
            name: "VocalRefinement",
            source: "vocals.wav",
            outputs: VOCAL_SPECS,
            refiner,
        }
    }

    /// drums.wav -> kick.wav + snare.wav + hats.wav
    pub fn drum(refiner: Arc<dyn Refiner>) -> Self {
        Self {
            name: "DrumRefinement",
            source: "drums.wav",
            outputs: DRUM_SPECS,
            refiner,
        }
    }

    /// other.wav -> harmony.wav + guitars.wav + keys_synth.wav
    pub fn instrument(refiner: Arc<dyn Refiner>) -> Self {
        Self {
            name: "InstrumentRefinement",
            source: "other.wav",
            outputs: INSTRUMENT_SPECS,
            refiner,
        }
    }
}

#[async_trait]
impl Stage for RefinementStage {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutput> {
        let source_path = ctx.stems_dir.join(self.source);
        if !source_path.is_file() {
            tracing::warn!(
                job_id = %ctx.job_id,
                source = self.source,
                "Source stem absent, skipping refinement"
            );
            return Ok(StageOutput::none());
        }

        let mut produced = Vec::with_capacity(self.outputs.len());
        for spec in self.outputs {
            let out_path = ctx.stems_dir.join(format!("{}.wav", spec.name));
            self.refiner
                .refine(&source_path, spec, &out_path)
                .await
                .with_context(|| format!("derive {} from {}", spec.name, self.source))?;
            produced.push(out_path);
        }

        // The coarse source stem is superseded by its sub-stems
        std::fs::remove_file(&source_path)
            .with_context(|| format!("remove refined source {}", self.source))?;

        Ok(StageOutput::of(produced))
    }
}
