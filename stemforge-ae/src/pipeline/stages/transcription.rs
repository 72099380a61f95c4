//! Stem-to-MIDI transcription

use crate::engines::Transcriber;
use crate::midi;
use crate::pipeline::{Stage, StageContext, StageOutput};
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;

/// One stem-to-MIDI mapping entry.
///
/// `required` gates the entry on other stems being present: drum note
/// extraction only makes sense when the full kit split succeeded, so the
/// drum entry requires all three drum sub-stems even though only the
/// snare (the most pitched-transcription-friendly component) is fed to
/// the model.
struct MidiMapping {
    source: &'static str,
    required: &'static [&'static str],
    output: &'static str,
}

const MIDI_MAP: &[MidiMapping] = &[
    MidiMapping {
        source: "vocals_lead.wav",
        required: &["vocals_lead.wav"],
        output: "melody_lead.mid",
    },
    MidiMapping {
        source: "bass.wav",
        required: &["bass.wav"],
        output: "bass.mid",
    },
    MidiMapping {
        source: "guitars.wav",
        required: &["guitars.wav"],
        output: "guitars.mid",
    },
    MidiMapping {
        source: "keys_synth.wav",
        required: &["keys_synth.wav"],
        output: "keys_synth.mid",
    },
    MidiMapping {
        source: "harmony.wav",
        required: &["harmony.wav"],
        output: "harmony.mid",
    },
    MidiMapping {
        source: "snare.wav",
        required: &["kick.wav", "snare.wav", "hats.wav"],
        output: "drums.mid",
    },
];

/// Transcribes each mapped stem into a `.mid` file under `midi/` and
/// publishes the note events for later stages.
///
/// A transcription fault on any present stem fails the stage; silently
/// shipping a partial MIDI set would defeat the success invariants
/// callers rely on.
pub struct TranscriptionStage {
    transcriber: Arc<dyn Transcriber>,
}

impl TranscriptionStage {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self { transcriber }
    }
}

#[async_trait]
impl Stage for TranscriptionStage {
    fn name(&self) -> &'static str {
        "Transcription"
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutput> {
        let mut produced = Vec::new();

        for mapping in MIDI_MAP {
            let all_present = mapping
                .required
                .iter()
                .all(|stem| ctx.stems_dir.join(stem).is_file());
            if !all_present {
                tracing::debug!(
                    job_id = %ctx.job_id,
                    output = mapping.output,
                    "Prerequisite stems absent, skipping MIDI extraction"
                );
                continue;
            }

            let stem_path = ctx.stems_dir.join(mapping.source);
            let events = self
                .transcriber
                .transcribe(&stem_path)
                .await
                .with_context(|| format!("transcribe {}", mapping.source))?;

            let midi_path = ctx.midi_dir.join(mapping.output);
            midi::write_midi_file(&midi_path, &events, midi::DEFAULT_BPM)
                .with_context(|| format!("write {}", mapping.output))?;

            tracing::debug!(
                job_id = %ctx.job_id,
                stem = mapping.source,
                output = mapping.output,
                notes = events.len(),
                "Extracted MIDI track"
            );

            let stem_key = mapping.source.trim_end_matches(".wav");
            ctx.record_transcription(stem_key, events);
            produced.push(midi_path);
        }

        Ok(StageOutput::of(produced))
    }
}
