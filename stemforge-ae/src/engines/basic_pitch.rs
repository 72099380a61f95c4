//! Note transcription via the basic-pitch CLI

use super::Transcriber;
use anyhow::{bail, Context};
use async_trait::async_trait;
use std::path::Path;
use stemforge_common::NoteEvent;
use tokio::process::Command;
use uuid::Uuid;

/// Onset probability threshold passed to basic-pitch
const ONSET_THRESHOLD: &str = "0.5";
/// Frame probability threshold passed to basic-pitch
const FRAME_THRESHOLD: &str = "0.3";
/// Minimum note length in milliseconds
const MIN_NOTE_LENGTH_MS: &str = "100";

/// Runs the basic-pitch CLI against one stem and parses its note-event
/// CSV output (`start_time_s,end_time_s,pitch_midi,amplitude`).
pub struct BasicPitchTranscriber {
    binary: String,
}

impl BasicPitchTranscriber {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Binary from `STEMFORGE_BASIC_PITCH`, defaulting to `basic-pitch`
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("STEMFORGE_BASIC_PITCH").unwrap_or_else(|_| "basic-pitch".to_string()),
        )
    }

    fn parse_note_csv(content: &str) -> anyhow::Result<Vec<NoteEvent>> {
        let mut events = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line_no == 0 || line.trim().is_empty() {
                continue; // header
            }
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() < 4 {
                bail!("malformed note row {}: {:?}", line_no + 1, line);
            }
            let start: f64 = fields[0]
                .trim()
                .parse()
                .with_context(|| format!("start time on row {}", line_no + 1))?;
            let end: f64 = fields[1]
                .trim()
                .parse()
                .with_context(|| format!("end time on row {}", line_no + 1))?;
            let pitch: u8 = fields[2]
                .trim()
                .parse()
                .with_context(|| format!("pitch on row {}", line_no + 1))?;
            let amplitude: f64 = fields[3]
                .trim()
                .parse()
                .with_context(|| format!("amplitude on row {}", line_no + 1))?;

            let velocity = ((amplitude * 127.0).round() as i64).clamp(1, 127) as u8;
            events.push(NoteEvent::new(pitch, start, (end - start).max(0.0), velocity));
        }
        events.sort_by(|a, b| {
            a.start
                .partial_cmp(&b.start)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.pitch.cmp(&b.pitch))
        });
        Ok(events)
    }
}

#[async_trait]
impl Transcriber for BasicPitchTranscriber {
    async fn transcribe(&self, stem: &Path) -> anyhow::Result<Vec<NoteEvent>> {
        let scratch = std::env::temp_dir().join(format!("stemforge-bp-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&scratch).context("create transcription scratch dir")?;

        let output = Command::new(&self.binary)
            .arg(&scratch)
            .arg(stem)
            .arg("--save-note-events")
            .arg("--onset-threshold")
            .arg(ONSET_THRESHOLD)
            .arg("--frame-threshold")
            .arg(FRAME_THRESHOLD)
            .arg("--minimum-note-length")
            .arg(MIN_NOTE_LENGTH_MS)
            .output()
            .await
            .with_context(|| format!("spawn {}", self.binary))?;

        if !output.status.success() {
            std::fs::remove_dir_all(&scratch).ok();
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = stderr.lines().last().unwrap_or("").to_string();
            bail!("basic-pitch exited with {}: {}", output.status, tail);
        }

        // Output is <stem-name>_basic_pitch.csv inside the scratch dir
        let mut csv_path = None;
        for entry in std::fs::read_dir(&scratch)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().ends_with(".csv") {
                csv_path = Some(entry.path());
                break;
            }
        }
        let result = match csv_path {
            Some(path) => {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("read note events: {}", path.display()))?;
                Self::parse_note_csv(&content)
            }
            None => bail!("basic-pitch wrote no note-event CSV for {}", stem.display()),
        };
        std::fs::remove_dir_all(&scratch).ok();
        result
    }
}
