//! REAPER project (.rpp) export

use super::ProjectExporter;
use anyhow::Context;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::Path;

/// Writes a minimal REAPER project referencing every produced stem and
/// MIDI file as its own track, all items placed at position zero.
///
/// The header pins the same project version and timestamp the export
/// has always emitted so downstream templates keep matching.
pub struct RppExporter;

impl RppExporter {
    pub fn new() -> Self {
        Self
    }

    fn track_name(file_name: &str) -> String {
        file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(file_name)
            .to_uppercase()
    }

    fn render(stems: &[String], midi_files: &[String]) -> String {
        let mut out = String::new();
        out.push_str("<REAPER_PROJECT 0.1 \"6.75/win64\" 1680192000\n");
        out.push_str("  RIPPLE 0\n");
        out.push_str("  GROUPOVERRIDE 0 0 0\n");
        out.push_str("  AUTO_CROSSFADE 1 0.010000 0.010000\n");

        for (subdir, files) in [("stems", stems), ("midi", midi_files)] {
            for file in files {
                let _ = write!(
                    out,
                    "  <TRACK\n    NAME {name}\n    <ITEM\n      POSITION 0\n      SNAPOFFS 0\n      FILE \"{subdir}/{file}\"\n    >\n  >\n",
                    name = Self::track_name(file),
                    subdir = subdir,
                    file = file,
                );
            }
        }
        out.push('>');
        out
    }
}

impl Default for RppExporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProjectExporter for RppExporter {
    async fn export(
        &self,
        stems: &[String],
        midi_files: &[String],
        out_path: &Path,
    ) -> anyhow::Result<()> {
        let content = Self::render(stems, midi_files);
        std::fs::write(out_path, content)
            .with_context(|| format!("write project bundle: {}", out_path.display()))?;
        Ok(())
    }
}
