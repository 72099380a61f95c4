//! Demucs source separation via subprocess

use super::Separator;
use anyhow::{bail, Context};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Shells out to `python -m demucs` and flattens its nested output
/// layout (`<scratch>/<model>/<track>/<stem>.wav`) into the flat
/// stems directory the rest of the pipeline expects.
pub struct DemucsSeparator {
    python_bin: String,
    device: String,
}

impl DemucsSeparator {
    pub fn new(python_bin: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            python_bin: python_bin.into(),
            device: device.into(),
        }
    }

    /// Binary and device from `STEMFORGE_PYTHON` / `STEMFORGE_DEVICE`,
    /// defaulting to `python` on CPU.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("STEMFORGE_PYTHON").unwrap_or_else(|_| "python".to_string()),
            std::env::var("STEMFORGE_DEVICE").unwrap_or_else(|_| "cpu".to_string()),
        )
    }
}

#[async_trait]
impl Separator for DemucsSeparator {
    async fn separate(
        &self,
        input: &Path,
        model: &str,
        stems_dir: &Path,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let scratch = stems_dir.join(".separating");
        std::fs::create_dir_all(&scratch).context("create separation scratch dir")?;

        let output = Command::new(&self.python_bin)
            .arg("-m")
            .arg("demucs")
            .arg("--device")
            .arg(&self.device)
            .arg("-n")
            .arg(model)
            .arg("-o")
            .arg(&scratch)
            .arg(input)
            .output()
            .await
            .with_context(|| format!("spawn {} -m demucs", self.python_bin))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .lines()
                .rev()
                .take(5)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join(" | ");
            bail!("demucs exited with {}: {}", output.status, tail);
        }

        // Demucs writes <scratch>/<model>/<input-stem>/<name>.wav
        let track_name = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let nested = scratch.join(model).join(&track_name);
        if !nested.is_dir() {
            bail!("demucs produced no output at {}", nested.display());
        }

        let mut produced = Vec::new();
        for entry in std::fs::read_dir(&nested)? {
            let entry = entry?;
            let name = entry.file_name();
            if !name.to_string_lossy().ends_with(".wav") {
                continue;
            }
            let dest = stems_dir.join(&name);
            std::fs::rename(entry.path(), &dest)
                .with_context(|| format!("move stem into place: {}", dest.display()))?;
            produced.push(dest);
        }
        std::fs::remove_dir_all(&scratch).ok();

        if produced.is_empty() {
            bail!("demucs produced no stem files");
        }
        produced.sort();
        Ok(produced)
    }
}
