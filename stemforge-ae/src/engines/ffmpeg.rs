//! Sub-stem refinement via ffmpeg audio filters

use super::{Refiner, SplitKind, SubStemSpec};
use anyhow::{bail, Context};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Derives sub-stems with ffmpeg `-af` chains: pan matrices for
/// mid/side extraction, highpass/lowpass pairs for band isolation.
pub struct FfmpegRefiner {
    ffmpeg_bin: String,
}

impl FfmpegRefiner {
    pub fn new(ffmpeg_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
        }
    }

    /// Binary from `STEMFORGE_FFMPEG`, defaulting to `ffmpeg` on PATH
    pub fn from_env() -> Self {
        Self::new(std::env::var("STEMFORGE_FFMPEG").unwrap_or_else(|_| "ffmpeg".to_string()))
    }

    fn filter_for(kind: &SplitKind) -> String {
        match kind {
            SplitKind::MidSideLead => "pan=mono|c0=0.5*c0+0.5*c1".to_string(),
            SplitKind::MidSideResidual => "pan=mono|c0=0.5*c0+-0.5*c1".to_string(),
            SplitKind::Band { low_hz, high_hz } => {
                let mut parts = Vec::new();
                if let Some(low) = low_hz {
                    parts.push(format!("highpass=f={}", low));
                }
                if let Some(high) = high_hz {
                    parts.push(format!("lowpass=f={}", high));
                }
                parts.join(",")
            }
        }
    }
}

#[async_trait]
impl Refiner for FfmpegRefiner {
    async fn refine(
        &self,
        source: &Path,
        spec: &SubStemSpec,
        out_path: &Path,
    ) -> anyhow::Result<()> {
        let filter = Self::filter_for(&spec.kind);
        let output = Command::new(&self.ffmpeg_bin)
            .arg("-y")
            .arg("-i")
            .arg(source)
            .arg("-af")
            .arg(&filter)
            .arg(out_path)
            .output()
            .await
            .with_context(|| format!("spawn {}", self.ffmpeg_bin))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = stderr.lines().last().unwrap_or("").to_string();
            bail!(
                "ffmpeg failed deriving {} ({}): {}",
                spec.name,
                output.status,
                tail
            );
        }
        Ok(())
    }
}
