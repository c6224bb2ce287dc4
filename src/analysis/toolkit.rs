//! Wrappers around the external ffprobe/ffmpeg binaries.

use anyhow::{bail, Context};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to run ffprobe")]
    Spawn(#[from] std::io::Error),

    #[error("ffprobe failed: {0}")]
    ToolFailed(String),

    #[error("Could not parse duration from ffprobe output: {0:?}")]
    InvalidDuration(String),

    #[error("Duration of {0:.0}s exceeds the maximum of {1:.0}s")]
    DurationTooLong(f64, f64),
}

/// The external media tooling the sampler depends on.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Total duration of the audio file, in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64, ProbeError>;

    /// Raw textual loudness statistics for `[start, start + width)`.
    async fn loudness_report(&self, path: &Path, start: f64, width: f64)
        -> anyhow::Result<String>;
}

pub struct FfmpegToolkit {
    ffprobe_path: PathBuf,
    ffmpeg_path: PathBuf,
}

impl FfmpegToolkit {
    pub fn new(ffprobe_path: impl Into<PathBuf>, ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// Check if ffmpeg and ffprobe can be executed.
    pub async fn check_available(&self) -> anyhow::Result<()> {
        for binary in [&self.ffprobe_path, &self.ffmpeg_path] {
            let status = Command::new(binary)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .with_context(|| format!("{} not found", binary.display()))?;
            if !status.success() {
                bail!("{} is not working ({})", binary.display(), status);
            }
        }
        Ok(())
    }
}

impl Default for FfmpegToolkit {
    fn default() -> Self {
        Self::new("ffprobe", "ffmpeg")
    }
}

/// Parses the single float ffprobe prints for `format=duration`.
pub fn parse_duration_output(stdout: &str) -> Result<f64, ProbeError> {
    let trimmed = stdout.trim();
    match trimmed.parse::<f64>() {
        Ok(duration) if duration.is_finite() && duration >= 0.0 => Ok(duration),
        _ => Err(ProbeError::InvalidDuration(trimmed.to_string())),
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe_duration(&self, path: &Path) -> Result<f64, ProbeError> {
        let output = Command::new(&self.ffprobe_path)
            .kill_on_drop(true)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::ToolFailed(stderr.trim().to_string()));
        }

        parse_duration_output(&String::from_utf8_lossy(&output.stdout))
    }

    async fn loudness_report(
        &self,
        path: &Path,
        start: f64,
        width: f64,
    ) -> anyhow::Result<String> {
        let output = Command::new(&self.ffmpeg_path)
            .kill_on_drop(true)
            .args(["-hide_banner", "-nostats"])
            .arg("-ss")
            .arg(format!("{:.3}", start))
            .arg("-t")
            .arg(format!("{:.3}", width))
            .arg("-i")
            .arg(path)
            .args(["-af", "astats=metadata=1:reset=1", "-f", "null", "-"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to run ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("ffmpeg exited with {}: {}", output.status, stderr.trim());
        }

        // astats writes to stderr, but read both streams like a shell `2>&1` would.
        let mut report = String::from_utf8_lossy(&output.stdout).into_owned();
        report.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(report)
    }
}
