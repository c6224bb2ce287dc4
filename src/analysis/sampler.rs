//! Turns an audio file into a time series of loudness samples.
//!
//! The track is cut into fixed [`WINDOW_INTERVAL_SECS`] windows and every
//! window is measured by its own ffmpeg run. Windows are processed in batches:
//! the windows of a batch run concurrently and are joined before the next
//! batch starts, so at most `batch_size` tool processes are alive at once.
//! A trailing remainder shorter than one window is not sampled.

use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::jitter::{JitterSource, RandomJitter};
use super::models::{AnalysisResult, Sample, WINDOW_INTERVAL_SECS};
use super::toolkit::{MediaToolkit, ProbeError};
use super::window::analyze_window;

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Longest track accepted for sampling, 24 hours.
pub const MAX_DURATION_SECS: f64 = 86_400.0;

/// Number of full windows that fit in `duration`.
pub fn window_count(duration: f64, interval: f64) -> usize {
    if duration.is_nan() || duration <= 0.0 || interval <= 0.0 {
        return 0;
    }
    (duration / interval).floor() as usize
}

pub struct Sampler {
    toolkit: Arc<dyn MediaToolkit>,
    jitter: Arc<dyn JitterSource>,
    batch_size: usize,
}

impl Sampler {
    pub fn new(toolkit: Arc<dyn MediaToolkit>) -> Self {
        Self {
            toolkit,
            jitter: Arc::new(RandomJitter),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    /// Sets how many windows are analyzed concurrently. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Probes the file duration and samples every full window of it.
    ///
    /// Only a failed or out of range duration probe is an error, windows that cannot be
    /// analyzed are reported as silent samples.
    pub async fn analyze(&self, asset_id: &str, path: &Path) -> Result<AnalysisResult, ProbeError> {
        let start = Instant::now();
        let duration = self.toolkit.probe_duration(path).await?;
        if duration > MAX_DURATION_SECS {
            return Err(ProbeError::DurationTooLong(duration, MAX_DURATION_SECS));
        }
        let total_windows = window_count(duration, WINDOW_INTERVAL_SECS);
        info!(
            "Sampling asset {}: {:.2}s, {} windows, batches of {}",
            asset_id, duration, total_windows, self.batch_size
        );

        let data = self.sample_windows(path, total_windows).await;
        let result = AnalysisResult::new(asset_id, duration, data);

        info!(
            "Sampled asset {} in {}ms ({} silent windows)",
            asset_id,
            start.elapsed().as_millis(),
            result.silent_samples()
        );
        Ok(result)
    }

    async fn sample_windows(&self, path: &Path, total_windows: usize) -> Vec<Sample> {
        let mut data = Vec::with_capacity(total_windows.min(self.batch_size));
        let mut batch_start = 0;

        while batch_start < total_windows {
            let batch_end = (batch_start + self.batch_size).min(total_windows);
            let batch = (batch_start..batch_end).map(|index| {
                analyze_window(
                    self.toolkit.as_ref(),
                    self.jitter.as_ref(),
                    path,
                    index as f64 * WINDOW_INTERVAL_SECS,
                    WINDOW_INTERVAL_SECS,
                )
            });

            // join_all yields results in input order, whatever order they finish in.
            data.extend(join_all(batch).await);
            debug!("Sampled windows {}..{} of {}", batch_start, batch_end, total_windows);
            batch_start = batch_end;
        }

        data
    }
}
