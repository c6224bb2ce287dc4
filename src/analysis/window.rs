//! Loudness analysis of a single window.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;
use tracing::warn;

use super::jitter::JitterSource;
use super::models::{db_to_linear, round_to, Sample, SILENCE_FLOOR_DB};
use super::toolkit::MediaToolkit;
use crate::server::metrics;

lazy_static! {
    static ref RMS_LEVEL_RE: Regex =
        Regex::new(r"RMS level dB:\s*(\S+)").expect("Invalid RMS level regex");
    static ref PEAK_LEVEL_RE: Regex =
        Regex::new(r"Peak level dB:\s*(\S+)").expect("Invalid peak level regex");
}

/// RMS and peak levels read from an analysis report, in dB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessLevels {
    pub rms_db: f64,
    pub peak_db: f64,
}

fn first_level(re: &Regex, report: &str) -> f64 {
    re.captures(report)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|db| db.is_finite())
        .unwrap_or(SILENCE_FLOOR_DB)
}

/// Reads the first `RMS level dB` and `Peak level dB` values in the report.
/// Missing or non-numeric values (ffmpeg prints `-inf` for digital silence)
/// fall back to the silence floor.
pub fn parse_loudness_report(report: &str) -> LoudnessLevels {
    LoudnessLevels {
        rms_db: first_level(&RMS_LEVEL_RE, report),
        peak_db: first_level(&PEAK_LEVEL_RE, report),
    }
}

pub fn sample_from_levels(time: f64, levels: LoudnessLevels, jitter: &dyn JitterSource) -> Sample {
    let amplitude = db_to_linear(levels.rms_db);
    let peak = db_to_linear(levels.peak_db);
    let factors = jitter.band_factors();

    Sample {
        time: round_to(time, 2),
        amplitude: round_to(amplitude, 4),
        bass: round_to(amplitude * factors.bass, 4),
        mid: round_to(amplitude * factors.mid, 4),
        high: round_to(amplitude * factors.high, 4),
        peak: round_to(peak, 4),
    }
}

async fn try_analyze_window(
    toolkit: &dyn MediaToolkit,
    jitter: &dyn JitterSource,
    path: &Path,
    time: f64,
    width: f64,
) -> anyhow::Result<Sample> {
    let report = toolkit.loudness_report(path, time, width).await?;
    let levels = parse_loudness_report(&report);
    Ok(sample_from_levels(time, levels, jitter))
}

/// Analyzes the window starting at `time`. Never fails: a window that cannot
/// be analyzed comes back as a zero-valued sample at the same time.
pub async fn analyze_window(
    toolkit: &dyn MediaToolkit,
    jitter: &dyn JitterSource,
    path: &Path,
    time: f64,
    width: f64,
) -> Sample {
    match try_analyze_window(toolkit, jitter, path, time, width).await {
        Ok(sample) => sample,
        Err(err) => {
            warn!("Window at {:.2}s of {:?} failed: {:#}", time, path, err);
            metrics::record_window_failure();
            Sample::silent(time)
        }
    }
}
