use serde::{Deserialize, Serialize};

/// Width of a single analysis window, in seconds.
pub const WINDOW_INTERVAL_SECS: f64 = 0.1;

/// Loudness floor used when the analysis tool does not report a level.
pub const SILENCE_FLOOR_DB: f64 = -60.0;

/// Loudness estimate for one window of audio.
///
/// `bass`, `mid` and `high` are not real frequency bands, they are the
/// amplitude scaled by random factors so that clients have something to draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub amplitude: f64,
    pub bass: f64,
    pub mid: f64,
    pub high: f64,
    pub peak: f64,
}

impl Sample {
    /// A zero-valued sample, used when a window could not be analyzed.
    pub fn silent(time: f64) -> Self {
        Sample {
            time: round_to(time, 2),
            amplitude: 0.0,
            bass: 0.0,
            mid: 0.0,
            high: 0.0,
            peak: 0.0,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.amplitude == 0.0
            && self.bass == 0.0
            && self.mid == 0.0
            && self.high == 0.0
            && self.peak == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub asset_id: String,
    pub duration: f64,
    pub interval: f64,
    pub samples: usize,
    pub data: Vec<Sample>,
}

impl AnalysisResult {
    pub fn new(asset_id: &str, duration: f64, data: Vec<Sample>) -> Self {
        AnalysisResult {
            asset_id: asset_id.to_string(),
            duration,
            interval: WINDOW_INTERVAL_SECS,
            samples: data.len(),
            data,
        }
    }

    /// Number of samples that came back zero-valued.
    pub fn silent_samples(&self) -> usize {
        self.data.iter().filter(|s| s.is_silent()).count()
    }
}

/// Converts a decibel level to a linear amplitude.
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
