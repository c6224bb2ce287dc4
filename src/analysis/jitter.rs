use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use std::sync::Mutex;

pub const BASS_RANGE: Range<f64> = 0.8..1.0;
pub const MID_RANGE: Range<f64> = 0.7..1.0;
pub const HIGH_RANGE: Range<f64> = 0.6..1.0;

/// Multipliers applied to a window amplitude to make up the pseudo-bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandFactors {
    pub bass: f64,
    pub mid: f64,
    pub high: f64,
}

impl BandFactors {
    fn draw<R: Rng>(rng: &mut R) -> Self {
        BandFactors {
            bass: rng.random_range(BASS_RANGE),
            mid: rng.random_range(MID_RANGE),
            high: rng.random_range(HIGH_RANGE),
        }
    }
}

pub trait JitterSource: Send + Sync {
    fn band_factors(&self) -> BandFactors;
}

/// Non-reproducible jitter backed by the thread-local generator.
#[derive(Default)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn band_factors(&self) -> BandFactors {
        BandFactors::draw(&mut rand::rng())
    }
}

/// Deterministic jitter for a given seed.
///
/// Windows inside a batch run concurrently, so the factor sequence is only
/// reproducible in the order the draws happen to be made.
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl JitterSource for SeededJitter {
    fn band_factors(&self) -> BandFactors {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        BandFactors::draw(&mut *rng)
    }
}
