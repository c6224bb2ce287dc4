pub mod jitter;
pub mod models;
pub mod sampler;
pub mod toolkit;
pub mod window;

pub use jitter::{JitterSource, RandomJitter, SeededJitter};
pub use models::{AnalysisResult, Sample, WINDOW_INTERVAL_SECS};
pub use sampler::{window_count, Sampler, DEFAULT_BATCH_SIZE};
pub use toolkit::{FfmpegToolkit, MediaToolkit, ProbeError};
