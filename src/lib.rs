//! Pezzottify Analyzer Library
//!
//! Loudness time series for remote audio assets, served over HTTP.

pub mod analysis;
pub mod analysis_cache;
pub mod analyzer;
pub mod config;
pub mod fetcher;
pub mod scratch;
pub mod server;

// Re-export commonly used types for convenience
pub use analysis::{AnalysisResult, FfmpegToolkit, MediaToolkit, Sample, Sampler};
pub use analysis_cache::AnalysisCache;
pub use analyzer::{AnalyzeError, AssetAnalyzer};
pub use fetcher::{AssetFetcher, FetchError, HttpAssetFetcher};
pub use scratch::{ScratchDir, ScratchFile};
pub use server::{
    drain_within, run_server, RequestsLoggingLevel, ServerConfig, SHUTDOWN_GRACE_PERIOD,
};
