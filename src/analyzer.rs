//! Request-level orchestration: cache lookup, fetch, sample, store.

use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

use crate::analysis::{AnalysisResult, ProbeError, Sampler};
use crate::analysis_cache::AnalysisCache;
use crate::fetcher::{AssetFetcher, FetchError};
use crate::scratch::ScratchDir;
use crate::server::metrics;

lazy_static! {
    static ref ASSET_ID_RE: Regex =
        Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("Invalid asset id regex");
}

/// Asset ids become scratch file names, so only a safe alphabet is accepted.
pub fn is_valid_asset_id(asset_id: &str) -> bool {
    ASSET_ID_RE.is_match(asset_id)
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Invalid asset id: {0:?}")]
    InvalidAssetId(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

impl AnalyzeError {
    /// The error followed by each of its causes, e.g.
    /// `Failed to fetch asset: error sending request: ... Connection refused`.
    pub fn into_message(self) -> String {
        format!("{:#}", anyhow::Error::from(self))
    }

    fn metric_label(&self) -> &'static str {
        match self {
            AnalyzeError::InvalidAssetId(_) => "invalid",
            AnalyzeError::Fetch(_) => "fetch_error",
            AnalyzeError::Probe(_) => "probe_error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: Arc<AnalysisResult>,
    pub cached: bool,
}

pub struct AssetAnalyzer {
    fetcher: Arc<dyn AssetFetcher>,
    sampler: Sampler,
    cache: Arc<AnalysisCache>,
    scratch: ScratchDir,
}

impl AssetAnalyzer {
    pub fn new(
        fetcher: Arc<dyn AssetFetcher>,
        sampler: Sampler,
        cache: Arc<AnalysisCache>,
        scratch: ScratchDir,
    ) -> Self {
        Self {
            fetcher,
            sampler,
            cache,
            scratch,
        }
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Returns the cached analysis of `asset_id`, computing and caching it on a miss.
    ///
    /// Concurrent misses for the same id are not coalesced, each one runs the
    /// full pipeline against the same scratch path.
    pub async fn analyze(&self, asset_id: &str) -> Result<Analysis, AnalyzeError> {
        let outcome = self.analyze_inner(asset_id).await;
        match &outcome {
            Ok(analysis) if analysis.cached => metrics::record_analysis("cached"),
            Ok(_) => metrics::record_analysis("analyzed"),
            Err(err) => metrics::record_analysis(err.metric_label()),
        }
        outcome
    }

    async fn analyze_inner(&self, asset_id: &str) -> Result<Analysis, AnalyzeError> {
        if !is_valid_asset_id(asset_id) {
            return Err(AnalyzeError::InvalidAssetId(asset_id.to_string()));
        }

        if let Some(result) = self.cache.get(asset_id) {
            debug!("Cache hit for asset {}", asset_id);
            return Ok(Analysis {
                result,
                cached: true,
            });
        }

        let start = Instant::now();
        // Dropping the scratch file deletes it, whichever way this returns.
        let audio_file = self.fetcher.fetch(asset_id, &self.scratch).await?;
        let result = self.sampler.analyze(asset_id, audio_file.path()).await?;
        drop(audio_file);

        let result = self.cache.put(asset_id, result);
        metrics::record_analysis_duration(start.elapsed());
        metrics::set_cached_assets(self.cache.len());
        info!(
            "Analyzed asset {}: {} samples in {}ms",
            asset_id,
            result.samples,
            start.elapsed().as_millis()
        );

        Ok(Analysis {
            result,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{MediaToolkit, SeededJitter};
    use crate::scratch::ScratchFile;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Writes a placeholder file, or fails for asset ids starting with "missing".
    #[derive(Default)]
    struct FakeFetcher {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl AssetFetcher for FakeFetcher {
        async fn fetch(
            &self,
            asset_id: &str,
            scratch: &ScratchDir,
        ) -> Result<ScratchFile, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if asset_id.starts_with("missing") {
                return Err(FetchError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such asset",
                )));
            }
            scratch.ensure().await.map_err(FetchError::Scratch)?;
            let file = ScratchFile::new(scratch.path_for(asset_id));
            tokio::fs::write(file.path(), b"not really audio").await?;
            Ok(file)
        }
    }

    struct FakeToolkit;

    #[async_trait]
    impl MediaToolkit for FakeToolkit {
        async fn probe_duration(&self, path: &Path) -> Result<f64, ProbeError> {
            if path.to_string_lossy().contains("corrupt") {
                return Err(ProbeError::InvalidDuration("N/A".to_string()));
            }
            Ok(1.0)
        }

        async fn loudness_report(
            &self,
            _path: &Path,
            _start: f64,
            _width: f64,
        ) -> anyhow::Result<String> {
            Ok("RMS level dB: -20.0\nPeak level dB: -10.0".to_string())
        }
    }

    fn analyzer(temp: &TempDir) -> (AssetAnalyzer, Arc<FakeFetcher>) {
        let fetcher = Arc::new(FakeFetcher::default());
        let sampler =
            Sampler::new(Arc::new(FakeToolkit)).with_jitter(Arc::new(SeededJitter::new(1)));
        let analyzer = AssetAnalyzer::new(
            fetcher.clone(),
            sampler,
            Arc::new(AnalysisCache::new()),
            ScratchDir::new(temp.path().join("temp")),
        );
        (analyzer, fetcher)
    }

    #[test]
    fn validates_asset_ids() {
        assert!(is_valid_asset_id("123"));
        assert!(is_valid_asset_id("track_42-b"));
        assert!(!is_valid_asset_id(""));
        assert!(!is_valid_asset_id("../etc/passwd"));
        assert!(!is_valid_asset_id("a b"));
        assert!(!is_valid_asset_id(&"9".repeat(65)));
    }

    #[tokio::test]
    async fn analyzes_then_serves_from_cache() {
        let temp = TempDir::new().unwrap();
        let (analyzer, fetcher) = analyzer(&temp);

        let first = analyzer.analyze("123").await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.result.samples, 10);

        let second = analyzer.analyze("123").await.unwrap();
        assert!(second.cached);
        assert_eq!(second.result, first.result);
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(analyzer.cache().asset_ids(), vec!["123".to_string()]);
    }

    #[tokio::test]
    async fn removes_scratch_file_after_analysis() {
        let temp = TempDir::new().unwrap();
        let (analyzer, _) = analyzer(&temp);

        analyzer.analyze("77").await.unwrap();
        assert!(!analyzer.scratch().path_for("77").exists());
    }

    #[tokio::test]
    async fn removes_scratch_file_when_probe_fails() {
        let temp = TempDir::new().unwrap();
        let (analyzer, _) = analyzer(&temp);

        let err = analyzer.analyze("corrupt").await.unwrap_err();

        assert!(matches!(err, AnalyzeError::Probe(_)));
        assert!(!analyzer.scratch().path_for("corrupt").exists());
        assert!(analyzer.cache().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_is_not_cached() {
        let temp = TempDir::new().unwrap();
        let (analyzer, fetcher) = analyzer(&temp);

        assert!(matches!(
            analyzer.analyze("missing").await,
            Err(AnalyzeError::Fetch(_))
        ));
        assert!(analyzer.analyze("missing").await.is_err());
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 2);
        assert!(analyzer.cache().is_empty());
    }

    #[tokio::test]
    async fn rejects_unsafe_asset_id_before_fetching() {
        let temp = TempDir::new().unwrap();
        let (analyzer, fetcher) = analyzer(&temp);

        let err = analyzer.analyze("../../secret").await.unwrap_err();

        assert!(matches!(err, AnalyzeError::InvalidAssetId(_)));
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 0);
    }
}
