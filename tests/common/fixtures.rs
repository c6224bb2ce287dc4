//! Fakes standing in for the media delivery endpoint and ffmpeg.

use super::constants::*;
use async_trait::async_trait;
use axum::{
    extract::{Path as UrlPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use pezzottify_analyzer::analysis::{MediaToolkit, ProbeError};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts requests made to the fake origin.
#[derive(Clone, Default)]
pub struct OriginHits(Arc<AtomicUsize>);

impl OriginHits {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

async fn serve_asset(State(hits): State<OriginHits>, UrlPath(asset_id): UrlPath<String>) -> Response {
    hits.0.fetch_add(1, Ordering::SeqCst);
    match asset_id.as_str() {
        MISSING_ASSET_ID => StatusCode::NOT_FOUND.into_response(),
        CORRUPT_ASSET_ID => CORRUPT_AUDIO_BYTES.into_response(),
        _ => FAKE_AUDIO_BYTES.into_response(),
    }
}

pub fn make_origin_app(hits: OriginHits) -> Router {
    Router::new()
        .route("/v1/asset/{asset_id}", get(serve_asset))
        .with_state(hits)
}

/// Pretends every readable asset is a TEST_DURATION_SECS track with constant loudness.
#[derive(Default)]
pub struct FakeToolkit {
    pub loudness_calls: AtomicUsize,
}

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn probe_duration(&self, path: &Path) -> Result<f64, ProbeError> {
        let bytes = tokio::fs::read(path).await?;
        if bytes == CORRUPT_AUDIO_BYTES {
            return Err(ProbeError::ToolFailed("Invalid data found when processing input".to_string()));
        }
        Ok(TEST_DURATION_SECS)
    }

    async fn loudness_report(
        &self,
        path: &Path,
        _start: f64,
        _width: f64,
    ) -> anyhow::Result<String> {
        self.loudness_calls.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(path.exists(), "{:?} disappeared", path);
        Ok(FIXED_LOUDNESS_REPORT.to_string())
    }
}
