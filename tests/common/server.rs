//! Test server lifecycle management
//!
//! Each test gets an isolated analyzer server, its own scratch directory and a
//! fake media delivery endpoint on a random port.

use super::constants::*;
use super::fixtures::{make_origin_app, FakeToolkit, OriginHits};
use pezzottify_analyzer::analysis::SeededJitter;
use pezzottify_analyzer::server::server::make_app;
use pezzottify_analyzer::{
    AnalysisCache, AssetAnalyzer, HttpAssetFetcher, RequestsLoggingLevel, Sampler, ScratchDir,
    ServerConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated cache and scratch directory
///
/// When dropped, both the analyzer and the fake origin shut down.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Scratch directory used by the analyzer
    pub scratch_dir: PathBuf,

    /// Requests received by the fake origin
    pub origin_hits: OriginHits,

    /// Fake ffmpeg/ffprobe, exposes call counts
    pub toolkit: Arc<FakeToolkit>,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_txs: Vec<tokio::sync::oneshot::Sender<()>>,
}

async fn spawn_router(router: axum::Router) -> (String, tokio::sync::oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let port = listener
        .local_addr()
        .expect("Failed to get local address")
        .port();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
    });

    (format!("http://127.0.0.1:{}", port), shutdown_tx)
}

impl TestServer {
    /// Spawns a fake origin and an analyzer server wired to it
    ///
    /// # Panics
    ///
    /// Panics if binding fails or the server doesn't become ready in time.
    pub async fn spawn() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let scratch_dir = temp_dir.path().join("temp");

        let origin_hits = OriginHits::default();
        let (origin_url, origin_shutdown) =
            spawn_router(make_origin_app(origin_hits.clone())).await;

        let fetcher = HttpAssetFetcher::new(format!("{}/v1/asset/{{asset_id}}", origin_url))
            .expect("Failed to create fetcher");
        let toolkit = Arc::new(FakeToolkit::default());
        let sampler = Sampler::new(toolkit.clone()).with_jitter(Arc::new(SeededJitter::new(42)));
        let analyzer = Arc::new(AssetAnalyzer::new(
            Arc::new(fetcher),
            sampler,
            Arc::new(AnalysisCache::new()),
            ScratchDir::new(&scratch_dir),
        ));

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            ..Default::default()
        };
        let (base_url, server_shutdown) = spawn_router(make_app(config, analyzer)).await;

        let server = Self {
            base_url,
            scratch_dir,
            origin_hits,
            toolkit,
            _temp_dir: temp_dir,
            _shutdown_txs: vec![server_shutdown, origin_shutdown],
        };

        server.wait_for_ready().await;

        server
    }

    /// Files currently in the scratch directory
    pub fn scratch_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.scratch_dir) {
            Ok(entries) => entries.flatten().map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Waits for the server to become ready by polling the / endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        for tx in self._shutdown_txs.drain(..) {
            let _ = tx.send(());
        }
    }
}
