//! HTTP client for end-to-end tests
//!
//! When API routes change, update only this file.

use super::constants::*;
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// GET /
    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    /// GET /api/analyze/{asset_id}
    pub async fn analyze(&self, asset_id: &str) -> Response {
        self.client
            .get(format!("{}/api/analyze/{}", self.base_url, asset_id))
            .send()
            .await
            .expect("Analyze request failed")
    }

    /// GET /api/analyze/{asset_id}, parsed as JSON
    pub async fn analyze_json(&self, asset_id: &str) -> (reqwest::StatusCode, serde_json::Value) {
        let response = self.analyze(asset_id).await;
        let status = response.status();
        let body = response.json().await.expect("Analyze response is not JSON");
        (status, body)
    }

    /// GET /api/cache
    pub async fn cache(&self) -> Response {
        self.client
            .get(format!("{}/api/cache", self.base_url))
            .send()
            .await
            .expect("Cache request failed")
    }
}
