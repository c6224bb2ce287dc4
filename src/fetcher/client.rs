//! HTTP client downloading assets from the media delivery endpoint.

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{AssetFetcher, FetchError, ASSET_ID_PLACEHOLDER};
use crate::scratch::{ScratchDir, ScratchFile};

pub struct HttpAssetFetcher {
    client: reqwest::Client,
    url_template: String,
}

impl HttpAssetFetcher {
    /// Create a new fetcher.
    ///
    /// # Arguments
    /// * `url_template` - Asset URL with an `{asset_id}` placeholder
    ///   (e.g., "https://media.example.com/v1/asset/?id={asset_id}")
    pub fn new(url_template: String) -> anyhow::Result<Self> {
        if !url_template.contains(ASSET_ID_PLACEHOLDER) {
            anyhow::bail!(
                "Asset URL template {:?} has no {} placeholder",
                url_template,
                ASSET_ID_PLACEHOLDER
            );
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url_template,
        })
    }

    pub fn url_for(&self, asset_id: &str) -> String {
        self.url_template.replace(ASSET_ID_PLACEHOLDER, asset_id)
    }

    /// Streams the response body into `dest`, returning the number of bytes written.
    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        dest: &ScratchFile,
    ) -> Result<u64, FetchError> {
        let mut file = File::create(dest.path()).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(FetchError::Body)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, asset_id: &str, scratch: &ScratchDir) -> Result<ScratchFile, FetchError> {
        let url = self.url_for(asset_id);
        debug!("Fetching asset {} from {}", asset_id, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(FetchError::Request)?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                asset_id: asset_id.to_string(),
                status: response.status(),
            });
        }

        scratch.ensure().await.map_err(FetchError::Scratch)?;

        // Guard first, so a partially written file is removed on error.
        let dest = ScratchFile::new(scratch.path_for(asset_id));
        let written = self.stream_to_file(response, &dest).await?;

        info!(
            "Fetched asset {} ({:#})",
            asset_id,
            byte_unit::Byte::from(written)
        );
        Ok(dest)
    }
}
