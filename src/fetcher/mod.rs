mod client;

pub use client::HttpAssetFetcher;

use async_trait::async_trait;
use thiserror::Error;

use crate::scratch::{ScratchDir, ScratchFile};

/// Placeholder replaced by the asset id in the asset URL template.
pub const ASSET_ID_PLACEHOLDER: &str = "{asset_id}";

/// Variants wrapping another error leave it to `source()`, render the chain
/// with `{:#}` through anyhow to see the root cause.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch asset")]
    Request(#[source] reqwest::Error),

    #[error("Failed to fetch asset {asset_id}: remote returned {status}")]
    Status {
        asset_id: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to read asset body")]
    Body(#[source] reqwest::Error),

    #[error("Failed to prepare scratch directory: {0:#}")]
    Scratch(anyhow::Error),

    #[error("Failed to write asset to disk")]
    Io(#[from] std::io::Error),
}

/// Downloads the raw bytes of an asset into local scratch storage.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// The returned file is removed from disk when dropped.
    async fn fetch(&self, asset_id: &str, scratch: &ScratchDir) -> Result<ScratchFile, FetchError>;
}
