mod file_config;

pub use file_config::{FileConfig, SamplerConfig};

use crate::analysis::DEFAULT_BATCH_SIZE;
use crate::fetcher::ASSET_ID_PLACEHOLDER;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_METRICS_PORT: u16 = 9091;
pub const DEFAULT_SCRATCH_DIR: &str = "temp";
pub const DEFAULT_ASSET_URL_TEMPLATE: &str =
    "https://assetdelivery.roblox.com/v1/asset/?id={asset_id}";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub scratch_dir: PathBuf,
    pub asset_url_template: String,
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    pub batch_size: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            metrics_port: DEFAULT_METRICS_PORT,
            logging_level: RequestsLoggingLevel::default(),
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            asset_url_template: DEFAULT_ASSET_URL_TEMPLATE.to_string(),
            ffprobe_path: "ffprobe".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub scratch_dir: PathBuf,
    pub asset_url_template: String,
    pub sampler: SamplerSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerSettings {
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    pub batch_size: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            ffprobe_path: "ffprobe".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port {
            bail!("port and metrics_port must differ (both are {})", port);
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let scratch_dir = file
            .scratch_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.scratch_dir.clone());

        let asset_url_template = file
            .asset_url_template
            .unwrap_or_else(|| cli.asset_url_template.clone());
        if !asset_url_template.contains(ASSET_ID_PLACEHOLDER) {
            bail!(
                "asset_url_template must contain {} (got {:?})",
                ASSET_ID_PLACEHOLDER,
                asset_url_template
            );
        }

        let sampler_file = file.sampler.unwrap_or_default();
        let sampler = SamplerSettings {
            ffprobe_path: sampler_file
                .ffprobe_path
                .unwrap_or_else(|| cli.ffprobe_path.clone()),
            ffmpeg_path: sampler_file
                .ffmpeg_path
                .unwrap_or_else(|| cli.ffmpeg_path.clone()),
            batch_size: sampler_file.batch_size.unwrap_or(cli.batch_size),
        };
        if sampler.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }

        Ok(Self {
            port,
            metrics_port,
            logging_level,
            scratch_dir,
            asset_url_template,
            sampler,
        })
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
