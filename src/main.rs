use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pezzottify_analyzer::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_ASSET_URL_TEMPLATE, DEFAULT_METRICS_PORT,
    DEFAULT_PORT, DEFAULT_SCRATCH_DIR,
};
use pezzottify_analyzer::{
    drain_within, run_server, AnalysisCache, AssetAnalyzer, FfmpegToolkit, HttpAssetFetcher,
    RequestsLoggingLevel, Sampler, ScratchDir, ServerConfig, SHUTDOWN_GRACE_PERIOD,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Directory where downloaded assets are kept while being analyzed.
    #[clap(long, value_parser = parse_path, default_value = DEFAULT_SCRATCH_DIR)]
    pub scratch_dir: PathBuf,

    /// URL of the media delivery endpoint, `{asset_id}` is replaced by the requested id.
    #[clap(long, default_value = DEFAULT_ASSET_URL_TEMPLATE)]
    pub asset_url_template: String,

    /// ffprobe binary used to read durations.
    #[clap(long, default_value = "ffprobe")]
    pub ffprobe_path: String,

    /// ffmpeg binary used to measure window loudness.
    #[clap(long, default_value = "ffmpeg")]
    pub ffmpeg_path: String,

    /// Number of windows analyzed concurrently.
    #[clap(long, default_value_t = pezzottify_analyzer::analysis::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            scratch_dir: self.scratch_dir.clone(),
            asset_url_template: self.asset_url_template.clone(),
            ffprobe_path: self.ffprobe_path.clone(),
            ffmpeg_path: self.ffmpeg_path.clone(),
            batch_size: self.batch_size,
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let toolkit = FfmpegToolkit::new(
        &app_config.sampler.ffprobe_path,
        &app_config.sampler.ffmpeg_path,
    );
    if let Err(err) = toolkit.check_available().await {
        warn!("Media toolkit check failed, analyses will fail: {:#}", err);
    }

    let scratch = ScratchDir::new(&app_config.scratch_dir);
    scratch.ensure().await?;
    info!("Using scratch directory {:?}", scratch.root());

    info!("Fetching assets from {}", app_config.asset_url_template);
    let fetcher = HttpAssetFetcher::new(app_config.asset_url_template.clone())?;
    let sampler = Sampler::new(Arc::new(toolkit)).with_batch_size(app_config.sampler.batch_size);
    let analyzer = Arc::new(AssetAnalyzer::new(
        Arc::new(fetcher),
        sampler,
        Arc::new(AnalysisCache::new()),
        scratch.clone(),
    ));

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
    };
    info!("Metrics available at port {}!", server_config.metrics_port);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = run_server(server_config, analyzer, async move {
        stop_rx.await.ok();
    });
    tokio::pin!(server);

    // A second signal or the grace period ends the drain, the sweep always runs.
    let result = tokio::select! {
        result = &mut server => result,
        _ = shutdown_signal() => {
            let _ = stop_tx.send(());
            info!(
                "Waiting up to {}s for in-flight requests, signal again to stop now",
                SHUTDOWN_GRACE_PERIOD.as_secs()
            );
            drain_within(&mut server, SHUTDOWN_GRACE_PERIOD, shutdown_signal()).await
        }
    };

    let removed = scratch.sweep();
    info!("Removed {} scratch files, bye", removed);
    result
}
