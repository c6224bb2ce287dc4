use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use super::{log_requests, metrics, state::*, ServerConfig};
use crate::analysis::AnalysisResult;
use crate::analyzer::AnalyzeError;

#[derive(Serialize)]
struct ServerInfo {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime: String,
    pub endpoints: Vec<&'static str>,
}

#[derive(Serialize)]
struct AnalyzeSuccessResponse<'a> {
    success: bool,
    cached: bool,
    data: &'a AnalysisResult,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

#[derive(Serialize)]
struct CacheListing {
    cached_songs: usize,
    asset_ids: Vec<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerInfo {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime: format_uptime(state.start_time.elapsed()),
        endpoints: vec!["GET /api/analyze/{asset_id}", "GET /api/cache"],
    })
}

fn error_status(err: &AnalyzeError) -> StatusCode {
    match err {
        AnalyzeError::InvalidAssetId(_) => StatusCode::BAD_REQUEST,
        AnalyzeError::Fetch(_) | AnalyzeError::Probe(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    let body = ErrorResponse {
        success: false,
        error,
    };
    (status, Json(body)).into_response()
}

async fn analyze_asset(
    State(analyzer): State<GuardedAnalyzer>,
    Path(asset_id): Path<String>,
) -> Response {
    match analyzer.analyze(&asset_id).await {
        Ok(analysis) => Json(AnalyzeSuccessResponse {
            success: true,
            cached: analysis.cached,
            data: &analysis.result,
        })
        .into_response(),
        Err(err) => {
            let status = error_status(&err);
            let message = err.into_message();
            if status == StatusCode::BAD_REQUEST {
                warn!("Rejected asset id {:?}", asset_id);
            } else {
                error!("Analysis of asset {} failed: {}", asset_id, message);
            }
            error_response(status, message)
        }
    }
}

async fn list_cache(State(analyzer): State<GuardedAnalyzer>) -> impl IntoResponse {
    let asset_ids = analyzer.cache().asset_ids();
    Json(CacheListing {
        cached_songs: asset_ids.len(),
        asset_ids,
    })
}

pub fn make_app(config: ServerConfig, analyzer: GuardedAnalyzer) -> Router {
    let state = ServerState::new(config, analyzer);

    let api_routes: Router = Router::new()
        .route("/analyze/{asset_id}", get(analyze_asset))
        .route("/cache", get(list_cache))
        .with_state(state.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
        .layer(cors)
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics::metrics_handler))
}

/// Serves the API until `shutdown` resolves. The metrics endpoint runs on its
/// own port in a background task.
pub async fn run_server<F>(config: ServerConfig, analyzer: GuardedAnalyzer, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    metrics::init_metrics();

    let metrics_listener = tokio::net::TcpListener::bind(("0.0.0.0", config.metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", config.metrics_port))?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, make_metrics_app()).await {
            error!("Metrics server stopped: {}", err);
        }
    });

    let port = config.port;
    let app = make_app(config, analyzer);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    info!("Ready to serve at port {}!", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}

/// How long in-flight requests may keep running once shutdown was requested.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Lets a server that was asked to shut down finish its in-flight requests,
/// giving up after `grace` or as soon as `interrupt` resolves.
pub async fn drain_within<S, I>(server: S, grace: Duration, interrupt: I) -> Result<()>
where
    S: Future<Output = Result<()>>,
    I: Future<Output = ()>,
{
    tokio::select! {
        drained = tokio::time::timeout(grace, server) => match drained {
            Ok(result) => result,
            Err(_) => {
                warn!("Requests still running after {}s, not waiting any longer", grace.as_secs());
                Ok(())
            }
        },
        _ = interrupt => {
            warn!("Shutdown requested again, not waiting for in-flight requests");
            Ok(())
        }
    }
}
