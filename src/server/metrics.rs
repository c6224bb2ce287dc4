use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all analyzer metrics
const PREFIX: &str = "analyzer";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.1, 1.0, 5.0, 15.0, 60.0, 300.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Analysis Metrics
    pub static ref ANALYSES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_analyses_total"), "Analysis requests by outcome"),
        &["outcome"]
    ).expect("Failed to create analyses_total metric");

    pub static ref ANALYSIS_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_analysis_duration_seconds"),
            "Time spent fetching and sampling an uncached asset"
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0])
    ).expect("Failed to create analysis_duration_seconds metric");

    pub static ref WINDOW_FAILURES_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_window_failures_total"),
        "Windows that could not be analyzed and were reported as silent"
    ).expect("Failed to create window_failures_total metric");

    pub static ref CACHED_ASSETS: Gauge = Gauge::new(
        format!("{PREFIX}_cached_assets"),
        "Number of analysis results held in memory"
    ).expect("Failed to create cached_assets metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(ANALYSES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ANALYSIS_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(WINDOW_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CACHED_ASSETS.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Collapses per-asset paths so they don't explode label cardinality.
pub fn categorize_endpoint(path: &str) -> &'static str {
    if path.starts_with("/api/analyze/") {
        "/api/analyze/{asset_id}"
    } else if path == "/api/cache" {
        "/api/cache"
    } else if path == "/" {
        "/"
    } else {
        "other"
    }
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let endpoint = categorize_endpoint(path);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(duration.as_secs_f64());
}

pub fn record_analysis(outcome: &str) {
    ANALYSES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_analysis_duration(duration: Duration) {
    ANALYSIS_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn record_window_failure() {
    WINDOW_FAILURES_TOTAL.inc();
}

pub fn set_cached_assets(count: usize) {
    CACHED_ASSETS.set(count as f64);
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
