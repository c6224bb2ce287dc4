use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use crate::analyzer::AssetAnalyzer;

use super::ServerConfig;

pub type GuardedAnalyzer = Arc<AssetAnalyzer>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub analyzer: GuardedAnalyzer,
}

impl ServerState {
    pub fn new(config: ServerConfig, analyzer: GuardedAnalyzer) -> Self {
        ServerState {
            config,
            start_time: Instant::now(),
            analyzer,
        }
    }
}

impl FromRef<ServerState> for GuardedAnalyzer {
    fn from_ref(input: &ServerState) -> Self {
        input.analyzer.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
