pub mod config;
mod http_layers;
pub mod metrics;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{drain_within, run_server, SHUTDOWN_GRACE_PERIOD};
