//! Daemon entry point for the shop MCP server.
//!
//! Resolves store configuration, builds the store registry, and serves the MCP
//! protocol over stdio or streamable HTTP.

mod config;
mod registry;

use std::process::ExitCode;
use std::sync::Arc;

use shop_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::config::{DaemonConfig, Transport};
use crate::registry::build_registry;

const DEFAULT_LOG_FILTER: &str = "shop_mcpd=info,shop_mcp=info,shop_core=info";

#[tokio::main]
async fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = DaemonConfig::from_args()?;
    let registry = Arc::new(build_registry(&config.store_sources)?);

    match config.transport {
        Transport::Stdio => serve_stdio(registry).await,
        Transport::Http => {
            let http_config =
                McpHttpServerConfig::new(config.http_addr).with_stateful_mode(config.http_stateful);
            serve_streamable_http(registry, http_config).await
        }
    }
}
