//! MCP server runners for shop-mcp.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig,
    StreamableHttpService,
    session::local::LocalSessionManager,
};
use serde_json::{Value, json};
use shop_core::registry::StoreRegistry;
use tracing::info;

use crate::ShopMcp;

const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);
const SSE_RETRY: Duration = Duration::from_secs(3);

/// Configuration for the MCP streamable HTTP server.
#[derive(Debug, Clone)]
pub struct McpHttpServerConfig {
    pub addr: SocketAddr,
    pub stateful_mode: bool,
}

impl McpHttpServerConfig {
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            stateful_mode: true,
        }
    }

    #[must_use]
    pub const fn with_stateful_mode(mut self, stateful_mode: bool) -> Self {
        self.stateful_mode = stateful_mode;
        self
    }
}

fn health_body(registry: &StoreRegistry) -> Value {
    json!({
        "status": "ok",
        "stores": registry.len(),
        "default_store": registry.default_alias(),
    })
}

/// Serves the MCP server over stdio.
///
/// # Errors
/// Returns any transport or server error.
pub async fn serve_stdio(
    registry: Arc<StoreRegistry>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let service = ShopMcp::with_registry(registry);
    let (stdin, stdout) = stdio();
    info!("shop-mcp serving over stdio");
    let running = serve_server(service, (stdin, stdout)).await?;
    let _ = running.waiting().await?;
    Ok(())
}

/// Serves the MCP server using streamable HTTP transport.
///
/// # Errors
/// Returns any listener or server error.
pub async fn serve_streamable_http(
    registry: Arc<StoreRegistry>,
    config: McpHttpServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let service_registry = registry.clone();
    let service: StreamableHttpService<ShopMcp, LocalSessionManager> =
        StreamableHttpService::new(
            move || Ok(ShopMcp::with_registry(service_registry.clone())),
            Arc::new(LocalSessionManager::default()),
            StreamableHttpServerConfig {
                sse_keep_alive: Some(SSE_KEEP_ALIVE),
                sse_retry: Some(SSE_RETRY),
                stateful_mode: config.stateful_mode,
                ..Default::default()
            },
        );

    let health_registry = registry.clone();
    let app = Router::new()
        .route(
            "/health",
            get(move || async move { Json(health_body(&health_registry)) }),
        )
        .nest_service("/mcp", service);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, stores = registry.len(), "shop-mcp listening on streamable HTTP");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_core::models::StoreConfig;

    #[test]
    fn http_config_is_stateful_unless_disabled() {
        let addr: SocketAddr = "127.0.0.1:4020".parse().expect("valid socket address");
        let config = McpHttpServerConfig::new(addr);
        assert!(config.stateful_mode);

        let config = config.with_stateful_mode(false);
        assert!(!config.stateful_mode);
        assert_eq!(config.addr, addr);
    }

    #[test]
    fn health_reports_configured_stores() {
        let mut registry = StoreRegistry::new();
        assert_eq!(
            health_body(&registry),
            json!({ "status": "ok", "stores": 0, "default_store": null })
        );

        registry.register("Main", StoreConfig::new("main.myshopify.com", "shpat_test"));
        assert_eq!(
            health_body(&registry),
            json!({ "status": "ok", "stores": 1, "default_store": "main" })
        );
    }
}
