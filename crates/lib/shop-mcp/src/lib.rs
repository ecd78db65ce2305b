//! MCP server implementation for shop-mcp.
//!
//! This crate wires the store registry into rmcp tool handlers. Every tool
//! takes an optional `store` alias, resolves a client through the registry,
//! issues one GraphQL request, and returns a reshaped JSON result.

mod helpers;
mod tools;
pub mod server;

use std::sync::Arc;

use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, Content, ErrorCode, ServerCapabilities, ServerInfo};
use shop_core::client::ShopClient;
use shop_core::models::StoreInfo;
use shop_core::registry::{RegistryError, StoreRegistry};

const SERVER_INSTRUCTIONS: &str = r"shop-mcp exposes Shopify Admin GraphQL operations for one or more configured stores.

Workflow:
1. Call `list_stores` to see the configured store aliases and which one is the default.
2. Pass `store` (case-insensitive alias) to any tool to target a specific store. When omitted, the
   default store is used. A default exists when one is configured explicitly or when exactly one
   store is configured.
3. Products: `get_products`, `get_product_by_id`, `create_product`.
4. Customers: `get_customers`, `update_customer`, `get_customer_orders`.
5. Orders: `get_orders`, `get_order_by_id`, `update_order`.

Notes:
- Ids may be numeric (`123`) or full GIDs (`gid://shopify/Product/123`).
- `limit` defaults to 10 and is capped at 250.
- Every result includes the resolved `store` alias.
- Use `help` for a summary of all tools. `health` returns `ok`.";

/// MCP server wrapper around the store registry and tool routers.
#[derive(Clone)]
pub struct ShopMcp {
    tool_router: ToolRouter<Self>,
    registry: Arc<StoreRegistry>,
}

impl ShopMcp {
    /// Creates a new server using a registry by value.
    #[must_use]
    pub fn new(registry: StoreRegistry) -> Self {
        Self::with_registry(Arc::new(registry))
    }

    /// Creates a new server using a shared registry handle.
    #[must_use]
    pub fn with_registry(registry: Arc<StoreRegistry>) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_stores()
            + Self::tool_router_products()
            + Self::tool_router_customers()
            + Self::tool_router_orders()
            + Self::tool_router_context();
        Self {
            tool_router,
            registry,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    /// Resolves the client and store description for an optional alias.
    pub(crate) fn store_client(
        &self,
        store: Option<&str>,
    ) -> Result<(Arc<ShopClient>, StoreInfo), ErrorData> {
        let info = self.registry.store_info(store).map_err(map_registry_err)?;
        let client = self
            .registry
            .client(Some(info.alias.as_str()))
            .map_err(map_registry_err)?;
        Ok((client, info))
    }
}

fn map_registry_err(err: RegistryError) -> ErrorData {
    let code = match err {
        RegistryError::NotFound { .. } | RegistryError::NoDefault { .. } => {
            ErrorCode::INVALID_PARAMS
        }
        RegistryError::ClientBuild { .. } => ErrorCode::INTERNAL_ERROR,
    };
    helpers::mcp_err(code, err.to_string())
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl ShopMcp {
    #[tool(description = "Health check. Returns 'ok'.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text("ok")]))
    }
}

#[tool_handler]
impl ServerHandler for ShopMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
