use rmcp::{
    ErrorData,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use shop_core::registry::StoreRegistry;

use crate::ShopMcp;

/// One configured store as reported to MCP clients.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoreListing {
    pub alias: String,
    pub domain: String,
    pub api_version: String,
    pub is_default: bool,
}

/// Payload for `list_stores`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoreListingResponse {
    pub stores: Vec<StoreListing>,
    pub default_store: Option<String>,
}

impl StoreListingResponse {
    fn from_registry(registry: &StoreRegistry) -> Self {
        let default_store = registry.default_alias().map(str::to_string);
        let stores = registry
            .list_stores()
            .into_iter()
            .map(|info| StoreListing {
                is_default: default_store.as_deref() == Some(info.alias.as_str()),
                alias: info.alias,
                domain: info.domain,
                api_version: info.api_version,
            })
            .collect();
        Self {
            stores,
            default_store,
        }
    }
}

#[tool_router(router = tool_router_stores, vis = "pub")]
impl ShopMcp {
    #[tool(description = "List configured store aliases, their domains, and which store is the default.")]
    async fn list_stores(&self) -> Result<CallToolResult, ErrorData> {
        let listing = StoreListingResponse::from_registry(self.registry());
        Ok(CallToolResult::success(vec![Content::json(listing)?]))
    }
}
