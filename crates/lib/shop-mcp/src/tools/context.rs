use rmcp::{
    ErrorData,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::ShopMcp;

/// Payload listing the MCP commands this server exposes.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HelpCommands {
    pub commands: Vec<String>,
}

impl Default for HelpCommands {
    fn default() -> Self {
        Self {
            commands: [
                "help - List the MCP commands exposed by this server.",
                "health - Health check. Returns 'ok'.",
                "list_stores - List configured store aliases and the default store.",
                "get_products - List products, optionally filtered by title.",
                "get_product_by_id - Fetch a single product with variants and collections.",
                "create_product - Create a product.",
                "get_customers - List customers, optionally filtered by a search query.",
                "update_customer - Update customer contact details, tags, or note.",
                "get_customer_orders - List orders placed by a customer.",
                "get_orders - List recent orders, optionally filtered by status.",
                "get_order_by_id - Fetch a single order with line items.",
                "update_order - Update order tags, email, or note.",
                "All store-bound commands accept an optional `store` alias; the default store is used when it is omitted.",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

#[tool_router(router = tool_router_context, vis = "pub")]
impl ShopMcp {
    #[tool(description = "List the MCP commands exposed by this server.")]
    async fn help(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::json(HelpCommands::default())?]))
    }
}
