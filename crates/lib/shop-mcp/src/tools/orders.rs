use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content, ErrorCode},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{ShopMcp, helpers};

pub const ORDER_FIELDS: &str = r"
    id
    name
    createdAt
    displayFinancialStatus
    displayFulfillmentStatus
    email
    tags
    note
    totalPriceSet { shopMoney { amount currencyCode } }
    subtotalPriceSet { shopMoney { amount currencyCode } }
    totalShippingPriceSet { shopMoney { amount currencyCode } }
    totalTaxSet { shopMoney { amount currencyCode } }
    customer { id firstName lastName email }
    shippingAddress {
      address1 address2 city provinceCode zip country phone
    }
    lineItems(first: 20) {
      edges {
        node {
          id
          title
          quantity
          originalTotalSet { shopMoney { amount currencyCode } }
          variant { id title sku }
        }
      }
    }
";

/// Order status filter accepted by `get_orders`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Any,
    Open,
    Closed,
    Cancelled,
}

impl OrderStatus {
    const fn search_query(self) -> Option<&'static str> {
        match self {
            Self::Any => None,
            Self::Open => Some("status:open"),
            Self::Closed => Some("status:closed"),
            Self::Cancelled => Some("status:cancelled"),
        }
    }
}

/// Parameters for listing orders.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetOrdersParams {
    pub store: Option<String>,
    pub status: Option<OrderStatus>,
    pub limit: Option<u32>,
}

/// Parameters for fetching one order.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetOrderByIdParams {
    pub store: Option<String>,
    pub order_id: String,
}

/// Parameters for updating an order. Omitted fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateOrderParams {
    pub store: Option<String>,
    pub id: String,
    pub tags: Option<Vec<String>>,
    pub email: Option<String>,
    pub note: Option<String>,
}

impl UpdateOrderParams {
    fn order_input(&self) -> Value {
        let mut input = Map::new();
        input.insert("id".to_string(), json!(helpers::to_gid("Order", &self.id)));
        if let Some(tags) = &self.tags {
            input.insert("tags".to_string(), json!(tags));
        }
        if let Some(email) = &self.email {
            input.insert("email".to_string(), json!(email));
        }
        if let Some(note) = &self.note {
            input.insert("note".to_string(), json!(note));
        }
        Value::Object(input)
    }
}

/// Reshapes an order node: money bags become flat money objects and line
/// items are flattened.
pub fn format_order(node: &Value) -> Value {
    let line_items: Vec<Value> = helpers::edge_nodes(&node["lineItems"])
        .into_iter()
        .map(|item| {
            json!({
                "id": item["id"],
                "title": item["title"],
                "quantity": item["quantity"],
                "originalTotal": helpers::shop_money(&item["originalTotalSet"]),
                "variant": item["variant"],
            })
        })
        .collect();

    json!({
        "id": node["id"],
        "name": node["name"],
        "createdAt": node["createdAt"],
        "financialStatus": node["displayFinancialStatus"],
        "fulfillmentStatus": node["displayFulfillmentStatus"],
        "email": node["email"],
        "tags": node["tags"],
        "note": node["note"],
        "totalPrice": helpers::shop_money(&node["totalPriceSet"]),
        "subtotalPrice": helpers::shop_money(&node["subtotalPriceSet"]),
        "totalShippingPrice": helpers::shop_money(&node["totalShippingPriceSet"]),
        "totalTax": helpers::shop_money(&node["totalTaxSet"]),
        "customer": node["customer"],
        "shippingAddress": node["shippingAddress"],
        "lineItems": line_items,
    })
}

#[tool_router(router = tool_router_orders, vis = "pub")]
impl ShopMcp {
    #[tool(description = "List recent orders, optionally filtered by status (any, open, closed, cancelled).")]
    async fn get_orders(
        &self,
        Parameters(params): Parameters<GetOrdersParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (client, info) = self.store_client(params.store.as_deref())?;
        let query = format!(
            "query GetOrders($first: Int!, $query: String) {{
              orders(first: $first, query: $query, sortKey: CREATED_AT, reverse: true) {{
                edges {{ node {{ {ORDER_FIELDS} }} }}
              }}
            }}"
        );
        let status = params.status.unwrap_or_default();
        let variables = json!({
            "first": helpers::page_size(params.limit),
            "query": status.search_query(),
        });

        let data = match client.execute(&query, variables).await {
            Ok(data) => data,
            Err(err) => return Ok(helpers::tool_failure("Failed to fetch orders", err)),
        };
        let orders: Vec<Value> = helpers::edge_nodes(&data["orders"])
            .iter()
            .map(format_order)
            .collect();
        Ok(CallToolResult::success(vec![Content::json(json!({
            "store": info.alias,
            "orders": orders,
        }))?]))
    }

    #[tool(description = "Fetch a single order by id (numeric or GID).")]
    async fn get_order_by_id(
        &self,
        Parameters(params): Parameters<GetOrderByIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (client, info) = self.store_client(params.store.as_deref())?;
        let order_id = helpers::to_gid("Order", &params.order_id);
        let query = format!(
            "query GetOrderById($id: ID!) {{
              order(id: $id) {{ {ORDER_FIELDS} }}
            }}"
        );

        let data = match client.execute(&query, json!({ "id": order_id })).await {
            Ok(data) => data,
            Err(err) => return Ok(helpers::tool_failure("Failed to fetch order", err)),
        };
        let node = &data["order"];
        if node.is_null() {
            return Ok(helpers::tool_failure(
                "Failed to fetch order",
                format!("order {order_id} not found"),
            ));
        }
        Ok(CallToolResult::success(vec![Content::json(json!({
            "store": info.alias,
            "order": format_order(node),
        }))?]))
    }

    #[tool(description = "Update an order's tags, email, or note.")]
    async fn update_order(
        &self,
        Parameters(params): Parameters<UpdateOrderParams>,
    ) -> Result<CallToolResult, ErrorData> {
        if params.id.trim().is_empty() {
            return Err(helpers::mcp_err(ErrorCode::INVALID_PARAMS, "id must not be empty"));
        }
        let (client, info) = self.store_client(params.store.as_deref())?;
        let query = r"mutation UpdateOrder($input: OrderInput!) {
          orderUpdate(input: $input) {
            order { id name email note tags }
            userErrors { field message }
          }
        }";

        let data = match client
            .execute(query, json!({ "input": params.order_input() }))
            .await
        {
            Ok(data) => data,
            Err(err) => return Ok(helpers::tool_failure("Failed to update order", err)),
        };
        let payload = &data["orderUpdate"];
        if let Some(errors) = helpers::user_errors(payload) {
            return Ok(helpers::tool_failure("Failed to update order", errors));
        }
        Ok(CallToolResult::success(vec![Content::json(json!({
            "store": info.alias,
            "order": payload["order"],
        }))?]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_maps_to_search_query() {
        assert_eq!(OrderStatus::Any.search_query(), None);
        assert_eq!(OrderStatus::Open.search_query(), Some("status:open"));
        let parsed: OrderStatus = serde_json::from_value(json!("cancelled")).expect("lowercase");
        assert_eq!(parsed, OrderStatus::Cancelled);
    }

    #[test]
    fn formats_order_money_and_line_items() {
        let node = json!({
            "id": "gid://shopify/Order/9",
            "name": "#1009",
            "displayFinancialStatus": "PAID",
            "totalPriceSet": { "shopMoney": { "amount": "30.00", "currencyCode": "EUR" } },
            "lineItems": { "edges": [{ "node": {
                "id": "gid://shopify/LineItem/1",
                "title": "Mug",
                "quantity": 2,
                "originalTotalSet": { "shopMoney": { "amount": "24.00", "currencyCode": "EUR" } }
            } }] }
        });

        let order = format_order(&node);

        assert_eq!(order["financialStatus"], "PAID");
        assert_eq!(order["totalPrice"], json!({ "amount": "30.00", "currencyCode": "EUR" }));
        assert_eq!(order["totalTax"], Value::Null);
        assert_eq!(order["lineItems"][0]["originalTotal"]["amount"], "24.00");
        assert_eq!(order["lineItems"][0]["quantity"], 2);
    }

    #[test]
    fn update_input_uses_order_gid() {
        let params = UpdateOrderParams {
            store: None,
            id: "gid://shopify/Order/9".to_string(),
            tags: None,
            email: None,
            note: Some("gift wrap".to_string()),
        };
        assert_eq!(
            params.order_input(),
            json!({ "id": "gid://shopify/Order/9", "note": "gift wrap" })
        );
    }

    #[tokio::test]
    async fn unreachable_store_yields_fetch_error_result() {
        let server = helpers::unreachable_store_server();

        let result = server
            .get_orders(Parameters(GetOrdersParams {
                store: None,
                status: Some(OrderStatus::Open),
                limit: None,
            }))
            .await
            .expect("transport failures are tool results");

        assert_eq!(result.is_error, Some(true));
        let text = helpers::result_text(&result);
        assert!(text.starts_with("Failed to fetch orders: request failed"), "{text}");
    }

    #[tokio::test]
    async fn update_against_unreachable_store_is_error_result() {
        let server = helpers::unreachable_store_server();

        let result = server
            .update_order(Parameters(UpdateOrderParams {
                store: None,
                id: "9".to_string(),
                tags: Some(vec!["gift".to_string()]),
                email: None,
                note: None,
            }))
            .await
            .expect("transport failures are tool results");

        assert_eq!(result.is_error, Some(true));
        assert!(helpers::result_text(&result).starts_with("Failed to update order: "));
    }

    #[tokio::test]
    async fn blank_order_id_is_rejected_before_any_request() {
        let server = helpers::unreachable_store_server();

        let err = server
            .update_order(Parameters(UpdateOrderParams {
                store: None,
                id: "  ".to_string(),
                tags: None,
                email: None,
                note: None,
            }))
            .await
            .expect_err("blank id is invalid");

        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }
}
