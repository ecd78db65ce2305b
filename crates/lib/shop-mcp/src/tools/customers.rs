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

use crate::tools::orders::{ORDER_FIELDS, format_order};
use crate::{ShopMcp, helpers};

const CUSTOMER_FIELDS: &str = r"
    id
    firstName
    lastName
    email
    phone
    createdAt
    updatedAt
    tags
    note
    numberOfOrders
    amountSpent { amount currencyCode }
    defaultAddress {
      address1 address2 city provinceCode zip country phone
    }
";

/// Parameters for listing customers.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetCustomersParams {
    pub store: Option<String>,
    pub search_query: Option<String>,
    pub limit: Option<u32>,
}

/// Parameters for updating a customer. Omitted fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateCustomerParams {
    pub store: Option<String>,
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tags: Option<Vec<String>>,
    pub note: Option<String>,
}

impl UpdateCustomerParams {
    fn customer_input(&self) -> Value {
        let mut input = Map::new();
        input.insert("id".to_string(), json!(helpers::to_gid("Customer", &self.id)));
        let optional = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("note", &self.note),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                input.insert(key.to_string(), json!(value));
            }
        }
        if let Some(tags) = &self.tags {
            input.insert("tags".to_string(), json!(tags));
        }
        Value::Object(input)
    }
}

/// Parameters for listing one customer's orders.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetCustomerOrdersParams {
    pub store: Option<String>,
    pub customer_id: String,
    pub limit: Option<u32>,
}

#[tool_router(router = tool_router_customers, vis = "pub")]
impl ShopMcp {
    #[tool(description = "List customers, optionally filtered by a search query (name, email, tag...).")]
    async fn get_customers(
        &self,
        Parameters(params): Parameters<GetCustomersParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (client, info) = self.store_client(params.store.as_deref())?;
        let query = format!(
            "query GetCustomers($first: Int!, $query: String) {{
              customers(first: $first, query: $query) {{ edges {{ node {{ {CUSTOMER_FIELDS} }} }} }}
            }}"
        );
        let search = params
            .search_query
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let variables = json!({ "first": helpers::page_size(params.limit), "query": search });

        let data = match client.execute(&query, variables).await {
            Ok(data) => data,
            Err(err) => return Ok(helpers::tool_failure("Failed to fetch customers", err)),
        };
        Ok(CallToolResult::success(vec![Content::json(json!({
            "store": info.alias,
            "customers": helpers::edge_nodes(&data["customers"]),
        }))?]))
    }

    #[tool(description = "Update a customer's name, email, phone, tags, or note.")]
    async fn update_customer(
        &self,
        Parameters(params): Parameters<UpdateCustomerParams>,
    ) -> Result<CallToolResult, ErrorData> {
        if params.id.trim().is_empty() {
            return Err(helpers::mcp_err(ErrorCode::INVALID_PARAMS, "id must not be empty"));
        }
        let (client, info) = self.store_client(params.store.as_deref())?;
        let query = format!(
            "mutation UpdateCustomer($input: CustomerInput!) {{
              customerUpdate(input: $input) {{
                customer {{ {CUSTOMER_FIELDS} }}
                userErrors {{ field message }}
              }}
            }}"
        );

        let data = match client
            .execute(&query, json!({ "input": params.customer_input() }))
            .await
        {
            Ok(data) => data,
            Err(err) => return Ok(helpers::tool_failure("Failed to update customer", err)),
        };
        let payload = &data["customerUpdate"];
        if let Some(errors) = helpers::user_errors(payload) {
            return Ok(helpers::tool_failure("Failed to update customer", errors));
        }
        Ok(CallToolResult::success(vec![Content::json(json!({
            "store": info.alias,
            "customer": payload["customer"],
        }))?]))
    }

    #[tool(description = "List orders placed by a customer (numeric id or GID).")]
    async fn get_customer_orders(
        &self,
        Parameters(params): Parameters<GetCustomerOrdersParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let customer_id = helpers::numeric_id(&params.customer_id).to_string();
        if customer_id.is_empty() {
            return Err(helpers::mcp_err(
                ErrorCode::INVALID_PARAMS,
                "customer_id must not be empty",
            ));
        }
        let (client, info) = self.store_client(params.store.as_deref())?;
        let query = format!(
            "query GetCustomerOrders($first: Int!, $query: String) {{
              orders(first: $first, query: $query, sortKey: CREATED_AT, reverse: true) {{
                edges {{ node {{ {ORDER_FIELDS} }} }}
              }}
            }}"
        );
        let variables = json!({
            "first": helpers::page_size(params.limit),
            "query": format!("customer_id:{customer_id}"),
        });

        let data = match client.execute(&query, variables).await {
            Ok(data) => data,
            Err(err) => return Ok(helpers::tool_failure("Failed to fetch customer orders", err)),
        };
        let orders: Vec<Value> = helpers::edge_nodes(&data["orders"])
            .iter()
            .map(format_order)
            .collect();
        Ok(CallToolResult::success(vec![Content::json(json!({
            "store": info.alias,
            "customer_id": helpers::to_gid("Customer", &customer_id),
            "orders": orders,
        }))?]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_input_normalizes_id_and_skips_missing_fields() {
        let params = UpdateCustomerParams {
            store: Some("EU".to_string()),
            id: "123".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: None,
            email: None,
            phone: None,
            tags: Some(vec!["vip".to_string()]),
            note: Some(String::new()),
        };

        assert_eq!(
            params.customer_input(),
            json!({
                "id": "gid://shopify/Customer/123",
                "firstName": "Ada",
                "note": "",
                "tags": ["vip"],
            })
        );
    }

    #[tokio::test]
    async fn unreachable_store_yields_fetch_error_result() {
        let server = helpers::unreachable_store_server();

        let result = server
            .get_customers(Parameters(GetCustomersParams {
                store: None,
                search_query: None,
                limit: None,
            }))
            .await
            .expect("transport failures are tool results");

        assert_eq!(result.is_error, Some(true));
        let text = helpers::result_text(&result);
        assert!(text.starts_with("Failed to fetch customers: request failed"), "{text}");
    }

    #[tokio::test]
    async fn customer_orders_failure_names_the_operation() {
        let server = helpers::unreachable_store_server();

        let result = server
            .get_customer_orders(Parameters(GetCustomerOrdersParams {
                store: Some("local".to_string()),
                customer_id: "gid://shopify/Customer/7".to_string(),
                limit: Some(3),
            }))
            .await
            .expect("transport failures are tool results");

        assert_eq!(result.is_error, Some(true));
        assert!(helpers::result_text(&result).starts_with("Failed to fetch customer orders: "));
    }
}
