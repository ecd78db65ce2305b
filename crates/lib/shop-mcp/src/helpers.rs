use std::borrow::Cow;
use std::fmt::Display;

use rmcp::ErrorData;
use rmcp::model::{CallToolResult, Content, ErrorCode};
use serde_json::Value;
use tracing::warn;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 250;

pub fn mcp_err(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> ErrorData {
    ErrorData {
        code,
        message: message.into(),
        data: None,
    }
}

/// Wraps a failed store call as an error result for the caller.
pub fn tool_failure(context: &str, err: impl Display) -> CallToolResult {
    let message = format!("{context}: {err}");
    warn!("{message}");
    CallToolResult::error(vec![Content::text(message)])
}

pub fn page_size(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Expands a bare numeric id into a `gid://shopify/{kind}/{id}` global id.
pub fn to_gid(kind: &str, id: &str) -> String {
    let id = id.trim();
    if id.starts_with("gid://") {
        id.to_string()
    } else {
        format!("gid://shopify/{kind}/{id}")
    }
}

/// Last path segment of a global id, or the input when it is already bare.
pub fn numeric_id(id: &str) -> &str {
    let id = id.trim();
    id.rsplit('/').next().unwrap_or(id)
}

/// Flattens a GraphQL connection (`{ edges: [{ node }] }`) into its nodes.
pub fn edge_nodes(connection: &Value) -> Vec<Value> {
    connection
        .get("edges")
        .and_then(Value::as_array)
        .map(|edges| {
            edges
                .iter()
                .filter_map(|edge| edge.get("node").cloned())
                .collect()
        })
        .unwrap_or_default()
}

/// Joins mutation `userErrors` into one message, if any were returned.
pub fn user_errors(payload: &Value) -> Option<String> {
    let errors = payload.get("userErrors").and_then(Value::as_array)?;
    if errors.is_empty() {
        return None;
    }
    let messages: Vec<String> = errors
        .iter()
        .map(|error| {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            match error.get("field").and_then(Value::as_array) {
                Some(field) if !field.is_empty() => {
                    let path: Vec<&str> = field.iter().filter_map(Value::as_str).collect();
                    format!("{}: {message}", path.join("."))
                }
                _ => message.to_string(),
            }
        })
        .collect();
    Some(messages.join("; "))
}

/// Reshapes a `MoneyBag` (`{ shopMoney { amount currencyCode } }`) into a
/// flat money object.
pub fn shop_money(money_bag: &Value) -> Value {
    money_bag.get("shopMoney").cloned().unwrap_or(Value::Null)
}

/// Server whose only store points at a closed local port, so every request
/// fails at the transport layer.
#[cfg(test)]
pub fn unreachable_store_server() -> crate::ShopMcp {
    let mut registry = shop_core::registry::StoreRegistry::new();
    registry.register(
        "local",
        shop_core::models::StoreConfig::new("127.0.0.1:1", "shpat_test"),
    );
    crate::ShopMcp::new(registry)
}

#[cfg(test)]
pub fn result_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|content| content.raw.as_text())
        .map(|text| text.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_size_defaults_and_clamps() {
        assert_eq!(page_size(None), DEFAULT_LIMIT);
        assert_eq!(page_size(Some(0)), 1);
        assert_eq!(page_size(Some(1000)), MAX_LIMIT);
        assert_eq!(page_size(Some(25)), 25);
    }

    #[test]
    fn gid_conversion() {
        assert_eq!(to_gid("Product", "42"), "gid://shopify/Product/42");
        assert_eq!(
            to_gid("Product", "gid://shopify/Product/42"),
            "gid://shopify/Product/42"
        );
        assert_eq!(numeric_id("gid://shopify/Customer/7"), "7");
        assert_eq!(numeric_id(" 7 "), "7");
    }

    #[test]
    fn flattens_connection_edges() {
        let connection = json!({ "edges": [{ "node": { "id": 1 } }, { "cursor": "x" }, { "node": { "id": 2 } }] });
        assert_eq!(edge_nodes(&connection), vec![json!({ "id": 1 }), json!({ "id": 2 })]);
        assert!(edge_nodes(&Value::Null).is_empty());
    }

    #[test]
    fn joins_user_errors_with_field_paths() {
        let payload = json!({
            "userErrors": [
                { "field": ["input", "email"], "message": "Email is invalid" },
                { "field": null, "message": "Customer is locked" }
            ]
        });
        assert_eq!(
            user_errors(&payload).as_deref(),
            Some("input.email: Email is invalid; Customer is locked")
        );
        assert_eq!(user_errors(&json!({ "userErrors": [] })), None);
    }

    #[test]
    fn failures_are_error_results() {
        let result = tool_failure("Failed to fetch orders", "request timed out");
        assert_eq!(result.is_error, Some(true));
        assert_eq!(result_text(&result), "Failed to fetch orders: request timed out");
    }
}
