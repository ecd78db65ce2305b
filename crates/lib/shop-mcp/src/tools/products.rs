use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{ShopMcp, helpers};

const PRODUCT_FIELDS: &str = r"
    id
    title
    description
    handle
    status
    vendor
    productType
    tags
    createdAt
    updatedAt
    totalInventory
    priceRangeV2 {
      minVariantPrice { amount currencyCode }
      maxVariantPrice { amount currencyCode }
    }
    images(first: 1) {
      edges { node { url altText } }
    }
    variants(first: 20) {
      edges { node { id title price inventoryQuantity sku } }
    }
";

/// Parameters for listing products.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetProductsParams {
    pub store: Option<String>,
    pub search_title: Option<String>,
    pub limit: Option<u32>,
}

/// Parameters for fetching one product.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetProductByIdParams {
    pub store: Option<String>,
    pub product_id: String,
}

/// Publication status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductStatus {
    Active,
    Draft,
    Archived,
}

/// Parameters for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateProductParams {
    pub store: Option<String>,
    pub title: String,
    pub description_html: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<ProductStatus>,
}

impl CreateProductParams {
    fn product_input(&self) -> Value {
        let mut input = Map::new();
        input.insert("title".to_string(), json!(self.title.trim()));
        if let Some(description) = &self.description_html {
            input.insert("descriptionHtml".to_string(), json!(description));
        }
        if let Some(vendor) = &self.vendor {
            input.insert("vendor".to_string(), json!(vendor));
        }
        if let Some(product_type) = &self.product_type {
            input.insert("productType".to_string(), json!(product_type));
        }
        if let Some(tags) = &self.tags {
            input.insert("tags".to_string(), json!(tags));
        }
        if let Some(status) = self.status {
            input.insert("status".to_string(), json!(status));
        }
        Value::Object(input)
    }
}

/// Reshapes a product node: connections are flattened and the first image is
/// lifted to top-level fields.
fn format_product(node: &Value) -> Value {
    let image = helpers::edge_nodes(&node["images"]).into_iter().next();
    json!({
        "id": node["id"],
        "title": node["title"],
        "description": node["description"],
        "handle": node["handle"],
        "status": node["status"],
        "vendor": node["vendor"],
        "productType": node["productType"],
        "tags": node["tags"],
        "createdAt": node["createdAt"],
        "updatedAt": node["updatedAt"],
        "totalInventory": node["totalInventory"],
        "priceRange": {
            "minPrice": node["priceRangeV2"]["minVariantPrice"],
            "maxPrice": node["priceRangeV2"]["maxVariantPrice"],
        },
        "imageUrl": image.as_ref().map_or(Value::Null, |image| image["url"].clone()),
        "imageAltText": image.as_ref().map_or(Value::Null, |image| image["altText"].clone()),
        "variants": helpers::edge_nodes(&node["variants"]),
    })
}

#[tool_router(router = tool_router_products, vis = "pub")]
impl ShopMcp {
    #[tool(description = "List products, optionally filtered by title.")]
    async fn get_products(
        &self,
        Parameters(params): Parameters<GetProductsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (client, info) = self.store_client(params.store.as_deref())?;
        let query = format!(
            "query GetProducts($first: Int!, $query: String) {{
              products(first: $first, query: $query) {{ edges {{ node {{ {PRODUCT_FIELDS} }} }} }}
            }}"
        );
        let search = params
            .search_title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(|title| format!("title:*{title}*"));
        let variables = json!({ "first": helpers::page_size(params.limit), "query": search });

        let data = match client.execute(&query, variables).await {
            Ok(data) => data,
            Err(err) => return Ok(helpers::tool_failure("Failed to fetch products", err)),
        };
        let products: Vec<Value> = helpers::edge_nodes(&data["products"])
            .iter()
            .map(format_product)
            .collect();
        Ok(CallToolResult::success(vec![Content::json(json!({
            "store": info.alias,
            "products": products,
        }))?]))
    }

    #[tool(description = "Fetch a single product by id (numeric or GID).")]
    async fn get_product_by_id(
        &self,
        Parameters(params): Parameters<GetProductByIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (client, info) = self.store_client(params.store.as_deref())?;
        let product_id = helpers::to_gid("Product", &params.product_id);
        let query = format!(
            "query GetProductById($id: ID!) {{
              product(id: $id) {{
                {PRODUCT_FIELDS}
                collections(first: 10) {{ edges {{ node {{ id title handle }} }} }}
              }}
            }}"
        );

        let data = match client.execute(&query, json!({ "id": product_id })).await {
            Ok(data) => data,
            Err(err) => return Ok(helpers::tool_failure("Failed to fetch product", err)),
        };
        let node = &data["product"];
        if node.is_null() {
            return Ok(helpers::tool_failure(
                "Failed to fetch product",
                format!("product {product_id} not found"),
            ));
        }
        let mut product = format_product(node);
        product["collections"] = Value::Array(helpers::edge_nodes(&node["collections"]));
        Ok(CallToolResult::success(vec![Content::json(json!({
            "store": info.alias,
            "product": product,
        }))?]))
    }

    #[tool(description = "Create a product. Status defaults to the store's default (usually ACTIVE).")]
    async fn create_product(
        &self,
        Parameters(params): Parameters<CreateProductParams>,
    ) -> Result<CallToolResult, ErrorData> {
        if params.title.trim().is_empty() {
            return Err(helpers::mcp_err(
                rmcp::model::ErrorCode::INVALID_PARAMS,
                "title must not be empty",
            ));
        }
        let (client, info) = self.store_client(params.store.as_deref())?;
        let query = r"mutation CreateProduct($input: ProductInput!) {
          productCreate(input: $input) {
            product { id title handle status vendor productType tags descriptionHtml }
            userErrors { field message }
          }
        }";

        let data = match client
            .execute(query, json!({ "input": params.product_input() }))
            .await
        {
            Ok(data) => data,
            Err(err) => return Ok(helpers::tool_failure("Failed to create product", err)),
        };
        let payload = &data["productCreate"];
        if let Some(errors) = helpers::user_errors(payload) {
            return Ok(helpers::tool_failure("Failed to create product", errors));
        }
        Ok(CallToolResult::success(vec![Content::json(json!({
            "store": info.alias,
            "product": payload["product"],
        }))?]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_product_node() {
        let node = json!({
            "id": "gid://shopify/Product/1",
            "title": "Mug",
            "description": "Ceramic",
            "handle": "mug",
            "status": "ACTIVE",
            "totalInventory": 12,
            "priceRangeV2": {
                "minVariantPrice": { "amount": "9.00", "currencyCode": "USD" },
                "maxVariantPrice": { "amount": "12.00", "currencyCode": "USD" }
            },
            "images": { "edges": [{ "node": { "url": "https://cdn/mug.png", "altText": "A mug" } }] },
            "variants": { "edges": [{ "node": { "id": "gid://shopify/ProductVariant/2", "title": "Blue" } }] }
        });

        let product = format_product(&node);

        assert_eq!(product["priceRange"]["minPrice"]["amount"], "9.00");
        assert_eq!(product["imageUrl"], "https://cdn/mug.png");
        assert_eq!(product["imageAltText"], "A mug");
        assert_eq!(product["variants"][0]["title"], "Blue");
        assert_eq!(product["vendor"], Value::Null);
    }

    #[test]
    fn product_without_images_has_null_image_fields() {
        let product = format_product(&json!({ "id": "gid://shopify/Product/1", "images": { "edges": [] } }));
        assert_eq!(product["imageUrl"], Value::Null);
        assert_eq!(product["variants"], json!([]));
    }

    #[test]
    fn create_input_only_carries_supplied_fields() {
        let params = CreateProductParams {
            store: None,
            title: " Poster ".to_string(),
            description_html: None,
            vendor: Some("Acme".to_string()),
            product_type: None,
            tags: Some(vec!["print".to_string()]),
            status: Some(ProductStatus::Draft),
        };

        assert_eq!(
            params.product_input(),
            json!({ "title": "Poster", "vendor": "Acme", "tags": ["print"], "status": "DRAFT" })
        );
    }

    #[tokio::test]
    async fn unreachable_store_yields_fetch_error_result() {
        let server = helpers::unreachable_store_server();

        let result = server
            .get_products(Parameters(GetProductsParams {
                store: None,
                search_title: Some("mug".to_string()),
                limit: Some(5),
            }))
            .await
            .expect("transport failures are tool results");

        assert_eq!(result.is_error, Some(true));
        let text = helpers::result_text(&result);
        assert!(text.starts_with("Failed to fetch products: request failed"), "{text}");
        assert!(text.contains("https://127.0.0.1:1/admin/api/2023-07/graphql.json"));
    }

    #[tokio::test]
    async fn create_against_unreachable_store_is_error_result() {
        let server = helpers::unreachable_store_server();

        let result = server
            .create_product(Parameters(CreateProductParams {
                store: Some("LOCAL".to_string()),
                title: "Poster".to_string(),
                description_html: None,
                vendor: None,
                product_type: None,
                tags: None,
                status: None,
            }))
            .await
            .expect("transport failures are tool results");

        assert_eq!(result.is_error, Some(true));
        assert!(helpers::result_text(&result).starts_with("Failed to create product: "));
    }

    #[tokio::test]
    async fn unknown_store_is_a_protocol_error() {
        let server = helpers::unreachable_store_server();

        let err = server
            .get_product_by_id(Parameters(GetProductByIdParams {
                store: Some("elsewhere".to_string()),
                product_id: "1".to_string(),
            }))
            .await
            .expect_err("unknown alias is rejected before any request");

        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("available stores: local"));
    }
}
