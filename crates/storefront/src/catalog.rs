//! `CatalogStore` implementation over the Admin API: cursor-paginated
//! GraphQL listing, theme settings via the theme asset endpoint, and
//! per-product price/metafield mutations.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::debug;

use karat_core::adapters::{CatalogStore, MetafieldPatch, ProductFilter};
use karat_core::domain::product::ProductAttributes;
use karat_core::domain::rates::{ThemePatch, ThemeSettings};
use karat_core::errors::StoreError;

use crate::client::StorefrontClient;
use crate::parse;

const PAGE_SIZE: u32 = 50;
/// Breather between listing pages so a big catalog does not eat the whole
/// API bucket in one burst.
const PAGE_DELAY: Duration = Duration::from_millis(200);

const SETTINGS_ASSET_KEY: &str = "config/settings_data.json";

const PRODUCTS_QUERY: &str = r#"
query Products($first: Int!, $cursor: String, $query: String) {
  products(first: $first, after: $cursor, query: $query) {
    pageInfo {
      hasNextPage
      endCursor
    }
    edges {
      node {
        id
        handle
        title
        productType
        metafields(first: 50) {
          edges {
            node {
              namespace
              key
              value
            }
          }
        }
        variants(first: 1) {
          edges {
            node {
              id
              title
              price
              compareAtPrice
            }
          }
        }
      }
    }
  }
}
"#;

const VARIANT_PRICE_MUTATION: &str = r#"
mutation UpdateVariantPrice($input: ProductVariantInput!) {
  productVariantUpdate(input: $input) {
    productVariant {
      id
    }
    userErrors {
      field
      message
    }
  }
}
"#;

const PRODUCT_METAFIELDS_MUTATION: &str = r#"
mutation UpdateProductMetafields($input: ProductInput!) {
  productUpdate(input: $input) {
    product {
      id
    }
    userErrors {
      field
      message
    }
  }
}
"#;

#[async_trait]
impl CatalogStore for StorefrontClient {
    async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<ProductAttributes>, StoreError> {
        let handle_query = handle_query(filter);
        let mut products = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let variables = json!({
                "first": PAGE_SIZE,
                "cursor": cursor.as_deref(),
                "query": handle_query.as_deref(),
            });
            let data = self.graphql("products", PRODUCTS_QUERY, variables).await?;
            let connection = data
                .get("products")
                .ok_or_else(|| StoreError::Response("listing lacks `products`".to_string()))?;

            for edge in connection
                .pointer("/edges")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                let Some(node) = edge.get("node") else { continue };
                products.push(parse::product_from_node(node)?);
            }

            let has_next = connection
                .pointer("/pageInfo/hasNextPage")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !has_next {
                break;
            }
            cursor = connection
                .pointer("/pageInfo/endCursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            debug!(fetched = products.len(), "fetching next product page");
            tokio::time::sleep(PAGE_DELAY).await;
        }

        Ok(products)
    }

    async fn get_theme_settings(&self) -> Result<ThemeSettings, StoreError> {
        let document = self.read_settings_document().await?;
        let current = document.get("current").cloned().unwrap_or_else(|| json!({}));
        Ok(parse::theme_settings_from_value(&current))
    }

    async fn write_theme_settings(&self, patch: &ThemePatch) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Ok(());
        }

        let theme_id = self.resolve_theme_id().await?;
        let mut document = self.read_settings_document().await?;
        let current = document
            .as_object_mut()
            .ok_or_else(|| StoreError::Response("settings document is not an object".to_string()))?
            .entry("current")
            .or_insert_with(|| json!({}));
        let current = current.as_object_mut().ok_or_else(|| {
            StoreError::Response("settings `current` section is not an object".to_string())
        })?;

        if let Some(gold_rate) = patch.gold_rate {
            current.insert("gold_rate".to_string(), Value::String(gold_rate.to_string()));
        }
        if let Some(silver_rate) = patch.silver_rate {
            current.insert("silver_rate".to_string(), Value::String(silver_rate.to_string()));
        }
        for (slot, price) in &patch.diamond_slot_prices {
            current.insert(
                format!("diamond_{slot}_price_per_carat"),
                Value::String(price.to_string()),
            );
        }

        let serialized = serde_json::to_string_pretty(&document)
            .map_err(|error| StoreError::Response(format!("settings serialization: {error}")))?;
        let body = json!({
            "asset": {
                "key": SETTINGS_ASSET_KEY,
                "value": serialized,
            }
        });
        self.rest_put("theme settings write", &format!("themes/{theme_id}/assets.json"), &body)
            .await?;
        Ok(())
    }

    async fn write_product_price(
        &self,
        product: &ProductAttributes,
        price: Decimal,
        compare_at: Decimal,
        metafields: &[MetafieldPatch],
    ) -> Result<(), StoreError> {
        let variables = json!({
            "input": {
                "id": product.variant_id.0,
                "price": price.to_string(),
                "compareAtPrice": compare_at.to_string(),
            }
        });
        let data = self.graphql("variant price update", VARIANT_PRICE_MUTATION, variables).await?;
        reject_user_errors("productVariantUpdate", &data)?;

        if metafields.is_empty() {
            return Ok(());
        }
        let metafield_inputs: Vec<Value> = metafields
            .iter()
            .map(|patch| {
                json!({
                    "namespace": patch.namespace,
                    "key": patch.key,
                    "value": patch.value,
                    "type": patch.value_type,
                })
            })
            .collect();
        let variables = json!({
            "input": {
                "id": product.id.0,
                "metafields": metafield_inputs,
            }
        });
        let data = self
            .graphql("product metafield update", PRODUCT_METAFIELDS_MUTATION, variables)
            .await?;
        reject_user_errors("productUpdate", &data)
    }
}

impl StorefrontClient {
    async fn resolve_theme_id(&self) -> Result<u64, StoreError> {
        if let Some(theme_id) = self.theme_id {
            return Ok(theme_id);
        }

        let body = self.rest_get("theme listing", "themes.json", &[]).await?;
        body.pointer("/themes")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|theme| theme.get("role").and_then(Value::as_str) == Some("main"))
            .and_then(|theme| theme.get("id").and_then(Value::as_u64))
            .ok_or_else(|| StoreError::Response("no main theme found".to_string()))
    }

    async fn read_settings_document(&self) -> Result<Value, StoreError> {
        let theme_id = self.resolve_theme_id().await?;
        let body = self
            .rest_get(
                "theme settings read",
                &format!("themes/{theme_id}/assets.json"),
                &[("asset[key]", SETTINGS_ASSET_KEY)],
            )
            .await?;
        let raw = body
            .pointer("/asset/value")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Response("settings asset has no value".to_string()))?;
        serde_json::from_str(raw)
            .map_err(|error| StoreError::Response(format!("settings asset is not JSON: {error}")))
    }
}

/// Narrow a listing to specific handles with the Admin search syntax.
fn handle_query(filter: &ProductFilter) -> Option<String> {
    if filter.handles.is_empty() {
        return None;
    }
    Some(
        filter
            .handles
            .iter()
            .map(|handle| format!("handle:{handle}"))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}

/// A 200 response can still carry per-mutation `userErrors`; those are
/// write rejections, not transport problems.
fn reject_user_errors(mutation: &str, data: &Value) -> Result<(), StoreError> {
    let errors = data
        .pointer(&format!("/{mutation}/userErrors"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(|error| error.get("message").and_then(Value::as_str))
        .collect::<Vec<_>>();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(StoreError::RemoteWrite(format!("{mutation}: {}", errors.join("; "))))
    }
}
