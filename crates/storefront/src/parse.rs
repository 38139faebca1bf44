//! Pure parsing of Admin API payloads into domain types. Kept free of I/O
//! so the quirky metafield coercions stay unit-testable.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde_json::Value;

use karat_core::domain::product::{
    MaterialKind, ProductAttributes, ProductId, Purity, VariantId,
};
use karat_core::domain::rates::{DiamondSlot, ThemeSettings, MAX_DIAMOND_SLOTS};
use karat_core::errors::StoreError;

/// Flatten a GraphQL metafield connection into `namespace.key` -> value.
pub fn metafield_map(node: &Value) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    let Some(edges) = node.pointer("/metafields/edges").and_then(Value::as_array) else {
        return map;
    };
    for edge in edges {
        let Some(metafield) = edge.get("node") else { continue };
        let (Some(namespace), Some(key)) = (
            metafield.get("namespace").and_then(Value::as_str),
            metafield.get("key").and_then(Value::as_str),
        ) else {
            continue;
        };
        let value = metafield.get("value").and_then(Value::as_str).unwrap_or_default();
        map.insert(format!("{namespace}.{key}"), value.to_string());
    }
    map
}

/// Numeric metafield coercion: absent or unparseable values read as zero,
/// and a JSON array literal (`"[2.5]"`) contributes its first element.
pub fn decimal_field(map: &BTreeMap<String, String>, key: &str) -> Decimal {
    map.get(key).and_then(|raw| coerce_decimal(raw)).unwrap_or(Decimal::ZERO)
}

/// Like `decimal_field`, but absence (or the zero sentinel the store uses
/// for "unset") stays `None` so downstream code can tell "no fallback"
/// from "free stones".
pub fn optional_decimal_field(map: &BTreeMap<String, String>, key: &str) -> Option<Decimal> {
    map.get(key)
        .and_then(|raw| coerce_decimal(raw))
        .filter(|value| *value != Decimal::ZERO)
}

fn coerce_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('[') {
        let parsed: Value = serde_json::from_str(trimmed).ok()?;
        let first = parsed.as_array()?.first()?.clone();
        return match first {
            Value::Number(number) => Decimal::from_f64_retain(number.as_f64()?),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        };
    }
    trimmed.parse().ok()
}

/// Comma-separated stone labels, in declaration order, blanks dropped.
pub fn stone_types_field(map: &BTreeMap<String, String>) -> Vec<String> {
    map.get("custom.stone_types")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Build a `ProductAttributes` snapshot from one GraphQL product node.
/// The first variant is the pricing target; a product without any variant
/// cannot be priced and is a malformed listing.
pub fn product_from_node(node: &Value) -> Result<ProductAttributes, StoreError> {
    let id = required_str(node, "id")?;
    let handle = required_str(node, "handle")?;
    let title = node.get("title").and_then(Value::as_str).unwrap_or_default().to_string();
    let product_type = node.get("productType").and_then(Value::as_str).unwrap_or_default();

    let variant = node
        .pointer("/variants/edges/0/node")
        .ok_or_else(|| StoreError::Response(format!("product {handle} has no variants")))?;
    let variant_id = required_str(variant, "id")?;
    let variant_title = variant.get("title").and_then(Value::as_str).unwrap_or_default();
    let current_price = variant
        .get("price")
        .and_then(Value::as_str)
        .and_then(|raw| raw.trim().parse().ok())
        .ok_or_else(|| StoreError::Response(format!("product {handle} has no variant price")))?;
    let current_compare_at = variant
        .get("compareAtPrice")
        .and_then(Value::as_str)
        .and_then(|raw| raw.trim().parse().ok());

    let metafields = metafield_map(node);
    let material_text = format!("{product_type} {title} {variant_title}");

    Ok(ProductAttributes {
        id: ProductId(id),
        variant_id: VariantId(variant_id),
        handle,
        title,
        material: MaterialKind::detect(&material_text),
        purity: Purity::detect(&material_text),
        metal_weight_grams: decimal_field(&metafields, "custom.metal_weight"),
        stone_carats: decimal_field(&metafields, "custom.stone_carats"),
        stone_types: stone_types_field(&metafields),
        fallback_price_per_carat: optional_decimal_field(
            &metafields,
            "custom.stone_prices_per_carat",
        ),
        making_charge_pct: decimal_field(&metafields, "custom.making_charge_percentage"),
        discount_making_pct: decimal_field(&metafields, "custom.discount_making_charge"),
        hallmarking_charge: decimal_field(&metafields, "jhango.hallmarking"),
        certification_charge: decimal_field(&metafields, "jhango.certification"),
        current_price,
        current_compare_at,
    })
}

fn required_str(node: &Value, key: &str) -> Result<String, StoreError> {
    node.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Response(format!("product node is missing `{key}`")))
}

/// Parse the theme's `current` settings object. The diamond slot scan
/// mirrors the theme schema: numbered slots, stopping at the first one
/// without a name.
pub fn theme_settings_from_value(current: &Value) -> ThemeSettings {
    let mut slots = Vec::new();
    for index in 1..=MAX_DIAMOND_SLOTS {
        let name = current
            .get(format!("diamond_{index}_name"))
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if name.is_empty() {
            break;
        }
        let price_per_carat = current
            .get(format!("diamond_{index}_price_per_carat"))
            .and_then(decimal_setting)
            .unwrap_or(Decimal::ZERO);
        slots.push(DiamondSlot { name: name.to_string(), price_per_carat });
    }

    ThemeSettings {
        gold_rate: current.get("gold_rate").and_then(decimal_setting),
        silver_rate: current.get("silver_rate").and_then(decimal_setting),
        gst_pct: current.get("gst_percentage").and_then(decimal_setting),
        diamond_slots: slots,
    }
}

/// Theme setting values arrive as numbers or numeric strings depending on
/// how the theme editor saved them.
pub fn decimal_setting(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => Decimal::from_f64_retain(number.as_f64()?),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{
        decimal_field, metafield_map, optional_decimal_field, product_from_node,
        theme_settings_from_value,
    };
    use karat_core::domain::product::{MaterialKind, Purity};

    fn dec(raw: &str) -> Decimal {
        raw.parse().expect("decimal literal")
    }

    fn product_node() -> serde_json::Value {
        json!({
            "id": "gid://shopify/Product/7001",
            "handle": "heritage-ring",
            "title": "Heritage Ring",
            "productType": "Gold Jewellery",
            "metafields": { "edges": [
                { "node": { "namespace": "custom", "key": "metal_weight", "value": "10" } },
                { "node": { "namespace": "custom", "key": "stone_carats", "value": "[0.5]" } },
                { "node": { "namespace": "custom", "key": "stone_types", "value": "Lab Grown, Natural" } },
                { "node": { "namespace": "custom", "key": "making_charge_percentage", "value": "10" } },
                { "node": { "namespace": "custom", "key": "discount_making_charge", "value": "5" } },
                { "node": { "namespace": "jhango", "key": "hallmarking", "value": "200" } },
                { "node": { "namespace": "jhango", "key": "certification", "value": "150" } }
            ]},
            "variants": { "edges": [
                { "node": {
                    "id": "gid://shopify/ProductVariant/9001",
                    "title": "22KT / 6",
                    "price": "81885.00",
                    "compareAtPrice": "102356.25"
                } }
            ]}
        })
    }

    #[test]
    fn product_node_parses_into_attributes() {
        let attrs = product_from_node(&product_node()).expect("parse");

        assert_eq!(attrs.handle, "heritage-ring");
        assert_eq!(attrs.material, Some(MaterialKind::Gold));
        assert_eq!(attrs.purity, Some(Purity::K22));
        assert_eq!(attrs.metal_weight_grams, dec("10"));
        assert_eq!(attrs.stone_carats, dec("0.5"));
        assert_eq!(attrs.stone_types, vec!["Lab Grown".to_string(), "Natural".to_string()]);
        assert_eq!(attrs.fallback_price_per_carat, None);
        assert_eq!(attrs.current_price, dec("81885.00"));
        assert_eq!(attrs.current_compare_at, Some(dec("102356.25")));
    }

    #[test]
    fn missing_numeric_metafields_read_as_zero() {
        let map = metafield_map(&json!({ "metafields": { "edges": [] } }));
        assert_eq!(decimal_field(&map, "custom.metal_weight"), Decimal::ZERO);
        assert_eq!(optional_decimal_field(&map, "custom.stone_prices_per_carat"), None);
    }

    #[test]
    fn zero_fallback_price_reads_as_unset() {
        let node = json!({ "metafields": { "edges": [
            { "node": { "namespace": "custom", "key": "stone_prices_per_carat", "value": "0" } }
        ]}});
        let map = metafield_map(&node);
        assert_eq!(optional_decimal_field(&map, "custom.stone_prices_per_carat"), None);
    }

    #[test]
    fn array_metafield_values_take_the_first_element() {
        let node = json!({ "metafields": { "edges": [
            { "node": { "namespace": "custom", "key": "metal_weight", "value": "[2.5, 3.0]" } },
            { "node": { "namespace": "custom", "key": "stone_carats", "value": "[\"0.75\"]" } }
        ]}});
        let map = metafield_map(&node);
        assert_eq!(decimal_field(&map, "custom.metal_weight"), dec("2.5"));
        assert_eq!(decimal_field(&map, "custom.stone_carats"), dec("0.75"));
    }

    #[test]
    fn unparseable_metafields_read_as_zero() {
        let node = json!({ "metafields": { "edges": [
            { "node": { "namespace": "custom", "key": "metal_weight", "value": "n/a" } }
        ]}});
        let map = metafield_map(&node);
        assert_eq!(decimal_field(&map, "custom.metal_weight"), Decimal::ZERO);
    }

    #[test]
    fn product_without_variants_is_a_malformed_listing() {
        let node = json!({
            "id": "gid://shopify/Product/1",
            "handle": "broken",
            "variants": { "edges": [] }
        });
        assert!(product_from_node(&node).is_err());
    }

    #[test]
    fn theme_settings_parse_rates_and_slots() {
        let current = json!({
            "gold_rate": 7000,
            "silver_rate": "90.5",
            "gst_percentage": 3,
            "diamond_1_name": "Natural",
            "diamond_1_price_per_carat": 50000,
            "diamond_2_name": "Lab Grown",
            "diamond_2_price_per_carat": "15000",
            "diamond_3_name": "",
            "diamond_3_price_per_carat": 99999,
            "diamond_4_name": "Never Reached",
            "diamond_4_price_per_carat": 1
        });

        let theme = theme_settings_from_value(&current);
        assert_eq!(theme.gold_rate, Some(dec("7000")));
        assert_eq!(theme.silver_rate, Some(dec("90.5")));
        assert_eq!(theme.gst_pct, Some(dec("3")));
        // The scan stops at the first empty slot name.
        assert_eq!(theme.diamond_slots.len(), 2);
        assert_eq!(theme.diamond_slots[1].name, "Lab Grown");
        assert_eq!(theme.diamond_slots[1].price_per_carat, dec("15000"));
    }

    #[test]
    fn absent_theme_rates_stay_none() {
        let theme = theme_settings_from_value(&json!({}));
        assert_eq!(theme.gold_rate, None);
        assert_eq!(theme.silver_rate, None);
        assert!(theme.diamond_slots.is_empty());
    }
}
