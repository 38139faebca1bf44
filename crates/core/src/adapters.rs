//! Boundary traits for the external collaborators: the storefront catalog
//! and the commodity rate provider. Implementations live in the
//! `karat-storefront` crate; tests substitute in-memory fakes.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::product::{MaterialKind, ProductAttributes};
use crate::domain::rates::{ThemePatch, ThemeSettings};
use crate::errors::{RateError, StoreError};

/// Narrowing applied when listing the catalog. An empty handle set means
/// the whole catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub handles: BTreeSet<String>,
}

impl ProductFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_handles(handles: BTreeSet<String>) -> Self {
        Self { handles }
    }
}

/// One namespaced key/value written alongside a price update, used for the
/// rate provenance tag on each product.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetafieldPatch {
    pub namespace: String,
    pub key: String,
    pub value: String,
    pub value_type: String,
}

impl MetafieldPatch {
    pub fn decimal(namespace: &str, key: &str, value: Decimal) -> Self {
        Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            value_type: "number_decimal".to_string(),
        }
    }
}

/// Read/write contract against the storefront catalog. Listing paginates
/// internally; callers always see the flattened result.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<ProductAttributes>, StoreError>;

    async fn get_theme_settings(&self) -> Result<ThemeSettings, StoreError>;

    async fn write_theme_settings(&self, patch: &ThemePatch) -> Result<(), StoreError>;

    async fn write_product_price(
        &self,
        product: &ProductAttributes,
        price: Decimal,
        compare_at: Decimal,
        metafields: &[MetafieldPatch],
    ) -> Result<(), StoreError>;
}

/// A fetched commodity rate with its source timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct RateQuote {
    pub rate_per_gram: Decimal,
    pub as_of: DateTime<Utc>,
}

/// Live commodity rate provider.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch(&self, metal: MaterialKind) -> Result<RateQuote, RateError>;
}
