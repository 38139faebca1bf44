//! Bulk price update orchestration.
//!
//! One `run` enumerates the selected products, prices each against a single
//! immutable rate snapshot, and writes changed prices back to the catalog.
//! Per-product problems never abort the run; they become `failed` outcomes
//! in the report. Only an unlistable catalog or a failed theme write (which
//! precedes every product write) is fatal.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::adapters::{CatalogStore, MetafieldPatch, ProductFilter};
use crate::domain::product::{MaterialKind, ProductAttributes};
use crate::domain::rates::{RateSnapshot, ThemePatch};
use crate::domain::report::{
    FailureKind, OutcomeFailure, OutcomeStatus, RunReport, UpdateOutcome,
};
use crate::errors::{PricingError, StoreError};
use crate::pricing::engine::{compute, PriceBreakdown};
use crate::pricing::stones::{resolve_price_per_carat, DiamondOverrideMap};

/// Namespace of the provenance metafields stamped on every updated product.
pub const PROVENANCE_NAMESPACE: &str = "jhango";

/// Which products a run touches. Exclusion always wins over inclusion; a
/// selection with neither set covers the full catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub include: BTreeSet<String>,
    pub exclude: BTreeSet<String>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(include: BTreeSet<String>, exclude: BTreeSet<String>) -> Self {
        Self { include, exclude }
    }

    /// True only for the untouched full-catalog selection. Theme settings
    /// may be written solely for such runs, so a partial run never leaves
    /// the theme's displayed rate out of step with untouched products.
    pub fn is_full(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn permits(&self, handle: &str) -> bool {
        if self.exclude.contains(handle) {
            return false;
        }
        self.include.is_empty() || self.include.contains(handle)
    }

    /// Parse an operator-supplied handle list, separated by commas or
    /// newlines, ignoring blanks.
    pub fn parse_handles(raw: &str) -> BTreeSet<String> {
        raw.split([',', '\n'])
            .map(str::trim)
            .filter(|handle| !handle.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("catalog listing failed: {0}")]
    Listing(#[source] StoreError),
    #[error("theme settings write failed: {0}")]
    ThemeWrite(#[source] StoreError),
}

/// Applies one rate snapshot across the catalog.
pub struct BulkUpdater {
    store: Arc<dyn CatalogStore>,
    stop: Arc<AtomicBool>,
}

impl BulkUpdater {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store, stop: Arc::new(AtomicBool::new(false)) }
    }

    /// Attach a cooperative stop flag. The updater finishes the in-flight
    /// product before honoring it.
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub async fn run(
        &self,
        mode: &str,
        selection: &Selection,
        rates: &RateSnapshot,
        overrides: Option<&DiamondOverrideMap>,
    ) -> Result<RunReport, UpdateError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, mode, full_catalog = selection.is_full(), "starting bulk price update");

        let filter = ProductFilter::for_handles(selection.include.clone());
        let products = self.store.list_products(&filter).await.map_err(UpdateError::Listing)?;
        let targets: Vec<&ProductAttributes> =
            products.iter().filter(|product| selection.permits(&product.handle)).collect();
        info!(listed = products.len(), selected = targets.len(), "catalog enumerated");

        if selection.is_full() {
            let patch = theme_patch_for(rates, overrides);
            self.store.write_theme_settings(&patch).await.map_err(UpdateError::ThemeWrite)?;
            info!(
                slot_updates = patch.diamond_slot_prices.len(),
                "theme settings updated for full-catalog run"
            );
        } else {
            info!("partial selection; theme settings left untouched");
        }

        let mut outcomes = Vec::with_capacity(targets.len());
        for (index, product) in targets.iter().enumerate() {
            if self.stop.load(Ordering::Relaxed) {
                warn!(
                    processed = index,
                    remaining = targets.len() - index,
                    "stop requested; ending run early"
                );
                break;
            }
            outcomes.push(self.process(product, rates, overrides).await);
        }

        let report = RunReport {
            run_id,
            mode: mode.to_string(),
            started_at,
            finished_at: Utc::now(),
            snapshot: rates.clone(),
            outcomes,
        };
        let counts = report.counts();
        info!(
            updated = counts.updated,
            skipped = counts.skipped,
            failed = counts.failed,
            "bulk price update finished"
        );
        Ok(report)
    }

    async fn process(
        &self,
        product: &ProductAttributes,
        rates: &RateSnapshot,
        overrides: Option<&DiamondOverrideMap>,
    ) -> UpdateOutcome {
        let breakdown = match price_product(product, rates, overrides) {
            Ok(breakdown) => breakdown,
            Err(error) => {
                warn!(handle = %product.handle, %error, "product cannot be priced");
                return failed_outcome(product, error.failure_kind(), error.to_string());
            }
        };

        if breakdown.total == product.current_price {
            return UpdateOutcome {
                product_id: product.id.clone(),
                handle: product.handle.clone(),
                title: product.title.clone(),
                old_price: product.current_price,
                new_price: Some(breakdown.total),
                compare_at: Some(breakdown.compare_at),
                status: OutcomeStatus::Skipped,
                failure: None,
            };
        }

        let metafields = provenance_metafields(product, rates);
        match self
            .store
            .write_product_price(product, breakdown.total, breakdown.compare_at, &metafields)
            .await
        {
            Ok(()) => {
                info!(
                    handle = %product.handle,
                    old_price = %product.current_price,
                    new_price = %breakdown.total,
                    compare_at = %breakdown.compare_at,
                    "price updated"
                );
                UpdateOutcome {
                    product_id: product.id.clone(),
                    handle: product.handle.clone(),
                    title: product.title.clone(),
                    old_price: product.current_price,
                    new_price: Some(breakdown.total),
                    compare_at: Some(breakdown.compare_at),
                    status: OutcomeStatus::Updated,
                    failure: None,
                }
            }
            Err(error) => {
                warn!(handle = %product.handle, %error, "price write failed");
                failed_outcome(product, FailureKind::RemoteWrite, error.to_string())
            }
        }
    }
}

/// Price one product, resolving the stone price first. Silver uses the
/// fixed lab-diamond rate from the snapshot, and stone-less gold products
/// never require a resolvable label.
fn price_product(
    product: &ProductAttributes,
    rates: &RateSnapshot,
    overrides: Option<&DiamondOverrideMap>,
) -> Result<PriceBreakdown, PricingError> {
    let material = product.material.ok_or(PricingError::UnknownMaterialKind)?;
    let stone_price_per_carat = match material {
        MaterialKind::Silver => Decimal::ZERO,
        MaterialKind::Gold if product.stone_carats > Decimal::ZERO => resolve_price_per_carat(
            &product.stone_types,
            rates,
            overrides,
            product.fallback_price_per_carat,
        )?,
        MaterialKind::Gold => Decimal::ZERO,
    };
    compute(product, rates, stone_price_per_carat)
}

/// The theme patch for a full-catalog run: both display rates, plus any
/// diamond slots whose names match a supplied override.
fn theme_patch_for(rates: &RateSnapshot, overrides: Option<&DiamondOverrideMap>) -> ThemePatch {
    let mut patch = ThemePatch {
        gold_rate: Some(rates.gold_rate_per_gram),
        silver_rate: Some(rates.silver_rate_per_gram),
        diamond_slot_prices: Vec::new(),
    };
    if let Some(overrides) = overrides {
        for (position, slot) in rates.diamond_slots.iter().enumerate() {
            if let Some(price) = overrides.get(&slot.name) {
                patch.diamond_slot_prices.push((position + 1, price));
            }
        }
    }
    patch
}

fn provenance_metafields(product: &ProductAttributes, rates: &RateSnapshot) -> Vec<MetafieldPatch> {
    match product.material {
        Some(material) => vec![MetafieldPatch::decimal(
            PROVENANCE_NAMESPACE,
            match material {
                MaterialKind::Gold => "gold_rate",
                MaterialKind::Silver => "silver_rate",
            },
            rates.rate_for(material),
        )],
        None => Vec::new(),
    }
}

fn failed_outcome(product: &ProductAttributes, kind: FailureKind, message: String) -> UpdateOutcome {
    UpdateOutcome {
        product_id: product.id.clone(),
        handle: product.handle.clone(),
        title: product.title.clone(),
        old_price: product.current_price,
        new_price: None,
        compare_at: None,
        status: OutcomeStatus::Failed,
        failure: Some(OutcomeFailure { kind, message }),
    }
}
