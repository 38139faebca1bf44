use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::PricingConfig;
use crate::domain::product::MaterialKind;
use crate::errors::RateError;
use crate::pricing::stones::normalize_label;

/// The storefront theme exposes at most this many named diamond slots.
pub const MAX_DIAMOND_SLOTS: usize = 20;

/// A named price-per-carat entry from the theme's diamond table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiamondSlot {
    pub name: String,
    pub price_per_carat: Decimal,
}

/// Market rates and theme-level pricing configuration captured once per run.
/// Every product priced during a run sees the same snapshot; it is never
/// mutated after composition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub gold_rate_per_gram: Decimal,
    pub silver_rate_per_gram: Decimal,
    pub gst_pct: Decimal,
    pub default_purity_factor: Decimal,
    pub silver_weight_multiplier: Decimal,
    pub lab_diamond_price_per_carat: Decimal,
    pub diamond_slots: Vec<DiamondSlot>,
    pub as_of: DateTime<Utc>,
}

impl RateSnapshot {
    /// Merge theme settings, pricing defaults and any explicitly supplied
    /// rates into a complete snapshot. A material with neither a supplied
    /// rate nor a theme rate makes the run impossible.
    pub fn compose(
        theme: &ThemeSettings,
        pricing: &PricingConfig,
        gold_rate: Option<Decimal>,
        silver_rate: Option<Decimal>,
        as_of: DateTime<Utc>,
    ) -> Result<Self, RateError> {
        let gold = gold_rate.or(theme.gold_rate).ok_or_else(|| RateError::Unavailable {
            metal: MaterialKind::Gold,
            reason: "no rate supplied and theme settings carry none".to_string(),
        })?;
        let silver = silver_rate.or(theme.silver_rate).ok_or_else(|| RateError::Unavailable {
            metal: MaterialKind::Silver,
            reason: "no rate supplied and theme settings carry none".to_string(),
        })?;

        Ok(Self {
            gold_rate_per_gram: gold,
            silver_rate_per_gram: silver,
            gst_pct: theme.gst_pct.unwrap_or(pricing.gst_pct_default),
            default_purity_factor: pricing.default_purity_factor,
            silver_weight_multiplier: pricing.silver_weight_multiplier,
            lab_diamond_price_per_carat: pricing.lab_diamond_price_per_carat,
            diamond_slots: theme.diamond_slots.iter().take(MAX_DIAMOND_SLOTS).cloned().collect(),
            as_of,
        })
    }

    pub fn rate_for(&self, material: MaterialKind) -> Decimal {
        match material {
            MaterialKind::Gold => self.gold_rate_per_gram,
            MaterialKind::Silver => self.silver_rate_per_gram,
        }
    }

    /// Price-per-carat for an already-normalized stone label, if the theme
    /// names a slot for it.
    pub fn slot_price(&self, normalized: &str) -> Option<Decimal> {
        self.diamond_slots
            .iter()
            .find(|slot| normalize_label(&slot.name) == normalized)
            .map(|slot| slot.price_per_carat)
    }
}

/// Theme settings as read from the storefront. Rates may be absent on a
/// freshly installed theme; the slot list preserves theme order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeSettings {
    pub gold_rate: Option<Decimal>,
    pub silver_rate: Option<Decimal>,
    pub gst_pct: Option<Decimal>,
    pub diamond_slots: Vec<DiamondSlot>,
}

/// Write-back patch for theme settings. Slot prices address the theme's
/// 1-based `diamond_{i}_price_per_carat` keys.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemePatch {
    pub gold_rate: Option<Decimal>,
    pub silver_rate: Option<Decimal>,
    pub diamond_slot_prices: Vec<(usize, Decimal)>,
}

impl ThemePatch {
    pub fn is_empty(&self) -> bool {
        self.gold_rate.is_none()
            && self.silver_rate.is_none()
            && self.diamond_slot_prices.is_empty()
    }
}
