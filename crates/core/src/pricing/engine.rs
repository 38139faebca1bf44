//! Price calculation engine.
//!
//! Pure functions from (product attributes, rate snapshot, stone price) to
//! a price breakdown. No I/O, no hidden state; identical inputs always
//! produce an identical breakdown.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::product::{MaterialKind, ProductAttributes};
use crate::domain::rates::RateSnapshot;
use crate::errors::PricingError;

/// The storefront shows every price as a 20% markdown from compare-at.
const DISPLAY_DISCOUNT_COMPLEMENT: Decimal = Decimal::from_parts(80, 0, 0, false, 2); // 0.80

/// Full term-by-term result of pricing one product. Intermediate terms are
/// exact; only `total` and `compare_at` are rounded to currency precision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub metal_price: Decimal,
    pub stone_price: Decimal,
    pub making_charge: Decimal,
    pub discount: Decimal,
    pub hallmarking_charge: Decimal,
    pub certification_charge: Decimal,
    pub subtotal: Decimal,
    pub gst: Decimal,
    pub total: Decimal,
    pub compare_at: Decimal,
}

/// Price a product against an immutable rate snapshot.
///
/// Gold uses the full formula (purity-adjusted metal, stones, making
/// charge, discount on making, hallmarking/certification, GST). Silver
/// uses the flat per-gram multiplier plus lab-diamond carats, with no
/// making/discount/GST terms. Both derive compare-at from the rounded
/// total.
pub fn compute(
    attrs: &ProductAttributes,
    rates: &RateSnapshot,
    stone_price_per_carat: Decimal,
) -> Result<PriceBreakdown, PricingError> {
    ensure_non_negative("metal_weight_grams", attrs.metal_weight_grams)?;
    ensure_non_negative("stone_carats", attrs.stone_carats)?;
    ensure_non_negative("making_charge_pct", attrs.making_charge_pct)?;
    ensure_non_negative("discount_making_pct", attrs.discount_making_pct)?;
    ensure_non_negative("hallmarking_charge", attrs.hallmarking_charge)?;
    ensure_non_negative("certification_charge", attrs.certification_charge)?;
    ensure_non_negative("stone_price_per_carat", stone_price_per_carat)?;

    match attrs.material {
        Some(MaterialKind::Gold) => Ok(compute_gold(attrs, rates, stone_price_per_carat)),
        Some(MaterialKind::Silver) => Ok(compute_silver(attrs, rates)),
        None => Err(PricingError::UnknownMaterialKind),
    }
}

fn compute_gold(
    attrs: &ProductAttributes,
    rates: &RateSnapshot,
    stone_price_per_carat: Decimal,
) -> PriceBreakdown {
    let purity_factor = attrs
        .purity
        .map(|purity| purity.factor())
        .unwrap_or(rates.default_purity_factor);

    let metal_price = attrs.metal_weight_grams * purity_factor * rates.gold_rate_per_gram;
    let stone_price = attrs.stone_carats * stone_price_per_carat;
    let making_charge = metal_price * attrs.making_charge_pct / Decimal::ONE_HUNDRED;
    let discount = making_charge * attrs.discount_making_pct / Decimal::ONE_HUNDRED;

    // A discount larger than everything it applies to must not produce a
    // negative price.
    let subtotal = (metal_price + stone_price + making_charge - discount
        + attrs.hallmarking_charge
        + attrs.certification_charge)
        .max(Decimal::ZERO);
    let gst = subtotal * rates.gst_pct / Decimal::ONE_HUNDRED;

    let total = round_currency(subtotal + gst);

    PriceBreakdown {
        metal_price,
        stone_price,
        making_charge,
        discount,
        hallmarking_charge: attrs.hallmarking_charge,
        certification_charge: attrs.certification_charge,
        subtotal,
        gst,
        total,
        compare_at: compare_at_for(total),
    }
}

fn compute_silver(attrs: &ProductAttributes, rates: &RateSnapshot) -> PriceBreakdown {
    let metal_price = attrs.metal_weight_grams * rates.silver_weight_multiplier;
    let stone_price = attrs.stone_carats * rates.lab_diamond_price_per_carat;
    let subtotal = metal_price + stone_price;
    let total = round_currency(subtotal);

    PriceBreakdown {
        metal_price,
        stone_price,
        making_charge: Decimal::ZERO,
        discount: Decimal::ZERO,
        hallmarking_charge: Decimal::ZERO,
        certification_charge: Decimal::ZERO,
        subtotal,
        gst: Decimal::ZERO,
        total,
        compare_at: compare_at_for(total),
    }
}

/// Derive the displayed "was" price from a rounded total.
pub fn compare_at_for(total: Decimal) -> Decimal {
    round_currency(total / DISPLAY_DISCOUNT_COMPLEMENT)
}

/// Round-half-up to the smallest currency unit. Applied once, at the final
/// total and compare-at, so intermediate terms never compound rounding
/// error.
fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn ensure_non_negative(field: &'static str, value: Decimal) -> Result<(), PricingError> {
    if value < Decimal::ZERO {
        return Err(PricingError::InvalidAttribute { field, value: value.to_string() });
    }
    Ok(())
}
