//! Stone price resolution.
//!
//! A product declares an ordered list of stone-type labels. Each run
//! resolves those labels to one price-per-carat by consulting, in order:
//! a caller-supplied override map, the theme's named diamond slots, and
//! finally the product's own fallback price.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::rates::RateSnapshot;
use crate::errors::PricingError;

/// Canonical form used for every stone-label comparison.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Caller-supplied price-per-carat overrides keyed by normalized label.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiamondOverrideMap(BTreeMap<String, Decimal>);

impl DiamondOverrideMap {
    pub fn get(&self, label: &str) -> Option<Decimal> {
        self.0.get(&normalize_label(label)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn insert(&mut self, label: &str, price: Decimal) {
        self.0.insert(normalize_label(label), price);
    }

    /// Parse operator input in either accepted grammar:
    ///
    /// - a JSON object literal: `{"Lab Grown": 15000, "natural": 52000}`
    /// - flat pairs: `lab grown:15000, natural:52000`
    ///
    /// Keys are normalized; pairs that do not parse are skipped with a
    /// warning rather than failing the whole map.
    pub fn parse(input: &str) -> Self {
        let mut map = Self::default();
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return map;
        }

        if trimmed.starts_with('{') {
            if let Ok(serde_json::Value::Object(entries)) =
                serde_json::from_str::<serde_json::Value>(trimmed)
            {
                for (label, value) in entries {
                    match decimal_from_json(&value) {
                        Some(price) => map.insert(&label, price),
                        None => {
                            tracing::warn!(label = %label, "skipping non-numeric diamond price");
                        }
                    }
                }
                return map;
            }
            // Malformed JSON falls through to the pair grammar.
        }

        for pair in trimmed.split(',') {
            let Some((label, price_raw)) = pair.split_once(':') else {
                if !pair.trim().is_empty() {
                    tracing::warn!(pair = %pair.trim(), "skipping diamond entry without a price");
                }
                continue;
            };
            match price_raw.trim().parse::<Decimal>() {
                Ok(price) => map.insert(label, price),
                Err(_) => {
                    tracing::warn!(pair = %pair.trim(), "skipping invalid diamond price value");
                }
            }
        }
        map
    }
}

impl FromIterator<(String, Decimal)> for DiamondOverrideMap {
    fn from_iter<I: IntoIterator<Item = (String, Decimal)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (label, price) in iter {
            map.insert(&label, price);
        }
        map
    }
}

fn decimal_from_json(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(number) => Decimal::from_f64_retain(number.as_f64()?),
        serde_json::Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

/// Resolve a price-per-carat for a product's stone labels.
///
/// The override map is consulted across all labels in order before any
/// theme slot is considered, so an operator override always beats theme
/// configuration, whatever position its label holds. The product fallback
/// applies only when no label matches anywhere.
pub fn resolve_price_per_carat(
    labels: &[String],
    theme: &RateSnapshot,
    overrides: Option<&DiamondOverrideMap>,
    fallback: Option<Decimal>,
) -> Result<Decimal, PricingError> {
    if let Some(overrides) = overrides {
        for label in labels {
            if let Some(price) = overrides.get(label) {
                return Ok(price);
            }
        }
    }

    for label in labels {
        if let Some(price) = theme.slot_price(&normalize_label(label)) {
            return Ok(price);
        }
    }

    fallback.ok_or_else(|| PricingError::NoStonePriceFound { labels: labels.join(", ") })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{normalize_label, resolve_price_per_carat, DiamondOverrideMap};
    use crate::domain::rates::{DiamondSlot, RateSnapshot};
    use crate::errors::PricingError;

    fn dec(raw: &str) -> Decimal {
        raw.parse().expect("decimal literal")
    }

    fn theme_with_slots(slots: &[(&str, &str)]) -> RateSnapshot {
        RateSnapshot {
            gold_rate_per_gram: dec("7000"),
            silver_rate_per_gram: dec("90"),
            gst_pct: dec("3"),
            default_purity_factor: Decimal::ONE,
            silver_weight_multiplier: dec("1000"),
            lab_diamond_price_per_carat: dec("40000"),
            diamond_slots: slots
                .iter()
                .map(|(name, price)| DiamondSlot {
                    name: (*name).to_string(),
                    price_per_carat: dec(price),
                })
                .collect(),
            as_of: Utc::now(),
        }
    }

    #[test]
    fn override_beats_theme_regardless_of_label_order() {
        let theme = theme_with_slots(&[("natural", "50000")]);
        let overrides: DiamondOverrideMap =
            [("lab grown".to_string(), dec("15000"))].into_iter().collect();
        let labels = vec!["Lab Grown".to_string(), "Natural".to_string()];

        let price = resolve_price_per_carat(&labels, &theme, Some(&overrides), None)
            .expect("resolves");
        assert_eq!(price, dec("15000"));

        // Even when the override's label comes second, it still wins.
        let reordered = vec!["Natural".to_string(), "Lab Grown".to_string()];
        let price = resolve_price_per_carat(&reordered, &theme, Some(&overrides), None)
            .expect("resolves");
        assert_eq!(price, dec("15000"));
    }

    #[test]
    fn theme_slot_matches_case_insensitively() {
        let theme = theme_with_slots(&[("Natural", "50000")]);
        let labels = vec!["  natural ".to_string()];
        let price = resolve_price_per_carat(&labels, &theme, None, None).expect("resolves");
        assert_eq!(price, dec("50000"));
    }

    #[test]
    fn fallback_applies_when_nothing_matches() {
        let theme = theme_with_slots(&[]);
        let labels = vec!["moissanite".to_string()];
        let price = resolve_price_per_carat(&labels, &theme, None, Some(dec("9000")))
            .expect("resolves");
        assert_eq!(price, dec("9000"));
    }

    #[test]
    fn unmatched_labels_without_fallback_fail() {
        let theme = theme_with_slots(&[("natural", "50000")]);
        let labels = vec!["moissanite".to_string()];
        let err = resolve_price_per_carat(&labels, &theme, None, None).expect_err("must fail");
        assert!(matches!(err, PricingError::NoStonePriceFound { .. }));
    }

    #[test]
    fn parses_json_object_grammar() {
        let map = DiamondOverrideMap::parse(r#"{"Lab Grown": 15000, "Natural": "52000.50"}"#);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("lab grown"), Some(dec("15000")));
        assert_eq!(map.get("NATURAL"), Some(dec("52000.50")));
    }

    #[test]
    fn parses_flat_pair_grammar_and_skips_bad_pairs() {
        let map = DiamondOverrideMap::parse("lab grown:15000, natural:abc, solitaire : 61000 ");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("Lab Grown"), Some(dec("15000")));
        assert_eq!(map.get("solitaire"), Some(dec("61000")));
        assert_eq!(map.get("natural"), None);
    }

    #[test]
    fn empty_input_parses_to_empty_map() {
        assert!(DiamondOverrideMap::parse("   ").is_empty());
    }

    #[test]
    fn labels_normalize_by_trim_and_case() {
        assert_eq!(normalize_label("  Lab Grown "), "lab grown");
    }
}
