use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantId(pub String);

/// Which pricing formula applies to a product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    Gold,
    Silver,
}

const GOLD_MARKERS: [&str; 13] = [
    "9KT", "10KT", "14KT", "18KT", "22KT", "24KT", "9K", "10K", "14K", "18K", "22K", "24K",
    "GOLD",
];
const SILVER_MARKERS: [&str; 3] = ["SILVER", "925", "STERLING"];

impl MaterialKind {
    /// Detect the material from free-text product fields (type, titles).
    /// Gold markers win when both appear, matching how mixed-listing
    /// products were classified upstream.
    pub fn detect(text: &str) -> Option<Self> {
        let haystack = text.to_uppercase();
        if GOLD_MARKERS.iter().any(|marker| haystack.contains(marker)) {
            return Some(Self::Gold);
        }
        if SILVER_MARKERS.iter().any(|marker| haystack.contains(marker)) {
            return Some(Self::Silver);
        }
        None
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Silver => "silver",
        }
    }
}

impl std::fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Karat grade of a gold product. The factor converts the 24K rate to the
/// alloy's effective per-gram rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Purity {
    K24,
    K22,
    K18,
    K14,
    K10,
    K9,
}

impl Purity {
    pub fn factor(&self) -> Decimal {
        match self {
            Self::K24 => Decimal::ONE,
            Self::K22 => Decimal::new(916, 3),
            Self::K18 => Decimal::new(750, 3),
            Self::K14 => Decimal::new(585, 3),
            Self::K10 => Decimal::new(417, 3),
            Self::K9 => Decimal::new(375, 3),
        }
    }

    /// Scan free text for a karat token (`22KT`, `14K`, ...). Longer grades
    /// are checked first so `24KT` never reads as a `4K` fragment.
    pub fn detect(text: &str) -> Option<Self> {
        let haystack = text.to_uppercase();
        for (token, purity) in [
            ("24K", Self::K24),
            ("22K", Self::K22),
            ("18K", Self::K18),
            ("14K", Self::K14),
            ("10K", Self::K10),
            ("9K", Self::K9),
        ] {
            if haystack.contains(token) {
                return Some(purity);
            }
        }
        None
    }
}

/// Immutable per-product snapshot read from the catalog. Missing numeric
/// metafields arrive as zero; a missing fallback price-per-carat is `None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductAttributes {
    pub id: ProductId,
    pub variant_id: VariantId,
    pub handle: String,
    pub title: String,
    pub material: Option<MaterialKind>,
    pub purity: Option<Purity>,
    pub metal_weight_grams: Decimal,
    pub stone_carats: Decimal,
    pub stone_types: Vec<String>,
    pub fallback_price_per_carat: Option<Decimal>,
    pub making_charge_pct: Decimal,
    pub discount_making_pct: Decimal,
    pub hallmarking_charge: Decimal,
    pub certification_charge: Decimal,
    pub current_price: Decimal,
    pub current_compare_at: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::{MaterialKind, Purity};
    use rust_decimal::Decimal;

    #[test]
    fn gold_wins_over_silver_when_both_markers_appear() {
        assert_eq!(
            MaterialKind::detect("18KT Gold Pendant on 925 Chain"),
            Some(MaterialKind::Gold)
        );
    }

    #[test]
    fn silver_markers_are_recognized() {
        assert_eq!(MaterialKind::detect("Sterling Ring"), Some(MaterialKind::Silver));
        assert_eq!(MaterialKind::detect("925 band"), Some(MaterialKind::Silver));
    }

    #[test]
    fn unknown_material_is_none() {
        assert_eq!(MaterialKind::detect("Platinum Band"), None);
    }

    #[test]
    fn purity_tokens_parse_with_and_without_trailing_t() {
        assert_eq!(Purity::detect("22KT"), Some(Purity::K22));
        assert_eq!(Purity::detect("ring 14k rose"), Some(Purity::K14));
        assert_eq!(Purity::detect("hallmark"), None);
    }

    #[test]
    fn purity_factors_match_the_alloy_table() {
        assert_eq!(Purity::K24.factor(), Decimal::ONE);
        assert_eq!(Purity::K22.factor(), Decimal::new(916, 3));
        assert_eq!(Purity::K9.factor(), Decimal::new(375, 3));
    }
}
