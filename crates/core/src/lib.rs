pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod update;

pub use adapters::{CatalogStore, MetafieldPatch, ProductFilter, RateQuote, RateSource};
pub use domain::product::{MaterialKind, ProductAttributes, ProductId, Purity, VariantId};
pub use domain::rates::{DiamondSlot, RateSnapshot, ThemePatch, ThemeSettings, MAX_DIAMOND_SLOTS};
pub use domain::report::{
    FailureKind, OutcomeFailure, OutcomeStatus, RunCounts, RunReport, UpdateOutcome,
};
pub use errors::{PricingError, RateError, StoreError};
pub use pricing::engine::{compute, PriceBreakdown};
pub use pricing::stones::{resolve_price_per_carat, DiamondOverrideMap};
pub use update::{BulkUpdater, Selection, UpdateError, PROVENANCE_NAMESPACE};
