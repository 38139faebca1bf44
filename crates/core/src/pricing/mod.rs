pub mod engine;
pub mod stones;

pub use engine::{compute, PriceBreakdown};
pub use stones::{resolve_price_per_carat, DiamondOverrideMap};
