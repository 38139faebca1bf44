//! HTTP adapters for the storefront Admin API and the commodity rate
//! provider. All remote calls retry transient failures (rate-limit
//! responses, timeouts) with bounded exponential backoff before giving up.

pub mod catalog;
pub mod client;
pub mod parse;
pub mod rates;

pub use client::StorefrontClient;
pub use rates::RateProviderClient;
