use thiserror::Error;

use crate::domain::product::MaterialKind;
use crate::domain::report::FailureKind;

/// Errors raised by the pure pricing path. All of these are per-product:
/// the orchestrator downgrades them to a `failed` outcome and moves on.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("invalid attribute `{field}`: {value}")]
    InvalidAttribute { field: &'static str, value: String },
    #[error("material kind is missing or unrecognized")]
    UnknownMaterialKind,
    #[error("no stone price found for labels [{labels}]")]
    NoStonePriceFound { labels: String },
}

impl PricingError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::InvalidAttribute { .. } => FailureKind::InvalidAttribute,
            Self::UnknownMaterialKind => FailureKind::UnknownMaterialKind,
            Self::NoStonePriceFound { .. } => FailureKind::NoStonePriceFound,
        }
    }
}

/// No usable rate snapshot means no run; this error is always fatal and
/// surfaces before any write is attempted.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RateError {
    #[error("{metal} rate unavailable: {reason}")]
    Unavailable { metal: MaterialKind, reason: String },
}

/// Failures talking to the catalog store. Listing and theme writes are
/// run-fatal; per-product price writes are isolated into the report.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("remote write rejected: {0}")]
    RemoteWrite(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Response(String),
}

#[cfg(test)]
mod tests {
    use super::{PricingError, RateError};
    use crate::domain::product::MaterialKind;
    use crate::domain::report::FailureKind;

    #[test]
    fn pricing_errors_map_to_report_failure_kinds() {
        let invalid = PricingError::InvalidAttribute {
            field: "metal_weight_grams",
            value: "-1".to_string(),
        };
        assert_eq!(invalid.failure_kind(), FailureKind::InvalidAttribute);
        assert_eq!(PricingError::UnknownMaterialKind.failure_kind(), FailureKind::UnknownMaterialKind);
    }

    #[test]
    fn rate_error_names_the_metal() {
        let err = RateError::Unavailable {
            metal: MaterialKind::Gold,
            reason: "HTTP 503".to_string(),
        };
        assert_eq!(err.to_string(), "gold rate unavailable: HTTP 503");
    }
}
