//! Live commodity rate provider client (goldapi-style JSON endpoints).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{info, warn};

use karat_core::adapters::{RateQuote, RateSource};
use karat_core::config::{RateProviderConfig, RetryConfig};
use karat_core::domain::product::MaterialKind;
use karat_core::errors::RateError;

pub struct RateProviderClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    currency: String,
    retry: RetryConfig,
}

impl RateProviderClient {
    pub fn new(config: &RateProviderConfig, retry: RetryConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build rate provider http client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            currency: config.currency.to_uppercase(),
            retry,
        })
    }

    fn url_for(&self, metal: MaterialKind) -> String {
        let symbol = match metal {
            MaterialKind::Gold => "XAU",
            MaterialKind::Silver => "XAG",
        };
        format!("{}/{symbol}/{}", self.base_url, self.currency)
    }

    async fn fetch_once(&self, metal: MaterialKind) -> Result<RateQuote, Failure> {
        let mut request = self.http.get(self.url_for(metal));
        if let Some(api_key) = &self.api_key {
            request = request.header("x-access-token", api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| Failure {
            transient: error.is_timeout() || error.is_connect(),
            reason: error.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Failure {
                transient: status.as_u16() == 429 || status.is_server_error(),
                reason: format!("HTTP {status}"),
            });
        }

        let body: Value = response.json().await.map_err(|error| Failure {
            transient: false,
            reason: format!("invalid JSON: {error}"),
        })?;
        quote_from_body(metal, &body).map_err(|reason| Failure { transient: false, reason })
    }
}

struct Failure {
    transient: bool,
    reason: String,
}

#[async_trait]
impl RateSource for RateProviderClient {
    async fn fetch(&self, metal: MaterialKind) -> Result<RateQuote, RateError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(metal).await {
                Ok(quote) => {
                    info!(%metal, rate = %quote.rate_per_gram, "fetched live rate");
                    return Ok(quote);
                }
                Err(failure) if failure.transient && attempt < self.retry.max_attempts => {
                    let backoff =
                        Duration::from_secs(self.retry.base_delay_secs << (attempt - 1));
                    warn!(%metal, attempt, reason = %failure.reason, ?backoff, "rate fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(failure) => {
                    return Err(RateError::Unavailable { metal, reason: failure.reason });
                }
            }
        }
    }
}

/// Extract the per-gram rate from a provider response body. Gold quotes
/// expose the pure 24K gram price; silver exposes the plain gram price.
fn quote_from_body(metal: MaterialKind, body: &Value) -> Result<RateQuote, String> {
    let field = match metal {
        MaterialKind::Gold => "price_gram_24k",
        MaterialKind::Silver => "price_gram",
    };
    let rate_per_gram = body
        .get(field)
        .and_then(decimal_value)
        .ok_or_else(|| format!("response has no usable `{field}`"))?;
    if rate_per_gram <= Decimal::ZERO {
        return Err(format!("`{field}` is not a positive rate: {rate_per_gram}"));
    }

    let as_of = body
        .get("timestamp")
        .and_then(Value::as_i64)
        .and_then(|epoch| DateTime::<Utc>::from_timestamp(epoch, 0))
        .unwrap_or_else(Utc::now);

    Ok(RateQuote { rate_per_gram, as_of })
}

fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => Decimal::from_f64_retain(number.as_f64()?),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::quote_from_body;
    use karat_core::domain::product::MaterialKind;

    #[test]
    fn gold_quotes_read_the_24k_gram_price() {
        let body = json!({ "price_gram_24k": 7000.25, "price_gram": 6500.0, "timestamp": 1754500000 });
        let quote = quote_from_body(MaterialKind::Gold, &body).expect("quote");
        assert_eq!(quote.rate_per_gram, Decimal::from_f64_retain(7000.25).unwrap());
        assert_eq!(quote.as_of.timestamp(), 1754500000);
    }

    #[test]
    fn silver_quotes_read_the_plain_gram_price() {
        let body = json!({ "price_gram": "90.40" });
        let quote = quote_from_body(MaterialKind::Silver, &body).expect("quote");
        assert_eq!(quote.rate_per_gram, "90.40".parse::<Decimal>().unwrap());
    }

    #[test]
    fn missing_rate_field_is_an_error() {
        let body = json!({ "price": 1.0 });
        let err = quote_from_body(MaterialKind::Gold, &body).expect_err("must fail");
        assert!(err.contains("price_gram_24k"));
    }

    #[test]
    fn non_positive_rates_are_rejected() {
        let body = json!({ "price_gram_24k": 0 });
        assert!(quote_from_body(MaterialKind::Gold, &body).is_err());
    }
}
