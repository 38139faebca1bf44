use std::time::Duration;

use anyhow::Context;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::warn;

use karat_core::config::{RetryConfig, StorefrontConfig};
use karat_core::errors::StoreError;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Admin API client. One instance serves a whole run; request-level
/// retry/backoff lives here so the callers above stay sequential and
/// simple.
pub struct StorefrontClient {
    http: reqwest::Client,
    rest_base: String,
    graphql_url: String,
    token: SecretString,
    pub(crate) theme_id: Option<u64>,
    retry: RetryConfig,
}

impl StorefrontClient {
    pub fn new(config: &StorefrontConfig, retry: RetryConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build storefront http client")?;

        let shop = config.shop_url.trim().trim_end_matches('/');
        let rest_base = format!("https://{shop}/admin/api/{}", config.api_version);
        let graphql_url = format!("{rest_base}/graphql.json");

        Ok(Self {
            http,
            rest_base,
            graphql_url,
            token: config.access_token.clone(),
            theme_id: config.theme_id,
            retry,
        })
    }

    /// Execute a GraphQL document and return its `data` value. Top-level
    /// GraphQL errors are terminal; HTTP-level throttling and timeouts are
    /// retried by `execute`.
    pub(crate) async fn graphql(
        &self,
        operation: &'static str,
        query: &str,
        variables: Value,
    ) -> Result<Value, StoreError> {
        let payload = json!({ "query": query, "variables": variables });
        let request = self
            .http
            .post(&self.graphql_url)
            .header(ACCESS_TOKEN_HEADER, self.token.expose_secret())
            .json(&payload);

        let response = self.execute(operation, request).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|error| StoreError::Response(format!("{operation}: invalid JSON: {error}")))?;

        if let Some(errors) = body.get("errors").filter(|errors| !errors.is_null()) {
            return Err(StoreError::Response(format!("{operation}: graphql errors: {errors}")));
        }
        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }

    pub(crate) async fn rest_get(
        &self,
        operation: &'static str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, StoreError> {
        let request = self
            .http
            .get(format!("{}/{path}", self.rest_base))
            .header(ACCESS_TOKEN_HEADER, self.token.expose_secret())
            .query(query);

        let response = self.execute(operation, request).await?;
        response
            .json()
            .await
            .map_err(|error| StoreError::Response(format!("{operation}: invalid JSON: {error}")))
    }

    pub(crate) async fn rest_put(
        &self,
        operation: &'static str,
        path: &str,
        body: &Value,
    ) -> Result<Value, StoreError> {
        let request = self
            .http
            .put(format!("{}/{path}", self.rest_base))
            .header(ACCESS_TOKEN_HEADER, self.token.expose_secret())
            .json(body);

        let response = self.execute(operation, request).await?;
        response
            .json()
            .await
            .map_err(|error| StoreError::Response(format!("{operation}: invalid JSON: {error}")))
    }

    /// Send one request, retrying transient failures up to the configured
    /// ceiling with exponential backoff.
    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<reqwest::Response, StoreError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let prepared = request.try_clone().ok_or_else(|| {
                StoreError::Transport(format!("{operation}: request body is not retryable"))
            })?;

            match prepared.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if is_transient_status(status) && attempt < self.retry.max_attempts {
                        let backoff = self.backoff(attempt);
                        warn!(operation, attempt, %status, ?backoff, "transient storefront response; retrying");
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    return Err(StoreError::Response(format!(
                        "{operation} returned HTTP {status}: {}",
                        snippet(&body)
                    )));
                }
                Err(error) => {
                    if (error.is_timeout() || error.is_connect())
                        && attempt < self.retry.max_attempts
                    {
                        let backoff = self.backoff(attempt);
                        warn!(operation, attempt, %error, ?backoff, "storefront request failed; retrying");
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    return Err(StoreError::Transport(format!("{operation}: {error}")));
                }
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.retry.base_delay_secs << (attempt - 1))
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn snippet(body: &str) -> &str {
    let end = body
        .char_indices()
        .take(240)
        .last()
        .map(|(index, ch)| index + ch.len_utf8())
        .unwrap_or(0);
    &body[..end]
}
