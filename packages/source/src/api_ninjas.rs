//! API Ninjas `covid19` client.
//!
//! One authenticated GET per country (`?country=<name>`, `X-Api-Key`
//! header). The endpoint returns a JSON array of regional records, each
//! with date-keyed `cases` and `deaths` dictionaries.

use std::time::Duration;

use async_trait::async_trait;

use crate::retry::{self, RetryPolicy};
use crate::{CountryFetcher, UpstreamError};

/// Default endpoint URL.
pub const DEFAULT_API_URL: &str = "https://api.api-ninjas.com/v1/covid19";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "API_NINJAS_KEY";

/// Environment variable overriding the endpoint URL.
pub const API_URL_ENV: &str = "COVID_API_URL";

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Maximum length of the response body included in status errors.
const BODY_PREVIEW_LEN: usize = 200;

/// HTTP client for the API Ninjas `covid19` endpoint.
pub struct ApiNinjasClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl ApiNinjasClient {
    /// Creates a client for `api_url`.
    ///
    /// A missing key is not an error here: every fetch then fails with
    /// [`UpstreamError::Config`] so the failure is recorded per country.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Http`] if the HTTP client cannot be built.
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(UpstreamError::Http)?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns `true` if an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_once(&self, api_key: &str, country: &str) -> Result<serde_json::Value, UpstreamError> {
        let response = self
            .client
            .get(&self.api_url)
            .header("X-Api-Key", api_key)
            .query(&[("country", country)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                body.chars().take(BODY_PREVIEW_LEN).collect()
            };
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl CountryFetcher for ApiNinjasClient {
    async fn fetch_country(&self, country: &str) -> Result<serde_json::Value, UpstreamError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(UpstreamError::Config {
                message: format!("Missing {API_KEY_ENV} in environment"),
            });
        };

        retry::with_retry(&self.retry, country, |_attempt| {
            self.fetch_once(api_key, country)
        })
        .await
    }
}
