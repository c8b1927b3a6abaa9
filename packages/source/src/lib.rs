#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Upstream epidemiological data source.
//!
//! The refresh worker talks to the provider through the [`CountryFetcher`]
//! trait. [`api_ninjas::ApiNinjasClient`] is the production implementation;
//! [`shape`] turns whatever payload it returns into per-country totals.

pub mod api_ninjas;
pub mod retry;
pub mod shape;

use async_trait::async_trait;

/// Errors that can occur while fetching country data from the provider.
///
/// "No data" is not an error: an empty or unknown-country payload is a
/// valid response that shapes into a record without totals.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The client is missing required configuration (e.g. the API key).
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is missing.
        message: String,
    },

    /// A network-layer failure (DNS, connection reset, timeout) that is
    /// worth retrying.
    #[error("Transient network error: {message}")]
    Transient {
        /// Underlying error message.
        message: String,
    },

    /// The provider answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body preview or reason phrase.
        message: String,
    },

    /// Any other HTTP client failure.
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    /// The response body was not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UpstreamError {
    /// Returns `true` if the failure is network-level and may be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Config { .. } | Self::Transient { .. } | Self::Json(_) => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if is_transient(&e) {
            Self::Transient {
                message: e.to_string(),
            }
        } else {
            Self::Http(e)
        }
    }
}

/// Returns `true` if the error happened below HTTP (name resolution,
/// connect, reset, timeout) rather than as a response status.
fn is_transient(e: &reqwest::Error) -> bool {
    e.status().is_none() && (e.is_timeout() || e.is_connect() || e.is_request() || e.is_body())
}

/// Fetches the raw provider payload for one country.
///
/// Implementations must be safe to share between the refresh worker and
/// any other caller.
#[async_trait]
pub trait CountryFetcher: Send + Sync {
    /// Fetches the unshaped payload for `country` (a canonical name).
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] if configuration is missing, the request
    /// fails after retries, or the provider returns an error status.
    async fn fetch_country(&self, country: &str) -> Result<serde_json::Value, UpstreamError>;
}
