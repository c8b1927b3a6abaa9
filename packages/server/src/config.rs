//! Server configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use epi_map_database::DbError;
use epi_map_refresh::RefreshError;
use epi_map_source::UpstreamError;
use epi_map_source::api_ninjas::{API_KEY_ENV, API_URL_ENV, DEFAULT_API_URL};

/// Default bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default refresh-all interval in milliseconds (30 minutes).
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 30 * 60 * 1000;

/// Default delay between upstream requests in milliseconds (2 minutes).
pub const DEFAULT_REQUEST_GAP_MS: u64 = 2 * 60 * 1000;

/// Errors that can occur while configuring or starting the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// An environment variable has an invalid value.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is wrong.
        message: String,
    },

    /// The country store could not be opened.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// The upstream client could not be built.
    #[error("Upstream client error: {0}")]
    Upstream(#[from] UpstreamError),

    /// The refresh queue could not be created.
    #[error("Refresh error: {0}")]
    Refresh(#[from] RefreshError),

    /// The HTTP server failed to bind or run.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runtime configuration of the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// Port to bind (`PORT`).
    pub port: u16,
    /// `DuckDB` file for country records (`COVID_DB_PATH`). `:memory:`
    /// keeps records only for the lifetime of the process.
    pub db_path: PathBuf,
    /// Upstream endpoint (`COVID_API_URL`).
    pub api_url: String,
    /// Upstream API key (`API_NINJAS_KEY`).
    pub api_key: Option<String>,
    /// Interval between refresh-all runs (`COVID_REFRESH_INTERVAL_MS`).
    pub refresh_interval: Duration,
    /// Delay between upstream requests (`COVID_REQUEST_GAP_MS`).
    pub request_gap: Duration,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if it is set.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if a numeric variable does not parse
    /// or the refresh interval is zero.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let refresh_interval_ms = parse_var(
            "COVID_REFRESH_INTERVAL_MS",
            get("COVID_REFRESH_INTERVAL_MS"),
            DEFAULT_REFRESH_INTERVAL_MS,
        )?;
        if refresh_interval_ms == 0 {
            return Err(ServerError::Config {
                message: "COVID_REFRESH_INTERVAL_MS must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            port: parse_var("PORT", get("PORT"), DEFAULT_PORT)?,
            db_path: get("COVID_DB_PATH")
                .map_or_else(epi_map_database::paths::covid_db_path, PathBuf::from),
            api_url: get(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: get(API_KEY_ENV),
            refresh_interval: Duration::from_millis(refresh_interval_ms),
            request_gap: Duration::from_millis(parse_var(
                "COVID_REQUEST_GAP_MS",
                get("COVID_REQUEST_GAP_MS"),
                DEFAULT_REQUEST_GAP_MS,
            )?),
        })
    }
}

fn parse_var<T>(key: &str, value: Option<String>, default: T) -> Result<T, ServerError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.map_or(Ok(default), |v| {
        v.trim().parse().map_err(|e| ServerError::Config {
            message: format!("Invalid {key} value {v:?}: {e}"),
        })
    })
}
