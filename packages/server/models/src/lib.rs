#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the epi map server.
//!
//! Country snapshots, batch results, legends, and time series are returned
//! as the `epi_map_covid_models` types directly; this crate only holds the
//! HTTP-specific envelopes around them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Body of `POST /api/covid/batch` and `POST /api/covid/seed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountriesBody {
    /// Country names in any supported spelling.
    #[serde(default)]
    pub countries: Vec<String>,
}

/// Optional `?max=` query parameter used for color scaling.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MaxQuery {
    /// Value the gradient's high end corresponds to.
    pub max: Option<f64>,
}

/// Response of `POST /api/covid/seed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedResponse {
    /// Human-readable acknowledgement.
    pub message: String,
    /// Number of distinct canonical countries requested.
    pub count: usize,
}

/// Response of `GET /api/covid/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Number of stored country records.
    pub count: u64,
    /// Most recent refresh attempt across all records.
    pub last_updated_at: Option<DateTime<Utc>>,
    /// Countries waiting in the refresh queue.
    pub pending: usize,
    /// Whether the refresh worker is running.
    pub draining: bool,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error description.
    pub message: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
