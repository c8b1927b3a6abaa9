#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Read-side views over stored country records.
//!
//! [`readers`] serves single and batch snapshots colored by [`color`];
//! [`timeseries`] rebuilds daily case and death series from the stored raw
//! payload. None of these trigger a refresh: "no data yet" is a normal
//! answer, and only store failures are errors.

pub mod color;
pub mod readers;
pub mod timeseries;

use thiserror::Error;

/// Errors that can occur while building read-side views.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Store operation failed.
    #[error("Database error: {0}")]
    Database(#[from] epi_map_database::DbError),
}
