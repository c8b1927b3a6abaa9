#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Persistent storage for country records.
//!
//! [`CountryStore`] is the contract the refresh worker, the readers, and the
//! scheduler share. [`country_db::DuckDbCountryStore`] persists to a `DuckDB`
//! file; [`memory::MemoryCountryStore`] keeps everything in a map and backs
//! the tests of the crates above this one.

pub mod country_db;
pub mod memory;
pub mod paths;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use epi_map_covid_models::{CountryRecord, CountryUpdate};

pub use country_db::DuckDbCountryStore;
pub use memory::MemoryCountryStore;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` query error.
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    /// Filesystem error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored raw payload could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// A previous holder of the store lock panicked.
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Keyed store of [`CountryRecord`]s, one per canonical country name.
#[async_trait]
pub trait CountryStore: Send + Sync {
    /// Looks up the record for `country` (exact match).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be queried.
    async fn find_by_key(&self, country: &str) -> Result<Option<CountryRecord>, DbError>;

    /// Looks up all records whose key is in `countries`. Missing keys are
    /// simply absent from the result; order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be queried.
    async fn find_many(&self, countries: &[String]) -> Result<Vec<CountryRecord>, DbError>;

    /// Creates or updates the record for `country` according to
    /// [`apply_update`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    async fn upsert(
        &self,
        country: &str,
        update: CountryUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), DbError>;

    /// Returns every key ever persisted, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be queried.
    async fn distinct_keys(&self) -> Result<Vec<String>, DbError>;

    /// Returns the number of persisted records.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be queried.
    async fn count(&self) -> Result<u64, DbError>;

    /// Returns the most recent `updated_at` across all records.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be queried.
    async fn latest_update(&self) -> Result<Option<DateTime<Utc>>, DbError>;
}

/// Applies one refresh outcome to the existing record for `country`.
///
/// A successful fetch replaces totals and `raw` and clears `last_error`. A
/// failed fetch only sets `last_error` and `updated_at`, so the last known
/// totals survive transient upstream outages. A record seen for the first
/// time on failure is created without totals.
#[must_use]
pub fn apply_update(
    existing: Option<CountryRecord>,
    country: &str,
    update: CountryUpdate,
    at: DateTime<Utc>,
) -> CountryRecord {
    let mut record = existing.unwrap_or_else(|| CountryRecord {
        country: country.to_string(),
        cases_total: None,
        deaths_total: None,
        has_data: false,
        last_error: None,
        raw: None,
        created_at: at,
        updated_at: at,
    });

    match update {
        CountryUpdate::Fetched { shaped, raw } => {
            record.cases_total = shaped.cases_total;
            record.deaths_total = shaped.deaths_total;
            record.has_data = shaped.has_data;
            record.last_error = None;
            record.raw = Some(raw);
        }
        CountryUpdate::Failed { error } => {
            record.last_error = Some(error);
        }
    }
    record.updated_at = at;
    record
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use epi_map_covid_models::ShapedRecord;
    use serde_json::json;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn failure_on_new_record_has_no_totals() {
        let record = apply_update(
            None,
            "Chad",
            CountryUpdate::Failed {
                error: "HTTP 502: Bad Gateway".to_string(),
            },
            at(1),
        );

        assert_eq!(record.country, "Chad");
        assert_eq!(record.cases_total, None);
        assert!(!record.has_data);
        assert_eq!(record.last_error.as_deref(), Some("HTTP 502: Bad Gateway"));
        assert_eq!(record.created_at, at(1));
        assert_eq!(record.updated_at, at(1));
    }

    #[test]
    fn failure_keeps_last_known_totals() {
        let fetched = apply_update(
            None,
            "Chad",
            CountryUpdate::Fetched {
                shaped: ShapedRecord::new("Chad", Some(7_000.0), Some(190.0)),
                raw: json!([{ "region": "" }]),
            },
            at(1),
        );

        let failed = apply_update(
            Some(fetched),
            "Chad",
            CountryUpdate::Failed {
                error: "timeout".to_string(),
            },
            at(2),
        );

        assert_eq!(failed.cases_total, Some(7_000.0));
        assert_eq!(failed.deaths_total, Some(190.0));
        assert!(failed.has_data);
        assert!(failed.raw.is_some());
        assert_eq!(failed.last_error.as_deref(), Some("timeout"));
        assert_eq!(failed.created_at, at(1));
        assert_eq!(failed.updated_at, at(2));
    }

    #[test]
    fn success_clears_previous_error() {
        let failed = apply_update(
            None,
            "Chad",
            CountryUpdate::Failed {
                error: "timeout".to_string(),
            },
            at(1),
        );

        let fetched = apply_update(
            Some(failed),
            "Chad",
            CountryUpdate::Fetched {
                shaped: ShapedRecord::empty("Chad"),
                raw: json!([]),
            },
            at(3),
        );

        assert_eq!(fetched.last_error, None);
        assert_eq!(fetched.raw, Some(json!([])));
        assert_eq!(fetched.created_at, at(1));
        assert_eq!(fetched.updated_at, at(3));
    }
}
