//! Country records stored in `DuckDB`.
//!
//! One `countries` table keyed by canonical name. The raw upstream payload
//! is kept as JSON text and timestamps as RFC 3339 UTC text, so ordering by
//! `updated_at` is plain string ordering.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::Connection;
use epi_map_covid_models::{CountryRecord, CountryUpdate};

use crate::{CountryStore, DbError};

/// Number of keys per `IN (...)` lookup.
const CHUNK_SIZE: usize = 1_000;

const SELECT_COLUMNS: &str = "country, cases_total, deaths_total, has_data, last_error, raw, \
                              created_at, updated_at";

/// `DuckDB`-backed [`CountryStore`].
///
/// `duckdb::Connection` is `Send` but not `Sync`, so the connection is
/// wrapped in a `Mutex`. The lock is never held across an `.await`.
pub struct DuckDbCountryStore {
    conn: Mutex<Connection>,
}

impl DuckDbCountryStore {
    /// Opens (or creates) the store at `path`. `:memory:` opens a transient
    /// in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the directory, connection, or schema cannot be
    /// created.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = if crate::paths::is_in_memory(path) {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = path.parent() {
                crate::paths::ensure_dir(parent)?;
            }
            Connection::open(path)?
        };

        create_schema(&conn)?;
        log::info!("Opened country store at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a transient in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema cannot be created.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::open(Path::new(crate::paths::IN_MEMORY))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS countries (
            country TEXT NOT NULL PRIMARY KEY,
            cases_total DOUBLE,
            deaths_total DOUBLE,
            has_data BOOLEAN NOT NULL DEFAULT FALSE,
            last_error TEXT,
            raw TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DbError::Conversion {
            message: format!("Invalid timestamp {value:?}: {e}"),
        })
}

fn read_record(row: &duckdb::Row<'_>) -> Result<CountryRecord, DbError> {
    let raw: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(CountryRecord {
        country: row.get(0)?,
        cases_total: row.get(1)?,
        deaths_total: row.get(2)?,
        has_data: row.get(3)?,
        last_error: row.get(4)?,
        raw: raw.as_deref().map(serde_json::from_str).transpose()?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[async_trait]
impl CountryStore for DuckDbCountryStore {
    async fn find_by_key(&self, country: &str) -> Result<Option<CountryRecord>, DbError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM countries WHERE country = ?"
        ))?;
        let mut rows = stmt.query([country])?;

        match rows.next()? {
            Some(row) => Ok(Some(read_record(row)?)),
            None => Ok(None),
        }
    }

    async fn find_many(&self, countries: &[String]) -> Result<Vec<CountryRecord>, DbError> {
        let mut results = Vec::new();
        if countries.is_empty() {
            return Ok(results);
        }

        let conn = self.lock()?;
        for chunk in countries.chunks(CHUNK_SIZE) {
            let placeholders: String = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            let sql =
                format!("SELECT {SELECT_COLUMNS} FROM countries WHERE country IN ({placeholders})");
            let mut stmt = conn.prepare(&sql)?;

            for (i, key) in chunk.iter().enumerate() {
                stmt.raw_bind_parameter(i + 1, key)?;
            }

            stmt.raw_execute()?;
            let mut rows = stmt.raw_query();
            while let Some(row) = rows.next()? {
                results.push(read_record(row)?);
            }
        }

        Ok(results)
    }

    async fn upsert(
        &self,
        country: &str,
        update: CountryUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let at = format_timestamp(at);
        let conn = self.lock()?;

        match update {
            CountryUpdate::Fetched { shaped, raw } => {
                let raw = serde_json::to_string(&raw)?;
                conn.execute(
                    "INSERT INTO countries
                        (country, cases_total, deaths_total, has_data, last_error, raw, created_at, updated_at)
                     VALUES (?, ?, ?, ?, NULL, ?, ?, ?)
                     ON CONFLICT (country) DO UPDATE SET
                        cases_total = excluded.cases_total,
                        deaths_total = excluded.deaths_total,
                        has_data = excluded.has_data,
                        last_error = NULL,
                        raw = excluded.raw,
                        updated_at = excluded.updated_at",
                    duckdb::params![
                        country,
                        shaped.cases_total,
                        shaped.deaths_total,
                        shaped.has_data,
                        raw,
                        at,
                        at,
                    ],
                )?;
            }
            CountryUpdate::Failed { error } => {
                conn.execute(
                    "INSERT INTO countries
                        (country, cases_total, deaths_total, has_data, last_error, raw, created_at, updated_at)
                     VALUES (?, NULL, NULL, FALSE, ?, NULL, ?, ?)
                     ON CONFLICT (country) DO UPDATE SET
                        last_error = excluded.last_error,
                        updated_at = excluded.updated_at",
                    duckdb::params![country, error, at, at],
                )?;
            }
        }

        Ok(())
    }

    async fn distinct_keys(&self) -> Result<Vec<String>, DbError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT DISTINCT country FROM countries ORDER BY country")?;
        let mut rows = stmt.query([])?;

        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(row.get(0)?);
        }
        Ok(keys)
    }

    async fn count(&self) -> Result<u64, DbError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM countries", [], |row| row.get(0))?;
        u64::try_from(count).map_err(|e| DbError::Conversion {
            message: format!("Negative row count {count}: {e}"),
        })
    }

    async fn latest_update(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        let conn = self.lock()?;
        let latest: Option<String> =
            conn.query_row("SELECT MAX(updated_at) FROM countries", [], |row| row.get(0))?;
        latest.as_deref().map(parse_timestamp).transpose()
    }
}
