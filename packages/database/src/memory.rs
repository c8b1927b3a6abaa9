//! In-memory [`CountryStore`].
//!
//! Nothing survives a restart. Used by tests and when no database file is
//! wanted.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use epi_map_covid_models::{CountryRecord, CountryUpdate};

use crate::{CountryStore, DbError, apply_update};

/// Country records kept in a `BTreeMap` keyed by canonical name.
#[derive(Debug, Default)]
pub struct MemoryCountryStore {
    records: Mutex<BTreeMap<String, CountryRecord>>,
}

impl MemoryCountryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, CountryRecord>>, DbError> {
        self.records.lock().map_err(|_| DbError::Poisoned)
    }
}

#[async_trait]
impl CountryStore for MemoryCountryStore {
    async fn find_by_key(&self, country: &str) -> Result<Option<CountryRecord>, DbError> {
        Ok(self.lock()?.get(country).cloned())
    }

    async fn find_many(&self, countries: &[String]) -> Result<Vec<CountryRecord>, DbError> {
        let records = self.lock()?;
        Ok(countries
            .iter()
            .filter_map(|c| records.get(c).cloned())
            .collect())
    }

    async fn upsert(
        &self,
        country: &str,
        update: CountryUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let mut records = self.lock()?;
        let existing = records.remove(country);
        records.insert(
            country.to_string(),
            apply_update(existing, country, update, at),
        );
        Ok(())
    }

    async fn distinct_keys(&self) -> Result<Vec<String>, DbError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    async fn count(&self) -> Result<u64, DbError> {
        u64::try_from(self.lock()?.len()).map_err(|e| DbError::Conversion {
            message: e.to_string(),
        })
    }

    async fn latest_update(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        Ok(self.lock()?.values().map(|r| r.updated_at).max())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use epi_map_covid_models::ShapedRecord;
    use serde_json::json;

    use super::*;

    fn fetched(country: &str, cases: f64) -> CountryUpdate {
        CountryUpdate::Fetched {
            shaped: ShapedRecord::new(country, Some(cases), None),
            raw: json!([{ "country": country }]),
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_overwrites_a_single_record() {
        let store = MemoryCountryStore::new();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();

        store.upsert("Peru", fetched("Peru", 10.0), t1).await.unwrap();
        store.upsert("Peru", fetched("Peru", 20.0), t2).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let record = store.find_by_key("Peru").await.unwrap().unwrap();
        assert_eq!(record.cases_total, Some(20.0));
        assert_eq!(record.created_at, t1);
        assert_eq!(store.latest_update().await.unwrap(), Some(t2));
    }

    #[tokio::test]
    async fn find_many_skips_unknown_keys() {
        let store = MemoryCountryStore::new();
        let now = Utc::now();
        store.upsert("Peru", fetched("Peru", 1.0), now).await.unwrap();
        store.upsert("Chile", fetched("Chile", 2.0), now).await.unwrap();

        let found = store
            .find_many(&["Chile".to_string(), "Wakanda".to_string()])
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].country, "Chile");
        assert_eq!(
            store.distinct_keys().await.unwrap(),
            vec!["Chile".to_string(), "Peru".to_string()]
        );
    }

    #[tokio::test]
    async fn empty_store_has_no_latest_update() {
        let store = MemoryCountryStore::new();
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.latest_update().await.unwrap(), None);
        assert!(store.find_by_key("Peru").await.unwrap().is_none());
    }
}
