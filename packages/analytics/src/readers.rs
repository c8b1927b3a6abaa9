//! Store-backed country snapshots.
//!
//! These only read what the refresh worker has already persisted. A country
//! that was never fetched comes back as a zero-value placeholder.

use std::collections::BTreeMap;

use epi_map_covid_models::{BatchResult, CountryDto, CountryRecord};
use epi_map_database::CountryStore;

use crate::AnalyticsError;
use crate::color::color_hex;

/// Snapshot of one country.
///
/// `name` is normalized before the lookup. When `max` is given the color is
/// scaled against it; otherwise the default grey is used.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store cannot be queried.
pub async fn get_one(
    store: &dyn CountryStore,
    name: &str,
    max: Option<f64>,
) -> Result<CountryDto, AnalyticsError> {
    let country = epi_map_geography::normalize(name);

    let mut dto = store
        .find_by_key(&country)
        .await?
        .as_ref()
        .map_or_else(|| CountryDto::placeholder(&country), CountryDto::from);

    if let Some(max) = max {
        dto.color_hex = color_hex(dto.cases_total, max);
    }

    Ok(dto)
}

/// Snapshots of several countries colored relative to the largest known
/// case total among them.
///
/// Names are normalized and de-duplicated (first occurrence wins the
/// position) and resolved with a single store query.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store cannot be queried.
pub async fn get_batch<I>(store: &dyn CountryStore, names: I) -> Result<BatchResult, AnalyticsError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let names = epi_map_geography::normalize_all(names);

    let found: BTreeMap<String, CountryRecord> = store
        .find_many(&names)
        .await?
        .into_iter()
        .map(|r| (r.country.clone(), r))
        .collect();

    let mut results: Vec<CountryDto> = names
        .iter()
        .map(|name| {
            found
                .get(name)
                .map_or_else(|| CountryDto::placeholder(name), CountryDto::from)
        })
        .collect();

    let max_value = results
        .iter()
        .filter_map(|r| r.cases_total)
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);

    for result in &mut results {
        result.color_hex = color_hex(result.cases_total, max_value);
    }

    log::debug!(
        "Batch of {} countries resolved {} stored records (max={max_value})",
        results.len(),
        found.len()
    );

    Ok(BatchResult { max_value, results })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use epi_map_covid_models::{CountryUpdate, DEFAULT_GREY_HEX, ShapedRecord};
    use epi_map_database::MemoryCountryStore;
    use serde_json::json;

    use super::*;

    async fn store_with(entries: &[(&str, Option<f64>)]) -> MemoryCountryStore {
        let store = MemoryCountryStore::new();
        for (country, cases) in entries {
            store
                .upsert(
                    country,
                    CountryUpdate::Fetched {
                        shaped: ShapedRecord::new(*country, *cases, None),
                        raw: json!([]),
                    },
                    Utc::now(),
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn unknown_country_batch_is_a_grey_placeholder() {
        let store = MemoryCountryStore::new();

        let batch = get_batch(&store, ["Wakanda"]).await.unwrap();

        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!({
                "maxValue": 0.0,
                "results": [{
                    "country": "Wakanda",
                    "casesTotal": null,
                    "deathsTotal": null,
                    "colorHex": "#B0B0B0",
                    "hasData": false,
                }],
            })
        );
    }

    #[tokio::test]
    async fn batch_colors_relative_to_largest_known_total() {
        let store = store_with(&[
            ("United States", Some(1000.0)),
            ("France", Some(500.0)),
            ("Chad", None),
        ])
        .await;

        let batch = get_batch(&store, ["USA", "France", "Chad", "Wakanda", "United States"])
            .await
            .unwrap();

        assert!((batch.max_value - 1000.0).abs() < f64::EPSILON);
        let countries: Vec<&str> = batch.results.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(countries, vec!["United States", "France", "Chad", "Wakanda"]);

        for entry in &batch.results {
            assert_eq!(entry.color_hex, color_hex(entry.cases_total, batch.max_value));
        }
        assert_eq!(batch.results[0].color_hex, "#8B0000");
        assert_eq!(batch.results[1].color_hex, "#FFFF00");
        assert_eq!(batch.results[2].color_hex, DEFAULT_GREY_HEX);
        assert!(!batch.results[3].has_data);
    }

    #[tokio::test]
    async fn batch_without_any_data_has_zero_max() {
        let store = store_with(&[("Chad", None)]).await;

        let batch = get_batch(&store, ["Chad"]).await.unwrap();

        assert!(batch.max_value.abs() < f64::EPSILON);
        assert_eq!(batch.results[0].color_hex, DEFAULT_GREY_HEX);
    }

    #[tokio::test]
    async fn get_one_normalizes_and_falls_back_to_placeholder() {
        let store = store_with(&[("United Kingdom", Some(50.0))]).await;

        let found = get_one(&store, " uk ", None).await.unwrap();
        assert_eq!(found.country, "United Kingdom");
        assert_eq!(found.cases_total, Some(50.0));
        assert!(found.has_data);
        assert_eq!(found.color_hex, DEFAULT_GREY_HEX);

        let missing = get_one(&store, "Atlantis", Some(100.0)).await.unwrap();
        assert_eq!(missing, CountryDto::placeholder("Atlantis"));
    }

    #[tokio::test]
    async fn get_one_colors_against_supplied_max() {
        let store = store_with(&[("Peru", Some(50.0))]).await;

        let dto = get_one(&store, "Peru", Some(100.0)).await.unwrap();

        assert_eq!(dto.color_hex, "#FFFF00");
    }
}
