//! Daily case and death series rebuilt from the stored raw payload.
//!
//! Each provider sub-record carries `cases` and `deaths` as dictionaries
//! keyed by `YYYY-MM-DD`, with `{ total, new }` per day. When the payload
//! has a country-wide `all` sub-record only that one is read. Otherwise all
//! regions are folded per date: cumulative totals take the maximum (regional
//! totals would double count), daily new values are summed.

use std::collections::BTreeMap;

use epi_map_covid_models::{
    CovidSeries, MetricStats, SeriesStats, TimeSeriesPoint, TimeSeriesResponse,
};
use epi_map_database::CountryStore;
use epi_map_source::shape::{coerce_number, find_aggregate};
use serde_json::Value;

use crate::AnalyticsError;

/// Per-date accumulator: `(total, new)`.
type DailyMap = BTreeMap<String, (f64, f64)>;

/// Builds the time-series view of one country.
///
/// A country without a record, or whose stored payload is not a non-empty
/// list, yields empty series and no stats.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store cannot be queried.
pub async fn build_series(
    store: &dyn CountryStore,
    name: &str,
) -> Result<TimeSeriesResponse, AnalyticsError> {
    let country = epi_map_geography::normalize(name);
    let record = store.find_by_key(&country).await?;

    let Some((country, items)) = record.and_then(|r| match r.raw {
        Some(Value::Array(items)) if !items.is_empty() => Some((r.country, items)),
        _ => None,
    }) else {
        log::debug!("No stored history for {country}");
        return Ok(TimeSeriesResponse {
            country,
            series: CovidSeries::default(),
            stats: None,
        });
    };

    let series = series_from_items(&items);
    let stats = series_stats(&series);

    Ok(TimeSeriesResponse {
        country,
        series,
        stats: Some(stats),
    })
}

/// Folds provider sub-records into ascending case and death series.
#[must_use]
pub fn series_from_items(items: &[Value]) -> CovidSeries {
    let mut cases = DailyMap::new();
    let mut deaths = DailyMap::new();

    let sources: Vec<&Value> =
        find_aggregate(items).map_or_else(|| items.iter().collect(), |all| vec![all]);

    for item in sources {
        accumulate(&mut cases, item.get("cases"));
        accumulate(&mut deaths, item.get("deaths"));
    }

    CovidSeries {
        cases: into_points(cases),
        deaths: into_points(deaths),
    }
}

fn accumulate(map: &mut DailyMap, metric: Option<&Value>) {
    let Some(days) = metric.and_then(Value::as_object) else {
        return;
    };

    for (date, day) in days {
        let total = day.get("total").and_then(coerce_number).unwrap_or(0.0);
        let new = day.get("new").and_then(coerce_number).unwrap_or(0.0);

        let entry = map.entry(date.clone()).or_insert((0.0, 0.0));
        entry.0 = entry.0.max(total);
        entry.1 += new;
    }
}

fn into_points(map: DailyMap) -> Vec<TimeSeriesPoint> {
    map.into_iter()
        .map(|(date, (total, new))| TimeSeriesPoint { date, total, new })
        .collect()
}

/// Summarizes one series. `None` when it is empty.
///
/// The peak is the first point holding the largest `new` value.
#[must_use]
pub fn metric_stats(points: &[TimeSeriesPoint]) -> Option<MetricStats> {
    let first = points.first()?;
    let last = points.last()?;

    let mut peak = first;
    for point in points {
        if point.new > peak.new {
            peak = point;
        }
    }

    Some(MetricStats {
        start_date: first.date.clone(),
        end_date: last.date.clone(),
        total: last.total,
        peak_new: peak.new,
        peak_date: peak.date.clone(),
    })
}

/// Combines case and death summaries. Dates come from the case series,
/// falling back to the death series.
#[must_use]
pub fn series_stats(series: &CovidSeries) -> SeriesStats {
    let cases = metric_stats(&series.cases);
    let deaths = metric_stats(&series.deaths);
    let dates = cases.as_ref().or(deaths.as_ref());

    SeriesStats {
        total_cases: cases.as_ref().map(|s| s.total),
        total_deaths: deaths.as_ref().map(|s| s.total),
        start_date: dates.map(|s| s.start_date.clone()),
        end_date: dates.map(|s| s.end_date.clone()),
        peak_daily_cases: cases.as_ref().map(|s| s.peak_new),
        peak_cases_date: cases.as_ref().map(|s| s.peak_date.clone()),
        peak_daily_deaths: deaths.as_ref().map(|s| s.peak_new),
        peak_deaths_date: deaths.map(|s| s.peak_date),
    }
}
