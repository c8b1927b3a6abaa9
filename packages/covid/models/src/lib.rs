#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Country-level epidemiological record types.
//!
//! These types are shared by the refresh pipeline (which writes
//! [`CountryRecord`]s), the store-backed readers (which turn them into
//! [`CountryDto`]s), and the time-series aggregator. JSON field names are
//! camelCase to stay compatible with the dashboard frontend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Hex color used for countries without data.
pub const DEFAULT_GREY_HEX: &str = "#B0B0B0";

/// A persisted per-country record, keyed by canonical country name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryRecord {
    /// Canonical country name (the persistence key).
    pub country: String,
    /// Cumulative confirmed cases, if known.
    pub cases_total: Option<f64>,
    /// Cumulative deaths, if known.
    pub deaths_total: Option<f64>,
    /// Whether at least one of the totals is known.
    pub has_data: bool,
    /// Message of the most recent failed refresh, if any.
    pub last_error: Option<String>,
    /// Full unshaped upstream payload from the last successful fetch.
    pub raw: Option<serde_json::Value>,
    /// When the record was first written.
    pub created_at: DateTime<Utc>,
    /// When the record was last refreshed (successfully or not).
    pub updated_at: DateTime<Utc>,
}

/// Totals extracted from a raw upstream payload for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapedRecord {
    /// Canonical country name.
    pub country: String,
    /// Cumulative confirmed cases.
    pub cases_total: Option<f64>,
    /// Cumulative deaths.
    pub deaths_total: Option<f64>,
    /// `true` iff either total is present.
    pub has_data: bool,
}

impl ShapedRecord {
    /// Creates a record with no known totals.
    #[must_use]
    pub fn empty(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            cases_total: None,
            deaths_total: None,
            has_data: false,
        }
    }

    /// Creates a record from extracted totals, deriving `has_data`.
    #[must_use]
    pub fn new(
        country: impl Into<String>,
        cases_total: Option<f64>,
        deaths_total: Option<f64>,
    ) -> Self {
        Self {
            country: country.into(),
            cases_total,
            deaths_total,
            has_data: cases_total.is_some() || deaths_total.is_some(),
        }
    }
}

/// Outcome of one refresh attempt, as written to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum CountryUpdate {
    /// The upstream fetch succeeded; totals and payload replace the old ones
    /// and any previous error is cleared.
    Fetched {
        /// Shaped totals.
        shaped: ShapedRecord,
        /// Raw upstream payload, kept for time-series reconstruction.
        raw: serde_json::Value,
    },
    /// The upstream fetch failed. Only `last_error` and `updated_at` change
    /// on an existing record; previously known totals are kept.
    Failed {
        /// Failure message.
        error: String,
    },
}

/// A country snapshot as returned by the readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryDto {
    /// Canonical country name.
    pub country: String,
    /// Cumulative confirmed cases.
    pub cases_total: Option<f64>,
    /// Cumulative deaths.
    pub deaths_total: Option<f64>,
    /// Choropleth color for this country.
    pub color_hex: String,
    /// Whether any totals are known.
    pub has_data: bool,
}

impl CountryDto {
    /// Zero-value snapshot for a country that has never been fetched.
    #[must_use]
    pub fn placeholder(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            cases_total: None,
            deaths_total: None,
            color_hex: DEFAULT_GREY_HEX.to_string(),
            has_data: false,
        }
    }
}

impl From<&CountryRecord> for CountryDto {
    fn from(record: &CountryRecord) -> Self {
        Self {
            country: record.country.clone(),
            cases_total: record.cases_total,
            deaths_total: record.deaths_total,
            color_hex: DEFAULT_GREY_HEX.to_string(),
            has_data: record.has_data,
        }
    }
}

/// Snapshot of several countries colored relative to the batch maximum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// Largest known `cases_total` in the batch, or `0` if none is known.
    pub max_value: f64,
    /// One entry per distinct requested country, in request order.
    pub results: Vec<CountryDto>,
}

/// One day of a cumulative/daily series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Date as `YYYY-MM-DD`.
    pub date: String,
    /// Cumulative total on this date.
    pub total: f64,
    /// New count reported on this date.
    pub new: f64,
}

/// Case and death series for one country.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CovidSeries {
    /// Case series, ascending by date.
    pub cases: Vec<TimeSeriesPoint>,
    /// Death series, ascending by date.
    pub deaths: Vec<TimeSeriesPoint>,
}

/// Summary of a single series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStats {
    /// First date in the series.
    pub start_date: String,
    /// Last date in the series.
    pub end_date: String,
    /// Cumulative total at the last date.
    pub total: f64,
    /// Largest daily new value.
    pub peak_new: f64,
    /// Date of the first point reaching `peak_new`.
    pub peak_date: String,
}

/// Combined summary of the case and death series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesStats {
    /// Cumulative cases at the last date.
    pub total_cases: Option<f64>,
    /// Cumulative deaths at the last date.
    pub total_deaths: Option<f64>,
    /// First date (cases first, deaths as fallback).
    pub start_date: Option<String>,
    /// Last date (cases first, deaths as fallback).
    pub end_date: Option<String>,
    /// Largest daily case count.
    pub peak_daily_cases: Option<f64>,
    /// Date of the largest daily case count.
    pub peak_cases_date: Option<String>,
    /// Largest daily death count.
    pub peak_daily_deaths: Option<f64>,
    /// Date of the largest daily death count.
    pub peak_deaths_date: Option<String>,
}

/// Time-series view of one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesResponse {
    /// Canonical country name.
    pub country: String,
    /// Aggregated series.
    pub series: CovidSeries,
    /// Summary, or `None` when no historical data is stored.
    pub stats: Option<SeriesStats>,
}

/// Named stops of the three-stop color gradient.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
)]
pub enum ScaleStop {
    /// Low end of the scale (`t = 0`).
    Low,
    /// Midpoint of the scale (`t = 0.5`).
    Medium,
    /// High end of the scale (`t = 1`).
    High,
}

/// One stop of the legend gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendStop {
    /// Position on the normalized scale (`0.0..=1.0`).
    pub position: f64,
    /// Hex color at this position.
    pub color: String,
    /// Stop label.
    pub label: ScaleStop,
}

/// Legend metadata for the choropleth gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Legend {
    /// Color used for countries without data.
    pub default_color: String,
    /// Gradient stops, ascending by position.
    pub stops: Vec<LegendStop>,
    /// Maximum value the gradient is scaled to, if known.
    pub max_value: Option<f64>,
}
