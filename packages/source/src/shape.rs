//! Shapes raw provider payloads into per-country totals.
//!
//! The provider returns either a single object or a list of regional
//! sub-records. A sub-record labelled `all` is the country-wide aggregate;
//! without one, the sub-record with the largest case total stands in for the
//! country.

use epi_map_covid_models::ShapedRecord;
use serde_json::Value;

/// Fields that may carry a sub-record's region label, in priority order.
const REGION_FIELDS: [&str; 3] = ["region", "province", "state"];

/// Label of the country-wide aggregate sub-record.
const AGGREGATE_LABEL: &str = "all";

/// Returns the first non-empty string among `region`, `province`, `state`.
#[must_use]
pub fn region_label(item: &Value) -> Option<&str> {
    REGION_FIELDS
        .iter()
        .filter_map(|field| item.get(field).and_then(Value::as_str))
        .find(|label| !label.is_empty())
}

/// Returns `true` if `item` is the country-wide aggregate sub-record.
#[must_use]
pub fn is_aggregate(item: &Value) -> bool {
    region_label(item).is_some_and(|label| label.eq_ignore_ascii_case(AGGREGATE_LABEL))
}

/// Finds the aggregate sub-record in a list payload.
#[must_use]
pub fn find_aggregate(items: &[Value]) -> Option<&Value> {
    items.iter().find(|item| is_aggregate(item))
}

/// Coerces a JSON number or numeric string to a finite `f64`.
#[must_use]
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// Reads the cumulative total of `metric` (`"cases"` or `"deaths"`).
///
/// Accepts `{ "total": n }` directly. When that is absent and the metric is
/// a date-keyed dictionary (`{ "2023-03-09": { "total": n, "new": m } }`),
/// the total of the latest date is used.
#[must_use]
pub fn metric_total(item: &Value, metric: &str) -> Option<f64> {
    let metric = item.get(metric)?;

    if let Some(total) = metric.get("total") {
        return coerce_number(total);
    }

    metric
        .as_object()?
        .iter()
        .filter(|(_, point)| point.is_object())
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .and_then(|(_, point)| point.get("total"))
        .and_then(coerce_number)
}

/// Picks the sub-record that best represents the whole country.
///
/// The aggregate wins when present; otherwise the largest case total, with
/// ties going to the earliest sub-record. Unknown totals count as zero.
#[must_use]
pub fn pick_best(items: &[Value]) -> Option<&Value> {
    if let Some(aggregate) = find_aggregate(items) {
        return Some(aggregate);
    }

    let mut best: Option<(&Value, f64)> = None;
    for item in items {
        let total = metric_total(item, "cases").unwrap_or(0.0);
        match best {
            Some((_, best_total)) if total <= best_total => {}
            _ => best = Some((item, total)),
        }
    }
    best.map(|(item, _)| item)
}

/// Shapes `raw` into totals for `country`.
///
/// An empty list, `null`, or any non-object payload yields a record with
/// no totals and `has_data == false`.
#[must_use]
pub fn shape(country: &str, raw: &Value) -> ShapedRecord {
    let best = match raw {
        Value::Array(items) => pick_best(items),
        Value::Object(_) => Some(raw),
        _ => None,
    };

    let Some(best) = best.filter(|b| b.is_object()) else {
        log::debug!("No usable sub-record in payload for {country}");
        return ShapedRecord::empty(country);
    };

    ShapedRecord::new(
        country,
        metric_total(best, "cases"),
        metric_total(best, "deaths"),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn prefers_the_all_sub_record() {
        let raw = json!([
            { "country": "Canada", "region": "Ontario", "cases": { "total": 900 }, "deaths": { "total": 9 } },
            { "country": "Canada", "region": "ALL", "cases": { "total": 500 }, "deaths": { "total": 5 } },
        ]);

        let shaped = shape("Canada", &raw);

        assert_eq!(shaped.cases_total, Some(500.0));
        assert_eq!(shaped.deaths_total, Some(5.0));
        assert!(shaped.has_data);
    }

    #[test]
    fn aggregate_label_may_come_from_province_or_state() {
        assert!(is_aggregate(&json!({ "region": "", "province": "All" })));
        assert!(is_aggregate(&json!({ "state": "all" })));
        assert!(!is_aggregate(&json!({ "region": "Alberta", "state": "all" })));
        assert!(!is_aggregate(&json!({ "country": "France" })));
        assert!(!is_aggregate(&json!({ "region": " all " })));
    }

    #[test]
    fn falls_back_to_largest_case_total_with_first_seen_ties() {
        let raw = json!([
            { "region": "A", "cases": { "total": 10 }, "deaths": { "total": 1 } },
            { "region": "B", "cases": { "total": "30" }, "deaths": { "total": 2 } },
            { "region": "C", "cases": { "total": 30 }, "deaths": { "total": 3 } },
        ]);

        let shaped = shape("Somewhere", &raw);

        assert_eq!(shaped.cases_total, Some(30.0));
        assert_eq!(shaped.deaths_total, Some(2.0));
    }

    #[test]
    fn reads_latest_date_from_date_keyed_metrics() {
        let raw = json!([{
            "country": "France",
            "region": "",
            "cases": {
                "2023-03-08": { "total": 100, "new": 4 },
                "2023-03-09": { "total": 104, "new": 4 },
                "2023-03-07": { "total": 96, "new": 1 },
            },
            "deaths": {
                "2023-03-09": { "total": 7, "new": 0 },
            },
        }]);

        let shaped = shape("France", &raw);

        assert_eq!(shaped.cases_total, Some(104.0));
        assert_eq!(shaped.deaths_total, Some(7.0));
    }

    #[test]
    fn empty_or_missing_payload_has_no_data() {
        for raw in [json!([]), Value::Null, json!("nope"), json!([null])] {
            let shaped = shape("Wakanda", &raw);
            assert_eq!(shaped.country, "Wakanda");
            assert_eq!(shaped.cases_total, None);
            assert_eq!(shaped.deaths_total, None);
            assert!(!shaped.has_data, "payload {raw}");
        }
    }

    #[test]
    fn single_object_payload_is_used_directly() {
        let shaped = shape("Chile", &json!({ "cases": { "total": 12 } }));
        assert_eq!(shaped.cases_total, Some(12.0));
        assert_eq!(shaped.deaths_total, None);
        assert!(shaped.has_data);
    }

    #[test]
    fn coerces_numeric_strings_and_rejects_junk() {
        assert_eq!(coerce_number(&json!(" 42 ")), Some(42.0));
        assert_eq!(coerce_number(&json!(1.5)), Some(1.5));
        assert_eq!(coerce_number(&json!("")), None);
        assert_eq!(coerce_number(&json!("NaN")), None);
        assert_eq!(coerce_number(&json!("inf")), None);
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!(true)), None);
        assert_eq!(coerce_number(&Value::Null), None);
    }

    #[test]
    fn non_numeric_totals_leave_has_data_false() {
        let shaped = shape(
            "Nowhere",
            &json!([{ "cases": { "total": "n/a" }, "deaths": { "total": null } }]),
        );
        assert_eq!(shaped.cases_total, None);
        assert!(!shaped.has_data);
    }
}
