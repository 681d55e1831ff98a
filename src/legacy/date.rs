//! Legacy date filters.
//!
//! Legacy documents store `{type, data}` where `type` is `ndago` ("N days
//! ago", `data = {combobox, days_count}`), `range` (`data = {from, to}`) or
//! anything else for "no restriction".
//!
//! `ndago` compares the date against today minus N days, so "more recent than
//! N days" is `<` in the legacy vocabulary and `isAfter` in the new one.
//! Inclusive comparisons shift the day count by one because the new filter is
//! evaluated with strict boundaries on whole days.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;

use crate::model::{DateFilter, DateOperator, LegacyDateFilter};

fn days_count(data: &Value) -> Option<u32> {
    match data.get("days_count")? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn date_field(data: &Value, key: &str) -> Option<NaiveDate> {
    let raw = data.get(key)?.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }
    // Some writers stored a full timestamp.
    let day = raw.get(..10).unwrap_or(raw);
    match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(err) => {
            warn!(value = raw, error = %err, "ignoring unparsable legacy date");
            None
        }
    }
}

fn ndago(data: &Value) -> DateFilter {
    let Some(days) = days_count(data) else {
        warn!(data = %data, "legacy ndago filter without a day count");
        return DateFilter::any();
    };
    let combobox = data.get("combobox").and_then(Value::as_str).unwrap_or("");
    match combobox.trim() {
        "<" => DateFilter::relative(DateOperator::IsAfter, days),
        "<=" => DateFilter::relative(DateOperator::IsAfter, days.saturating_add(1)),
        ">" => DateFilter::relative(DateOperator::IsBefore, days),
        ">=" => DateFilter::relative(DateOperator::IsBefore, days.saturating_sub(1)),
        "=" => DateFilter::relative(DateOperator::IsEqual, days),
        other => {
            warn!(combobox = other, "unknown legacy date comparison");
            DateFilter::any()
        }
    }
}

/// Translate a legacy date filter; absent or unknown filters are unrestricted.
pub fn translate(filter: Option<&LegacyDateFilter>) -> DateFilter {
    let Some(filter) = filter else {
        return DateFilter::any();
    };
    match filter.filter_type.as_str() {
        "ndago" => ndago(&filter.data),
        "range" => {
            let from = date_field(&filter.data, "from");
            let to = date_field(&filter.data, "to");
            if from.is_none() && to.is_none() {
                DateFilter::any()
            } else {
                DateFilter::range(from, to)
            }
        }
        _ => DateFilter::any(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DateFilterType;
    use serde_json::json;

    fn legacy(filter_type: &str, data: Value) -> LegacyDateFilter {
        LegacyDateFilter {
            filter_type: filter_type.into(),
            data,
        }
    }

    fn ndago_filter(combobox: &str, days: Value) -> DateFilter {
        translate(Some(&legacy(
            "ndago",
            json!({"combobox": combobox, "days_count": days}),
        )))
    }

    #[test]
    fn test_inclusive_after_adds_a_day() {
        assert_eq!(
            ndago_filter("<=", json!(5)),
            DateFilter::relative(DateOperator::IsAfter, 6)
        );
    }

    #[test]
    fn test_inclusive_before_is_clamped() {
        assert_eq!(
            ndago_filter(">=", json!(0)),
            DateFilter::relative(DateOperator::IsBefore, 0)
        );
        assert_eq!(
            ndago_filter(">=", json!("3")),
            DateFilter::relative(DateOperator::IsBefore, 2)
        );
    }

    #[test]
    fn test_strict_and_equal() {
        assert_eq!(
            ndago_filter("<", json!(7)),
            DateFilter::relative(DateOperator::IsAfter, 7)
        );
        assert_eq!(
            ndago_filter(">", json!(7)),
            DateFilter::relative(DateOperator::IsBefore, 7)
        );
        assert_eq!(
            ndago_filter("=", json!(1)),
            DateFilter::relative(DateOperator::IsEqual, 1)
        );
    }

    #[test]
    fn test_bad_ndago_is_unrestricted() {
        assert!(ndago_filter("<>", json!(7)).any);
        assert!(ndago_filter("<", json!("soon")).any);
    }

    #[test]
    fn test_range() {
        let filter = translate(Some(&legacy(
            "range",
            json!({"from": "2024-01-01", "to": "2024-02-01 00:00:00"}),
        )));
        assert_eq!(filter.filter_type, DateFilterType::Range);
        assert_eq!(filter.from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(filter.to, NaiveDate::from_ymd_opt(2024, 2, 1));

        let empty = translate(Some(&legacy("range", json!({"from": "", "to": "x"}))));
        assert!(empty.any);
    }

    #[test]
    fn test_any_and_missing() {
        assert!(translate(Some(&legacy("any", Value::Null))).any);
        assert!(translate(None).any);
    }
}
