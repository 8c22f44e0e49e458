//! Field access helpers for flat entity records.

use crate::entity::Record;
use serde_json::Value;

pub const LABEL_STATUSES: &[&str] = &["active", "archived"];

/// `round(output / expected * 100)`; `None` when nothing was expected.
pub fn efficiency_percent(output: f64, expected: f64) -> Option<i64> {
    if expected == 0.0 || !expected.is_finite() || !output.is_finite() {
        return None;
    }
    Some((output / expected * 100.0).round() as i64)
}

/// Numeric field, accepting numbers and numeric strings. Missing or non-numeric reads as 0.
pub fn number(record: &Record, field: &str) -> f64 {
    match record.get(field) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

pub fn text<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

/// Largest integer id in `field` across `records`, 0 when there is none.
pub fn max_id<'a>(records: impl IntoIterator<Item = &'a Record>, field: &str) -> i64 {
    records
        .into_iter()
        .filter_map(|r| r.get(field))
        .filter_map(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn efficiency_rounds_to_whole_percent() {
        assert_eq!(efficiency_percent(1900.0, 2000.0), Some(95));
        assert_eq!(efficiency_percent(1.0, 3.0), Some(33));
        assert_eq!(efficiency_percent(5.0, 0.0), None);
    }

    #[test]
    fn number_reads_strings_and_defaults_to_zero() {
        let rec = json!({"a": 2.5, "b": "4", "c": "x"}).as_object().unwrap().clone();
        assert_eq!(number(&rec, "a"), 2.5);
        assert_eq!(number(&rec, "b"), 4.0);
        assert_eq!(number(&rec, "c"), 0.0);
        assert_eq!(number(&rec, "missing"), 0.0);
    }

    #[test]
    fn max_id_ignores_non_numeric() {
        let recs = vec![
            json!({"label_id": 2}).as_object().unwrap().clone(),
            json!({"label_id": "7"}).as_object().unwrap().clone(),
            json!({"label_id": null}).as_object().unwrap().clone(),
        ];
        assert_eq!(max_id(recs.iter(), "label_id"), 7);
        assert_eq!(max_id(Vec::<Record>::new().iter(), "label_id"), 0);
    }
}
