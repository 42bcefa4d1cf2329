//! Backup interchange: the collection as a JSON array of shift objects.
//!
//! Import is lenient per record and strict per batch: malformed records are
//! dropped and counted, but a batch without a single valid record fails.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde_json::{Map, Value};

use crate::engine::from_local;
use crate::limits::MAX_IMPORT_BYTES;
use crate::model::Shift;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    TooLarge(usize),
    Parse(String),
    NotAnArray,
    NoValidShifts { rejected: usize },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::TooLarge(len) => write!(f, "backup too large: {len} bytes"),
            ImportError::Parse(e) => write!(f, "failed to parse JSON: {e}"),
            ImportError::NotAnArray => write!(f, "invalid format: expected array"),
            ImportError::NoValidShifts { rejected } => {
                write!(f, "no valid shifts found ({rejected} rejected)")
            }
        }
    }
}

impl std::error::Error for ImportError {}

/// Serialize the collection as a pretty-printed JSON array.
pub fn export_json(shifts: &[Shift]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(shifts)
}

/// Parse a backup. Naive timestamps (no offset) are read as wall-clock time in `tz`.
pub fn parse_backup(text: &str, tz: Tz) -> Result<(Vec<Shift>, ImportReport), ImportError> {
    if text.len() > MAX_IMPORT_BYTES {
        return Err(ImportError::TooLarge(text.len()));
    }
    let root: Value = serde_json::from_str(text).map_err(|e| ImportError::Parse(e.to_string()))?;
    let Value::Array(records) = root else {
        return Err(ImportError::NotAnArray);
    };

    let mut seen = HashSet::new();
    let mut shifts = Vec::with_capacity(records.len());
    let mut rejected = 0usize;
    for (index, record) in records.into_iter().enumerate() {
        match validate_record(record, tz) {
            Ok(shift) if seen.insert(shift.id.clone()) => shifts.push(shift),
            Ok(shift) => {
                tracing::debug!(index, id = %shift.id, "import: duplicate id dropped");
                rejected += 1;
            }
            Err(reason) => {
                tracing::debug!(index, "import: record dropped: {reason}");
                rejected += 1;
            }
        }
    }

    if shifts.is_empty() {
        return Err(ImportError::NoValidShifts { rejected });
    }
    let report = ImportReport { imported: shifts.len(), rejected };
    Ok((shifts, report))
}

fn validate_record(record: Value, tz: Tz) -> Result<Shift, String> {
    let Value::Object(mut obj) = record else {
        return Err("not an object".into());
    };
    for key in ["id", "seriesId"] {
        match obj.get(key) {
            Some(Value::String(s)) if !s.is_empty() => {}
            _ => return Err(format!("{key} must be a non-empty string")),
        }
    }
    for key in ["title", "color"] {
        require_string(&obj, key)?;
    }
    let Some(&Value::Bool(recurring)) = obj.get("isRecurring") else {
        return Err("isRecurring must be a boolean".into());
    };
    let has_rule = !matches!(obj.get("repetition"), None | Some(Value::Null));
    if recurring != has_rule {
        return Err("repetition must be present exactly when isRecurring is true".into());
    }
    for key in ["start", "end"] {
        let raw = require_string(&obj, key)?;
        let instant = parse_timestamp(raw, tz).ok_or_else(|| format!("{key} is not a date: {raw}"))?;
        obj.insert(key.to_string(), Value::String(instant.to_rfc3339()));
    }
    serde_json::from_value(Value::Object(obj)).map_err(|e| e.to_string())
}

fn require_string<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a str, String> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(format!("{key} must be a string")),
    }
}

/// RFC 3339 (`2025-09-30T07:00:00.000Z`) or naive local (`2025-09-30T09:00[:00]`).
pub fn parse_timestamp(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| from_local(naive, tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn valid(id: &str) -> Value {
        json!({
            "id": id,
            "seriesId": format!("series-{id}"),
            "title": "Imported Shift",
            "start": "2025-09-30T09:00:00",
            "end": "2025-09-30T17:00:00",
            "color": "sky",
            "isRecurring": false
        })
    }

    fn parse(value: Value) -> Result<(Vec<Shift>, ImportReport), ImportError> {
        parse_backup(&value.to_string(), chrono_tz::UTC)
    }

    #[test]
    fn accepts_valid_and_counts_rejected() {
        let records = json!([
            valid("a"),
            valid("b"),
            valid("c"),
            {"invalid": "shift"},
            null
        ]);
        let (shifts, report) = parse(records).unwrap();
        assert_eq!(report, ImportReport { imported: 3, rejected: 2 });
        assert_eq!(shifts.len(), 3);
        assert_eq!(shifts[0].start, Utc.with_ymd_and_hms(2025, 9, 30, 9, 0, 0).unwrap());
    }

    #[test]
    fn whole_batch_failures() {
        assert!(matches!(parse_backup("invalid json", chrono_tz::UTC), Err(ImportError::Parse(_))));
        assert_eq!(parse(json!({"not": "array"})).unwrap_err(), ImportError::NotAnArray);
        assert_eq!(parse(json!([])).unwrap_err(), ImportError::NoValidShifts { rejected: 0 });
        assert_eq!(
            parse(json!([{"invalid": "shift"}])).unwrap_err(),
            ImportError::NoValidShifts { rejected: 1 }
        );
    }

    #[test]
    fn rejects_malformed_fields() {
        let mut bad_dates = valid("d");
        bad_dates["start"] = json!("not-a-date");
        let mut numeric_dates = valid("n");
        numeric_dates["start"] = json!(123456789);
        let mut null_title = valid("t");
        null_title["title"] = Value::Null;
        let mut unknown_color = valid("c");
        unknown_color["color"] = json!("mauve");
        let mut bad_rule = valid("r");
        bad_rule["isRecurring"] = json!(true);
        bad_rule["repetition"] = json!({"frequency": "hourly", "interval": 1});
        let mut string_flag = valid("f");
        string_flag["isRecurring"] = json!("false");
        let mut empty_id = valid("");
        empty_id["seriesId"] = json!("s");
        let mut recurring_without_rule = valid("w");
        recurring_without_rule["isRecurring"] = json!(true);
        let mut rule_without_flag = valid("x");
        rule_without_flag["repetition"] = json!({"frequency": "days", "interval": 1});

        for record in [
            bad_dates,
            numeric_dates,
            null_title,
            unknown_color,
            bad_rule,
            string_flag,
            empty_id,
            recurring_without_rule,
            rule_without_flag,
        ] {
            assert!(parse(json!([record.clone()])).is_err(), "accepted {record}");
        }
    }

    #[test]
    fn keeps_optional_extras() {
        let mut record = valid("x");
        record["overtimeHours"] = json!(2);
        record["allowances"] = json!([{"name": "Meal", "amount": 15}]);
        record["notes"] = json!("Test notes");
        record["timezone"] = json!("Europe/Rome");
        record["somethingElse"] = json!({"ignored": true});
        record["isRecurring"] = json!(true);
        record["repetition"] = json!({"frequency": "weeks", "interval": 1});

        let (shifts, _) = parse(json!([record])).unwrap();
        let s = &shifts[0];
        assert_eq!(s.overtime_hours, Some(2.0));
        assert_eq!(s.allowances.as_ref().unwrap()[0].amount, 15.0);
        assert_eq!(s.notes.as_deref(), Some("Test notes"));
        assert_eq!(s.timezone, Some(chrono_tz::Europe::Rome));
        assert!(s.repetition.is_some());
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let mut second = valid("same");
        second["title"] = json!("Second");
        let (shifts, report) = parse(json!([valid("same"), second])).unwrap();
        assert_eq!(report, ImportReport { imported: 1, rejected: 1 });
        assert_eq!(shifts[0].title, "Imported Shift");
    }

    #[test]
    fn naive_dates_use_given_zone() {
        let text = json!([valid("z")]).to_string();
        let (shifts, _) = parse_backup(&text, chrono_tz::Europe::Rome).unwrap();
        assert_eq!(shifts[0].start, Utc.with_ymd_and_hms(2025, 9, 30, 7, 0, 0).unwrap());
    }

    #[test]
    fn timestamp_formats() {
        let tz = chrono_tz::UTC;
        let expected = Utc.with_ymd_and_hms(2025, 9, 30, 7, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-09-30T07:00:00.000Z", tz), Some(expected));
        assert_eq!(parse_timestamp("2025-09-30T09:00:00+02:00", tz), Some(expected));
        assert_eq!(parse_timestamp("2025-09-30T07:00", tz), Some(expected));
        assert_eq!(parse_timestamp("2025-09-30T07:00:00.5", tz), Some(expected + chrono::TimeDelta::milliseconds(500)));
        assert_eq!(parse_timestamp("yesterday", tz), None);
    }

    #[test]
    fn export_then_import_preserves_collection() {
        let text = json!([valid("a"), valid("b")]).to_string();
        let (shifts, _) = parse_backup(&text, chrono_tz::UTC).unwrap();
        let exported = export_json(&shifts).unwrap();
        let (again, report) = parse_backup(&exported, chrono_tz::UTC).unwrap();
        assert_eq!(report.rejected, 0);
        assert_eq!(again, shifts);
    }
}
