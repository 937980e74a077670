//! Ready-made [`ValueTransform`]s.
//!
//! Each one applies to a scalar, or element-wise to a list.

use crate::registry::ValueTransform;
use crate::value::Value;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use std::sync::Arc;

fn each<F>(f: F) -> ValueTransform
where
    F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
{
    Arc::new(move |value: Value| match value {
        Value::List(items) => items
            .into_iter()
            .map(&f)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        scalar => f(scalar),
    })
}

/// Strip surrounding whitespace from strings.
pub fn trim() -> ValueTransform {
    each(|value| match value {
        Value::String(s) => Ok(Value::String(s.trim().to_string())),
        other => Ok(other),
    })
}

pub fn lowercase() -> ValueTransform {
    each(|value| match value {
        Value::String(s) => Ok(Value::String(s.to_lowercase())),
        other => Ok(other),
    })
}

/// Parse numeric strings into integers; integers pass through.
pub fn integer() -> ValueTransform {
    each(|value| match value {
        Value::Int(n) => Ok(Value::Int(n)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("'{}' is not an integer", s)),
        Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Value::Int(f as i64)),
        other => Err(format!("expected an integer, got {}", other.type_name())),
    })
}

/// Accept `YYYY-MM-DD` or RFC 3339 strings.
///
/// Dates come back as `YYYY-MM-DD`; timestamps are normalised to UTC RFC 3339.
pub fn date() -> ValueTransform {
    each(|value| match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return Ok(Value::String(d.format("%Y-%m-%d").to_string()));
            }
            DateTime::parse_from_rfc3339(s)
                .map(|dt| {
                    Value::String(
                        dt.with_timezone(&Utc)
                            .to_rfc3339_opts(SecondsFormat::AutoSi, true),
                    )
                })
                .map_err(|_| format!("'{}' is not a date", s))
        }
        other => Err(format!("expected a date string, got {}", other.type_name())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_and_lowercase() {
        assert_eq!(trim()(Value::from("  a ")), Ok(Value::from("a")));
        assert_eq!(lowercase()(Value::from("AbC")), Ok(Value::from("abc")));
        assert_eq!(lowercase()(Value::Int(3)), Ok(Value::Int(3)));
    }

    #[test]
    fn test_integer() {
        assert_eq!(integer()(Value::from(" 42")), Ok(Value::Int(42)));
        assert_eq!(integer()(Value::Float(7.0)), Ok(Value::Int(7)));
        assert!(integer()(Value::from("4x")).is_err());
        assert!(integer()(Value::Bool(true)).is_err());
    }

    #[test]
    fn test_date() {
        assert_eq!(date()(Value::from("2024-02-29")), Ok(Value::from("2024-02-29")));
        assert_eq!(
            date()(Value::from("2024-03-01T10:00:00+02:00")),
            Ok(Value::from("2024-03-01T08:00:00Z"))
        );
        assert!(date()(Value::from("2023-02-29")).is_err());
    }

    #[test]
    fn test_lists_are_mapped_element_wise() {
        let list = Value::List(vec!["1".into(), "2".into()]);
        assert_eq!(
            integer()(list),
            Ok(Value::List(vec![Value::Int(1), Value::Int(2)]))
        );

        let list = Value::List(vec!["1".into(), "two".into()]);
        assert!(integer()(list).is_err());
    }
}
