//! Stored property access.
//!
//! Items arrive from the store as a loose key-value map, the same shape a
//! block's properties have in the host application. Keys come in two forms
//! (`ib-a` as written, `ibA` as read back by the host), values may be JSON
//! numbers or numeric strings. Anything that does not parse is treated as
//! absent.

use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Raw key-value properties of a stored item.
pub type Properties = Map<String, Value>;

pub const KEY_A: &str = "ib-a";
pub const KEY_B: &str = "ib-b";
pub const KEY_SAMPLE: &str = "ib-sample";
pub const KEY_DUE: &str = "ib-due";

/// Date format used when writing due dates back.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// camelCase alias the host uses when reading a dashed key back.
pub fn alias(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Look up a key under either spelling, dashed form first.
pub fn lookup<'a>(props: &'a Properties, key: &str) -> Option<&'a Value> {
    props.get(key).or_else(|| props.get(&alias(key)))
}

/// Read a numeric property. Non-numeric and non-finite values are absent.
pub fn number(props: &Properties, key: &str) -> Option<f64> {
    let value = match lookup(props, key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Read a date property, either `YYYY-MM-DD` or a `yyyymmdd` journal day.
pub fn date(props: &Properties, key: &str) -> Option<NaiveDate> {
    match lookup(props, key)? {
        Value::String(s) => parse_date(s),
        Value::Number(n) => journal_day(n.as_i64()?),
        _ => None,
    }
}

/// Parse a date string in either accepted form.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Some(d);
    }
    if s.len() == 8 && s.chars().all(|c| c.is_ascii_digit()) {
        return journal_day(s.parse().ok()?);
    }
    None
}

fn journal_day(day: i64) -> Option<NaiveDate> {
    let year = i32::try_from(day / 10_000).ok()?;
    let month = u32::try_from(day / 100 % 100).ok()?;
    let dom = u32::try_from(day % 100).ok()?;
    NaiveDate::from_ymd_opt(year, month, dom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_alias_camel_case() {
        assert_eq!(alias("ib-a"), "ibA");
        assert_eq!(alias("ib-sample"), "ibSample");
        assert_eq!(alias("plain"), "plain");
    }

    #[test]
    fn test_number_from_number_and_string() {
        let p = props(json!({"ib-a": 2.5, "ibB": "3"}));
        assert_eq!(number(&p, KEY_A), Some(2.5));
        assert_eq!(number(&p, KEY_B), Some(3.0));
    }

    #[test]
    fn test_number_malformed_is_absent() {
        let p = props(json!({"ib-a": "abc", "ib-b": true, "ib-sample": "NaN"}));
        assert_eq!(number(&p, KEY_A), None);
        assert_eq!(number(&p, KEY_B), None);
        assert_eq!(number(&p, KEY_SAMPLE), None);
        assert_eq!(number(&p, "missing"), None);
    }

    #[test]
    fn test_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let p = props(json!({"ib-due": "2024-03-09"}));
        assert_eq!(date(&p, KEY_DUE), Some(expected));
        let p = props(json!({"ibDue": 20240309}));
        assert_eq!(date(&p, KEY_DUE), Some(expected));
        let p = props(json!({"ib-due": "20240309"}));
        assert_eq!(date(&p, KEY_DUE), Some(expected));
    }

    #[test]
    fn test_date_unparsable_is_absent() {
        let p = props(json!({"ib-due": "next tuesday"}));
        assert_eq!(date(&p, KEY_DUE), None);
        let p = props(json!({"ib-due": 20241345}));
        assert_eq!(date(&p, KEY_DUE), None);
    }
}
