//! JSON <-> Value conversion utilities
//!
//! Dates travel as extended JSON, `{"$date": "2021-05-01T00:00:00Z"}`, which
//! is also how the document-store filter encodes date operands.

use chrono::SecondsFormat;

use crate::{Value, lexer::parse_date};

const DATE_KEY: &str = "$date";

/// Convert serde_json::Value to Value
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => {
            if let Some(date) = extended_date(&obj) {
                return Value::Date(date);
            }
            Value::Object(obj.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())
        }
    }
}

/// Convert Value to serde_json::Value
pub fn value_to_json(v: Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(b),
        Value::Integer(i) => serde_json::Value::Number(i.into()),
        Value::Float(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s),
        Value::Date(d) => date_to_json(&d),
        Value::Array(arr) => serde_json::Value::Array(arr.into_iter().map(value_to_json).collect()),
        Value::Object(obj) => {
            serde_json::Value::Object(obj.into_iter().map(|(k, v)| (k, value_to_json(v))).collect())
        }
    }
}

/// `{"$date": "<rfc3339>"}`
pub fn date_to_json(date: &chrono::DateTime<chrono::Utc>) -> serde_json::Value {
    serde_json::json!({ DATE_KEY: date.to_rfc3339_opts(SecondsFormat::AutoSi, true) })
}

fn extended_date(
    obj: &serde_json::Map<String, serde_json::Value>,
) -> Option<chrono::DateTime<chrono::Utc>> {
    if obj.len() != 1 {
        return None;
    }
    match obj.get(DATE_KEY)? {
        serde_json::Value::String(s) => parse_date(s),
        serde_json::Value::Number(n) => {
            n.as_i64().and_then(chrono::DateTime::from_timestamp_millis)
        }
        _ => None,
    }
}
