//! Wire-level types for the PowerSchool named-query API, plus lenient
//! field accessors for the loosely-typed records it returns.
//!
//! PowerSchool serializes numeric columns inconsistently (sometimes JSON
//! numbers, sometimes strings), so every accessor tolerates both forms.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

/// OAuth token response from the SIS token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Response envelope for a named-query page.
///
/// A page past the end of the result set omits `record` entirely, which
/// deserializes to an empty vec.
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub record: Vec<Value>,
}

/// Read a string field, trimmed; empty strings become `None`.
pub fn field_str(record: &Value, key: &str) -> Option<String> {
    let raw = record.get(key)?;
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Read an integer field, accepting both numeric and string encodings.
pub fn field_i64(record: &Value, key: &str) -> Option<i64> {
    match record.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a float field, accepting both numeric and string encodings.
pub fn field_f64(record: &Value, key: &str) -> Option<f64> {
    match record.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a boolean field; PowerSchool exports booleans as 0/1, "0"/"1",
/// "true"/"false", or actual JSON booleans depending on the column.
pub fn field_bool(record: &Value, key: &str) -> Option<bool> {
    match record.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        Value::String(s) => match s.trim() {
            "1" | "true" | "True" => Some(true),
            "0" | "false" | "False" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Read an ISO date field ("YYYY-MM-DD").
pub fn field_date(record: &Value, key: &str) -> Option<NaiveDate> {
    let text = field_str(record, key)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").ok()
}
