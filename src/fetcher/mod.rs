//! Outbound provider clients and the defensive field access they share.
//! Nothing outside this module and the normalizer reads raw provider JSON.

pub mod comparables;
pub mod listings;

use std::time::Duration;

use serde_json::Value;

use crate::error::{AppError, Result};

pub use comparables::ComparablesClient;
pub use listings::ListingsClient;

/// Keys providers have been seen wrapping their record arrays in.
const WRAPPER_KEYS: &[&str] = &["listings", "results", "data", "properties", "homes"];

pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Pull the record array out of a provider body: either a bare array or an
/// object wrapping one under a known key.
pub fn records_from_body(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for key in WRAPPER_KEYS {
                if let Some(Value::Array(items)) = map.remove(*key) {
                    return Ok(items);
                }
            }
            Err(AppError::Upstream(
                "response object did not contain a record array".to_string(),
            ))
        }
        _ => Err(AppError::Upstream("response was not an array or object".to_string())),
    }
}

/// Numeric field that may arrive as a number or a string such as "$1,250,000".
pub fn number(v: &Value, key: &str) -> Option<f64> {
    v.get(key).and_then(as_number)
}

/// First key in `keys` holding a number.
pub fn first_number(v: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| number(v, k))
}

pub fn as_number(x: &Value) -> Option<f64> {
    let n = x.as_f64().or_else(|| {
        x.as_str().and_then(|s| {
            let cleaned: String = s.chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();
            cleaned.parse::<f64>().ok()
        })
    })?;
    n.is_finite().then_some(n)
}

/// Non-empty string field.
pub fn text(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(|s| s.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn first_text(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| text(v, k))
}
