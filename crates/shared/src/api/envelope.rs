//! Typed response envelopes
//!
//! List endpoints answer either with a bare JSON array or with a paginated
//! object carrying `results`. Anything else is a decoding failure; nothing
//! silently defaults to an empty collection.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{IdmsError, IdmsResult};

/// Paginated list response
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// Decode a list endpoint response into a page.
///
/// A bare array becomes a page with `count` set to its length.
pub fn decode_list<T: DeserializeOwned>(value: Value) -> IdmsResult<Page<T>> {
    match value {
        Value::Array(_) => {
            let results: Vec<T> = serde_json::from_value(value)?;
            Ok(Page {
                count: Some(results.len()),
                next: None,
                previous: None,
                results,
            })
        }
        Value::Object(ref map) if map.contains_key("results") => Ok(serde_json::from_value(value)?),
        other => Err(IdmsError::Decode(format!(
            "expected a list or a paginated object, got {}",
            shape_of(&other)
        ))),
    }
}

/// Decode a single-object response
pub fn decode_one<T: DeserializeOwned>(value: Value) -> IdmsResult<T> {
    match value {
        Value::Object(_) => Ok(serde_json::from_value(value)?),
        other => Err(IdmsError::Decode(format!("expected an object, got {}", shape_of(&other)))),
    }
}

fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object without results",
    }
}
