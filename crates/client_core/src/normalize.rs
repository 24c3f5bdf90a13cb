//! Maps raw backend payloads into typed records.
//!
//! The backend wraps results inconsistently (`[...]`, `{data: [...]}`,
//! `{data: {data: [...]}}`, `{data: {records: [...]}}`, ...). This module is
//! the only place that knows about those envelopes.

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shared::protocol::EnumOption;

const LIST_KEYS: [&str; 3] = ["list", "records", "items"];

pub fn list<T: DeserializeOwned>(payload: Value) -> Result<Vec<T>> {
    let items = extract_array(payload)
        .ok_or_else(|| anyhow!("unexpected response shape: no list found"))?;
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item)
                .with_context(|| format!("malformed list entry at index {index}"))
        })
        .collect()
}

pub fn object<T: DeserializeOwned>(payload: Value) -> Result<T> {
    let record = extract_object(payload)
        .ok_or_else(|| anyhow!("unexpected response shape: no object found"))?;
    serde_json::from_value(Value::Object(record)).context("malformed record")
}

pub fn enum_options(payload: Value) -> Result<Vec<EnumOption>> {
    let items = extract_array(payload)
        .ok_or_else(|| anyhow!("unexpected response shape: no options found"))?;
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            enum_option(&item).ok_or_else(|| anyhow!("malformed enum option at index {index}"))
        })
        .collect()
}

fn extract_array(payload: Value) -> Option<Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Null => Some(Vec::new()),
        Value::Object(mut map) => {
            if let Some(data) = map.remove("data") {
                return extract_array(data);
            }
            LIST_KEYS.iter().find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
        }
        _ => None,
    }
}

fn extract_object(payload: Value) -> Option<Map<String, Value>> {
    let Value::Object(mut map) = payload else {
        return None;
    };
    match map.remove("data") {
        Some(inner @ Value::Object(_)) => extract_object(inner),
        Some(other) => {
            map.insert("data".to_string(), other);
            Some(map)
        }
        None => Some(map),
    }
}

fn enum_option(item: &Value) -> Option<EnumOption> {
    if let Some(text) = item.as_str() {
        return Some(EnumOption::new(text, text));
    }
    let value = ["value", "code", "id"]
        .iter()
        .find_map(|key| item.get(*key).and_then(scalar_text))?;
    let label = ["label", "name", "text"]
        .iter()
        .find_map(|key| item.get(*key).and_then(scalar_text))
        .unwrap_or_else(|| value.clone());
    Some(EnumOption { value, label })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;
