//! Bulk parsing of event records.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;

use super::NarrativeEvent;
use crate::error::{NarrativeError, NarrativeResult};

/// Parse a JSON document holding either one record or an array of records.
pub(crate) fn parse_records<T: DeserializeOwned>(text: &str) -> NarrativeResult<Vec<T>> {
    match serde_json::from_str::<Value>(text)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(NarrativeError::from))
            .collect(),
        record @ Value::Object(_) => Ok(vec![serde_json::from_value(record)?]),
        Value::Null => Err(NarrativeError::InvalidShape("null")),
        Value::Bool(_) => Err(NarrativeError::InvalidShape("a boolean")),
        Value::Number(_) => Err(NarrativeError::InvalidShape("a number")),
        Value::String(_) => Err(NarrativeError::InvalidShape("a string")),
    }
}

/// Parse and validate a batch of events. Any failure rejects the whole batch.
pub fn parse_events(text: &str) -> NarrativeResult<Vec<NarrativeEvent>> {
    let events: Vec<NarrativeEvent> = parse_records(text)?;

    let mut seen = HashSet::new();
    for event in &events {
        event.validate()?;
        if !seen.insert(event.id.as_str()) {
            return Err(NarrativeError::DuplicateId(event.id.clone()));
        }
    }

    Ok(events)
}
