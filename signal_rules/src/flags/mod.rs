//! Flag store - the persisted booleans and small values that gate the story.
//!
//! The core never owns the persistence format; it only talks to a [`FlagStore`].
//! Keys are opaque strings, written according to the conventions in [`keys`].

pub mod keys;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Value types for stored data entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<String>),
}

impl FlagValue {
    /// Interpret the value as a truth value.
    pub fn is_truthy(&self) -> bool {
        match self {
            FlagValue::Bool(b) => *b,
            FlagValue::Int(i) => *i != 0,
            FlagValue::Float(f) => *f != 0.0,
            FlagValue::String(s) => !s.is_empty(),
            FlagValue::List(items) => !items.is_empty(),
        }
    }

    /// Borrow the list payload, if this is a list.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FlagValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{}", b),
            FlagValue::Int(i) => write!(f, "{}", i),
            FlagValue::Float(v) => write!(f, "{}", v),
            FlagValue::String(s) => write!(f, "{}", s),
            FlagValue::List(items) => write!(f, "{}", items.join(",")),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Int(value)
    }
}

impl From<f64> for FlagValue {
    fn from(value: f64) -> Self {
        FlagValue::Float(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::String(value.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        FlagValue::String(value)
    }
}

impl From<Vec<String>> for FlagValue {
    fn from(value: Vec<String>) -> Self {
        FlagValue::List(value)
    }
}

/// Key-value persistence consumed by the narrative core.
///
/// Misses are not errors: an absent flag reads as `false` and absent data as `None`.
pub trait FlagStore {
    fn get_flag(&self, name: &str) -> bool;

    fn set_flag(&mut self, name: &str, value: bool);

    /// Every stored flag. Iteration order is unspecified.
    fn all_flags(&self) -> HashMap<String, bool>;

    /// Stored value of a flag, `None` if it was never written.
    fn lookup_flag(&self, name: &str) -> Option<bool> {
        self.all_flags().get(name).copied()
    }

    fn get_data(&self, key: &str) -> Option<FlagValue>;

    fn set_data(&mut self, key: &str, value: FlagValue);
}

/// In-memory flag store, serializable so a host can persist it however it likes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryFlagStore {
    #[serde(default)]
    flags: HashMap<String, bool>,
    #[serde(default)]
    data: HashMap<String, FlagValue>,
}

impl MemoryFlagStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style flag initialisation.
    pub fn with_flag(mut self, name: impl Into<String>, value: bool) -> Self {
        self.flags.insert(name.into(), value);
        self
    }

    /// Builder-style data initialisation.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Remove a flag, returning its previous value.
    pub fn remove_flag(&mut self, name: &str) -> Option<bool> {
        self.flags.remove(name)
    }

    /// Drop every flag and data entry.
    pub fn clear(&mut self) {
        self.flags.clear();
        self.data.clear();
    }

    pub fn flag_count(&self) -> usize {
        self.flags.len()
    }

    /// Serialize the whole store to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restore a store from JSON produced by [`MemoryFlagStore::to_json`].
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl FlagStore for MemoryFlagStore {
    fn get_flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    fn set_flag(&mut self, name: &str, value: bool) {
        self.flags.insert(name.to_string(), value);
    }

    fn all_flags(&self) -> HashMap<String, bool> {
        self.flags.clone()
    }

    fn lookup_flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).copied()
    }

    fn get_data(&self, key: &str) -> Option<FlagValue> {
        self.data.get(key).cloned()
    }

    fn set_data(&mut self, key: &str, value: FlagValue) {
        self.data.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_flag_is_false() {
        let store = MemoryFlagStore::new();
        assert!(!store.get_flag("never_set"));
        assert!(store.get_data("never_set").is_none());
        assert_eq!(store.lookup_flag("never_set"), None);
    }

    #[test]
    fn test_lookup_distinguishes_false_from_unset() {
        let store = MemoryFlagStore::new().with_flag("door_open", false);
        assert_eq!(store.lookup_flag("door_open"), Some(false));
        assert_eq!(store.lookup_flag("window_open"), None);
    }

    #[test]
    fn test_set_and_get() {
        let mut store = MemoryFlagStore::new();
        store.set_flag("radio_on", true);
        store.set_data("var_mood_value", FlagValue::from("tense"));

        assert!(store.get_flag("radio_on"));
        assert_eq!(
            store.get_data("var_mood_value"),
            Some(FlagValue::String("tense".into()))
        );
        assert_eq!(store.all_flags().len(), 1);
    }

    #[test]
    fn test_flag_value_display() {
        assert_eq!(FlagValue::Bool(true).to_string(), "true");
        assert_eq!(FlagValue::Int(42).to_string(), "42");
        assert_eq!(FlagValue::String("north".into()).to_string(), "north");
        assert_eq!(
            FlagValue::List(vec!["a".into(), "b".into()]).to_string(),
            "a,b"
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(FlagValue::Int(3).is_truthy());
        assert!(!FlagValue::Float(0.0).is_truthy());
        assert!(!FlagValue::String(String::new()).is_truthy());
        assert!(!FlagValue::List(vec![]).is_truthy());
    }

    #[test]
    fn test_json_persistence() {
        let store = MemoryFlagStore::new()
            .with_flag("event_intro", true)
            .with_data("narrative_history", vec!["intro".to_string()]);

        let json = store.to_json().unwrap();
        let restored = MemoryFlagStore::from_json(&json).unwrap();

        assert!(restored.get_flag("event_intro"));
        assert_eq!(
            restored.get_data("narrative_history"),
            Some(FlagValue::List(vec!["intro".into()]))
        );
    }
}
