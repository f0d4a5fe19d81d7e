//! Structured conditions resolved against a live state snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use signal_rules::StateSnapshot;

use crate::error::{NarrativeError, NarrativeResult};

/// Comparison applied to the value found at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Equals,
    /// Path must exist and differ from the value.
    NotEquals,
    /// Path resolves to something other than null.
    Exists,
    NotExists,
    GreaterThan,
    LessThan,
    /// Array element equality or substring match.
    Contains,
    Truthy,
}

impl ConditionKind {
    fn needs_value(self) -> bool {
        !matches!(
            self,
            ConditionKind::Exists | ConditionKind::NotExists | ConditionKind::Truthy
        )
    }
}

/// `{ "type": "equals", "path": "player.location", "value": "lighthouse" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateCondition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl StateCondition {
    pub fn new(kind: ConditionKind, path: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            kind,
            path: path.into(),
            value,
        }
    }

    pub fn equals(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(ConditionKind::Equals, path, Some(value.into()))
    }

    pub fn exists(path: impl Into<String>) -> Self {
        Self::new(ConditionKind::Exists, path, None)
    }

    pub fn greater_than(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(ConditionKind::GreaterThan, path, Some(value.into()))
    }

    pub fn contains(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(ConditionKind::Contains, path, Some(value.into()))
    }

    /// Structural check run at load time.
    pub fn validate(&self) -> NarrativeResult<()> {
        if self.path.is_empty() {
            return Err(NarrativeError::MissingField { field: "path" });
        }
        if self.kind.needs_value() && self.value.is_none() {
            return Err(NarrativeError::MissingField { field: "value" });
        }
        Ok(())
    }

    pub fn evaluate(&self, snapshot: &StateSnapshot) -> bool {
        let found = snapshot.resolve(&self.path).filter(|v| !v.is_null());
        let expected = self.value.as_ref().unwrap_or(&Value::Null);

        match self.kind {
            ConditionKind::Exists => found.is_some(),
            ConditionKind::NotExists => found.is_none(),
            ConditionKind::Truthy => found.is_some_and(is_truthy),
            ConditionKind::Equals => found.is_some_and(|v| values_equal(v, expected)),
            ConditionKind::NotEquals => found.is_some_and(|v| !values_equal(v, expected)),
            ConditionKind::GreaterThan => compare(found, expected).is_some_and(|(a, b)| a > b),
            ConditionKind::LessThan => compare(found, expected).is_some_and(|(a, b)| a < b),
            ConditionKind::Contains => found.is_some_and(|v| match v {
                Value::Array(items) => items.iter().any(|item| values_equal(item, expected)),
                Value::String(s) => expected.as_str().is_some_and(|needle| s.contains(needle)),
                _ => false,
            }),
        }
    }
}

/// Logical AND over the conditions, stopping at the first miss.
pub fn all_met(conditions: &[StateCondition], snapshot: &StateSnapshot) -> bool {
    conditions.iter().all(|c| c.evaluate(snapshot))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(found: Option<&Value>, expected: &Value) -> Option<(f64, f64)> {
    Some((found?.as_f64()?, expected.as_f64()?))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}
