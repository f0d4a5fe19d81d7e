//! Condition evaluation - the small predicate language that gates the story.
//!
//! Two forms share this module:
//! - **String conditions** on events and choices, parsed once into a [`Condition`]
//!   tree and evaluated against a [`ConditionContext`] (flags, variables, history).
//! - **State conditions** on triggers, structured records resolved against a
//!   [`StateSnapshot`](signal_rules::StateSnapshot) (see [`StateCondition`]).
//!
//! Evaluation never fails. Unknown names and paths read as "not met".

mod state;

pub use state::*;

use serde::{Deserialize, Serialize};
use signal_rules::{keys, FlagStore};
use std::fmt;

/// A parsed string condition.
///
/// Grammar, checked in this order:
/// - `!<expr>` negation
/// - `<name>=<value>` string equality against a variable
/// - `event_<id>` the event appears in history
/// - `<flag>` boolean flag lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Condition {
    Not(Box<Condition>),
    Equals { name: String, value: String },
    EventSeen(String),
    Flag(String),
}

/// Read access the string grammar needs.
pub trait ConditionContext {
    fn flag(&self, name: &str) -> bool;

    /// Current value of a variable rendered as a string, if any.
    fn value(&self, name: &str) -> Option<String>;

    fn event_seen(&self, event_id: &str) -> bool;
}

impl Condition {
    pub fn parse(expr: &str) -> Self {
        if let Some(inner) = expr.strip_prefix('!') {
            return Condition::Not(Box::new(Condition::parse(inner)));
        }
        if let Some((name, value)) = expr.split_once('=') {
            return Condition::Equals {
                name: name.to_string(),
                value: value.to_string(),
            };
        }
        if let Some(id) = expr.strip_prefix(keys::EVENT_PREFIX) {
            return Condition::EventSeen(id.to_string());
        }
        Condition::Flag(expr.to_string())
    }

    /// Evaluate the condition. The inner expression of a negation is always evaluated.
    pub fn evaluate(&self, ctx: &dyn ConditionContext) -> bool {
        match self {
            Condition::Not(inner) => !inner.evaluate(ctx),
            Condition::Equals { name, value } => {
                ctx.value(name).is_some_and(|current| current == *value)
            }
            Condition::EventSeen(id) => ctx.event_seen(id),
            Condition::Flag(name) => ctx.flag(name),
        }
    }
}

impl From<&str> for Condition {
    fn from(expr: &str) -> Self {
        Condition::parse(expr)
    }
}

impl From<String> for Condition {
    fn from(expr: String) -> Self {
        Condition::parse(&expr)
    }
}

impl From<Condition> for String {
    fn from(condition: Condition) -> Self {
        condition.to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Not(inner) => write!(f, "!{}", inner),
            Condition::Equals { name, value } => write!(f, "{}={}", name, value),
            Condition::EventSeen(id) => write!(f, "{}{}", keys::EVENT_PREFIX, id),
            Condition::Flag(name) => write!(f, "{}", name),
        }
    }
}

/// Evaluate a raw condition string in one step.
pub fn evaluate(expr: &str, ctx: &dyn ConditionContext) -> bool {
    Condition::parse(expr).evaluate(ctx)
}

/// Context backed by a flag store alone.
///
/// History comes from `event_<id>` flags and variables from `var_<name>_value`
/// data, falling back to a data entry named exactly `<name>` and then to a
/// stored flag `<name>` read as `true`/`false`.
pub struct FlagContext<'a> {
    store: &'a dyn FlagStore,
}

impl<'a> FlagContext<'a> {
    pub fn new(store: &'a dyn FlagStore) -> Self {
        Self { store }
    }
}

impl ConditionContext for FlagContext<'_> {
    fn flag(&self, name: &str) -> bool {
        self.store.get_flag(name)
    }

    fn value(&self, name: &str) -> Option<String> {
        self.store
            .get_data(&keys::variable_value_key(name))
            .or_else(|| self.store.get_data(name))
            .map(|v| v.to_string())
            .or_else(|| self.store.lookup_flag(name).map(|set| set.to_string()))
    }

    fn event_seen(&self, event_id: &str) -> bool {
        self.store.get_flag(&keys::event_flag(event_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_rules::{FlagValue, MemoryFlagStore};

    fn store() -> MemoryFlagStore {
        MemoryFlagStore::new()
            .with_flag("radio_fixed", true)
            .with_flag("event_intro", true)
            .with_data("var_mood_value", "calm")
    }

    #[test]
    fn test_parse_grammar() {
        assert_eq!(Condition::parse("radio_fixed"), Condition::Flag("radio_fixed".into()));
        assert_eq!(
            Condition::parse("event_intro"),
            Condition::EventSeen("intro".into())
        );
        assert_eq!(
            Condition::parse("mood=calm"),
            Condition::Equals {
                name: "mood".into(),
                value: "calm".into()
            }
        );
        assert_eq!(
            Condition::parse("!!x"),
            Condition::Not(Box::new(Condition::Not(Box::new(Condition::Flag("x".into())))))
        );
    }

    #[test]
    fn test_equality_precedes_event_prefix() {
        assert!(matches!(
            Condition::parse("event_count=3"),
            Condition::Equals { .. }
        ));
    }

    #[test]
    fn test_display_round_trip() {
        for expr in ["flag", "!flag", "event_intro", "!a=b", "x=", "!!event_z"] {
            assert_eq!(Condition::parse(expr).to_string(), expr);
        }
    }

    #[test]
    fn test_evaluate_against_flags() {
        let store = store();
        let ctx = FlagContext::new(&store);

        assert!(evaluate("radio_fixed", &ctx));
        assert!(!evaluate("unknown_flag", &ctx));
        assert!(evaluate("!unknown_flag", &ctx));
        assert!(evaluate("event_intro", &ctx));
        assert!(!evaluate("event_outro", &ctx));
        assert!(evaluate("mood=calm", &ctx));
        assert!(!evaluate("mood=angry", &ctx));
        assert!(!evaluate("missing=anything", &ctx));
    }

    #[test]
    fn test_equality_falls_back_to_flags() {
        let store = MemoryFlagStore::new()
            .with_flag("has_key", true)
            .with_flag("door_open", false);
        let ctx = FlagContext::new(&store);

        assert!(evaluate("has_key=true", &ctx));
        assert!(!evaluate("has_key=false", &ctx));
        assert!(evaluate("door_open=false", &ctx));
        assert!(!evaluate("lamp=false", &ctx));
    }

    #[test]
    fn test_data_shadows_flag_in_equality() {
        let store = MemoryFlagStore::new()
            .with_flag("mood", true)
            .with_data("mood", "tense");
        let ctx = FlagContext::new(&store);

        assert!(evaluate("mood=tense", &ctx));
        assert!(!evaluate("mood=true", &ctx));
    }

    #[test]
    fn test_equality_uses_string_form() {
        let store = MemoryFlagStore::new().with_data("count", FlagValue::Int(3));
        let ctx = FlagContext::new(&store);

        assert!(evaluate("count=3", &ctx));
        assert!(!evaluate("count=3.0", &ctx));
    }

    #[test]
    fn test_serde_as_string() {
        let condition: Condition = serde_json::from_str("\"!event_intro\"").unwrap();
        assert_eq!(
            condition,
            Condition::Not(Box::new(Condition::EventSeen("intro".into())))
        );
        assert_eq!(serde_json::to_string(&condition).unwrap(), "\"!event_intro\"");
    }
}
