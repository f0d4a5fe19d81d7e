//! Narrative event definitions and their record format.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::conditions::Condition;
use crate::error::{NarrativeError, NarrativeResult};

const TRIGGER_PREFIX: &str = "trigger_";
const SET_PREFIX: &str = "set_";

/// What happens after a choice is taken. Decided once, at load time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutcomeDirective {
    /// `trigger_<eventId>`
    Trigger { event_id: String },
    /// `set_<name>=<value>`; a bare `set_<name>` stores `"true"`.
    SetVariable { name: String, value: String },
    #[default]
    Noop,
}

impl OutcomeDirective {
    pub fn parse(directive: &str) -> NarrativeResult<Self> {
        if directive.is_empty() {
            return Ok(OutcomeDirective::Noop);
        }
        if let Some(event_id) = directive.strip_prefix(TRIGGER_PREFIX) {
            if !event_id.is_empty() {
                return Ok(OutcomeDirective::Trigger {
                    event_id: event_id.to_string(),
                });
            }
        }
        if let Some(assignment) = directive.strip_prefix(SET_PREFIX) {
            let (name, value) = assignment.split_once('=').unwrap_or((assignment, "true"));
            if !name.is_empty() {
                return Ok(OutcomeDirective::SetVariable {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Err(NarrativeError::InvalidOutcome(directive.to_string()))
    }

    pub fn trigger(event_id: impl Into<String>) -> Self {
        OutcomeDirective::Trigger {
            event_id: event_id.into(),
        }
    }

    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        OutcomeDirective::SetVariable {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Reject directives built in code that have no string form `parse` would accept.
    pub fn validate(&self) -> NarrativeResult<()> {
        let valid = match self {
            OutcomeDirective::Trigger { event_id } => !event_id.is_empty(),
            OutcomeDirective::SetVariable { name, .. } => !name.is_empty() && !name.contains('='),
            OutcomeDirective::Noop => true,
        };
        if valid {
            Ok(())
        } else {
            Err(NarrativeError::InvalidOutcome(self.to_string()))
        }
    }
}

impl TryFrom<String> for OutcomeDirective {
    type Error = NarrativeError;

    fn try_from(directive: String) -> Result<Self, Self::Error> {
        OutcomeDirective::parse(&directive)
    }
}

impl From<OutcomeDirective> for String {
    fn from(directive: OutcomeDirective) -> Self {
        directive.to_string()
    }
}

impl fmt::Display for OutcomeDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeDirective::Trigger { event_id } => write!(f, "{}{}", TRIGGER_PREFIX, event_id),
            OutcomeDirective::SetVariable { name, value } => {
                write!(f, "{}{}={}", SET_PREFIX, name, value)
            }
            OutcomeDirective::Noop => Ok(()),
        }
    }
}

/// A selectable response to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(default)]
    pub outcome: OutcomeDirective,
    #[serde(default, alias = "condition", skip_serializing_if = "Option::is_none")]
    pub guard: Option<Condition>,
}

impl Choice {
    pub fn new(text: impl Into<String>, outcome: OutcomeDirective) -> Self {
        Self {
            text: text.into(),
            outcome,
            guard: None,
        }
    }

    pub fn with_guard(mut self, guard: impl Into<Condition>) -> Self {
        self.guard = Some(guard.into());
        self
    }
}

/// A branching story node. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeEvent {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default, alias = "condition", skip_serializing_if = "Option::is_none")]
    pub guard: Option<Condition>,
    /// 0.0 leaves the message readable, 1.0 obscures it entirely.
    #[serde(
        default,
        alias = "interference_level",
        skip_serializing_if = "Option::is_none"
    )]
    pub interference_level: Option<f64>,
}

impl NarrativeEvent {
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            choices: Vec::new(),
            guard: None,
            interference_level: None,
        }
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn with_guard(mut self, guard: impl Into<Condition>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    pub fn with_interference(mut self, level: f64) -> Self {
        self.interference_level = Some(level);
        self
    }

    /// Structural checks applied to every event before registration.
    pub fn validate(&self) -> NarrativeResult<()> {
        if self.id.is_empty() {
            return Err(NarrativeError::MissingField { field: "id" });
        }
        if self.message.is_empty() {
            return Err(NarrativeError::MissingField { field: "message" });
        }
        if let Some(level) = self.interference_level {
            if !(0.0..=1.0).contains(&level) {
                return Err(NarrativeError::InvalidInterference {
                    event_id: self.id.clone(),
                    level,
                });
            }
        }
        self.choices
            .iter()
            .try_for_each(|choice| choice.outcome.validate())
    }
}

/// The processed form of an event while it is active: guarded choices removed
/// and interference applied to the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEvent {
    pub id: String,
    pub message: String,
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interference_level: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_grammar() {
        assert_eq!(OutcomeDirective::parse("").unwrap(), OutcomeDirective::Noop);
        assert_eq!(
            OutcomeDirective::parse("trigger_second_contact").unwrap(),
            OutcomeDirective::trigger("second_contact")
        );
        assert_eq!(
            OutcomeDirective::parse("set_trust=high").unwrap(),
            OutcomeDirective::set("trust", "high")
        );
        assert_eq!(
            OutcomeDirective::parse("set_door_open").unwrap(),
            OutcomeDirective::set("door_open", "true")
        );
        assert_eq!(
            OutcomeDirective::parse("set_note=a=b").unwrap(),
            OutcomeDirective::set("note", "a=b")
        );
    }

    #[test]
    fn test_outcome_rejects_garbage() {
        for bad in ["trigger_", "set_", "set_=x", "launch_missiles"] {
            assert!(
                matches!(OutcomeDirective::parse(bad), Err(NarrativeError::InvalidOutcome(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_outcome_display() {
        for directive in ["", "trigger_x", "set_a=b"] {
            assert_eq!(OutcomeDirective::parse(directive).unwrap().to_string(), directive);
        }
    }

    #[test]
    fn test_record_defaults() {
        let event: NarrativeEvent =
            serde_json::from_str(r#"{"id": "intro", "message": "Static crackles."}"#).unwrap();
        assert!(event.choices.is_empty());
        assert!(event.guard.is_none());
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_record_aliases() {
        let event: NarrativeEvent = serde_json::from_str(
            r#"{
                "id": "tower",
                "message": "A voice counts down.",
                "condition": "discovered_tower",
                "interference_level": 0.4,
                "choices": [
                    {"text": "Answer", "outcome": "trigger_reply", "condition": "has_mic"},
                    {"text": "Ignore"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(event.guard, Some(Condition::Flag("discovered_tower".into())));
        assert_eq!(event.interference_level, Some(0.4));
        assert_eq!(event.choices[0].outcome, OutcomeDirective::trigger("reply"));
        assert_eq!(event.choices[1].outcome, OutcomeDirective::Noop);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            NarrativeEvent::new("", "text").validate(),
            Err(NarrativeError::MissingField { field: "id" })
        ));
        assert!(matches!(
            NarrativeEvent::new("a", "").validate(),
            Err(NarrativeError::MissingField { field: "message" })
        ));
        assert!(matches!(
            NarrativeEvent::new("a", "b").with_interference(1.5).validate(),
            Err(NarrativeError::InvalidInterference { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_unwritable_outcomes() {
        for outcome in [
            OutcomeDirective::trigger(""),
            OutcomeDirective::set("", "v"),
            OutcomeDirective::set("a=b", "c"),
        ] {
            let event = NarrativeEvent::new("a", "b").with_choice(Choice::new("Go", outcome));
            assert!(
                matches!(event.validate(), Err(NarrativeError::InvalidOutcome(_))),
                "{event:?}"
            );
        }

        let ok = NarrativeEvent::new("a", "b")
            .with_choice(Choice::new("Go", OutcomeDirective::trigger("c")))
            .with_choice(Choice::new("Stay", OutcomeDirective::set("x", "")));
        assert!(ok.validate().is_ok());
    }
}
