//! Error types for narrative configuration and invocation.

use signal_rules::SignalError;
use thiserror::Error;

/// Errors surfaced by the `try_*` operations. The boolean operations log these
/// and report `false`.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("Failed to parse records: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to parse engine config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid signal configuration: {0}")]
    Signal(#[from] SignalError),

    #[error("Record is missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("Invalid outcome directive '{0}'")]
    InvalidOutcome(String),

    #[error("Expected a record or a list of records, found {0}")]
    InvalidShape(&'static str),

    #[error("Event '{event_id}' has interference level {level} outside [0, 1]")]
    InvalidInterference { event_id: String, level: f64 },

    #[error("Duplicate id '{0}' in one batch")]
    DuplicateId(String),

    #[error("Unknown event '{0}'")]
    UnknownEvent(String),

    #[error("Guard not met for event '{0}'")]
    GuardNotMet(String),

    #[error("No active event")]
    NoActiveEvent,

    #[error("Choice {index} out of range for event '{event_id}' ({available} available)")]
    ChoiceOutOfRange {
        event_id: String,
        index: usize,
        available: usize,
    },

    #[error("Guard not met for choice {index} of event '{event_id}'")]
    ChoiceGuardNotMet { event_id: String, index: usize },
}

/// Result alias for narrative operations.
pub type NarrativeResult<T> = Result<T, NarrativeError>;
