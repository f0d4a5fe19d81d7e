//! Engine configuration, loadable from TOML.
//!
//! ```toml
//! [signals]
//! noise_amplitude = 0.05
//!
//! [narrative]
//! history_key = "narrative_history"
//!
//! [triggers]
//! poll_interval_ms = 1000
//! ```

use serde::{Deserialize, Serialize};
use signal_rules::SignalTuning;
use std::time::Duration;

use crate::error::NarrativeResult;

/// Narrative graph settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeSettings {
    /// Data key holding the ordered history list.
    pub history_key: String,
    /// Persist history as an explicit ordered list next to the `event_<id>` flags.
    pub persist_ordered_history: bool,
}

impl Default for NarrativeSettings {
    fn default() -> Self {
        Self {
            history_key: "narrative_history".to_string(),
            persist_ordered_history: true,
        }
    }
}

/// Trigger polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerSettings {
    pub poll_interval_ms: u64,
}

impl TriggerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

/// Top-level configuration for the whole engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub signals: SignalTuning,
    pub narrative: NarrativeSettings,
    pub triggers: TriggerSettings,
}

impl EngineConfig {
    /// Parse configuration. Missing sections and keys take their defaults.
    pub fn from_toml_str(text: &str) -> NarrativeResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.signals.validate()?;
        Ok(config)
    }
}
