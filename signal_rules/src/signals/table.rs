//! Signal table loading from TOML or JSON configuration.

use serde::{Deserialize, Serialize};

use super::SignalDefinition;
use crate::error::SignalResult;

/// An ordered signal table as it appears in configuration.
///
/// ```toml
/// [[signal]]
/// frequency = 91.1
/// tolerance = 0.1
/// base_strength = 0.8
/// payload_id = "intro_signal"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalTable {
    #[serde(rename = "signal", alias = "signals", default)]
    pub signals: Vec<SignalDefinition>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTable {
    List(Vec<SignalDefinition>),
    Table(SignalTable),
}

impl SignalTable {
    /// Parse and validate a TOML table. Declaration order is preserved.
    pub fn from_toml_str(text: &str) -> SignalResult<Self> {
        let table: SignalTable = toml::from_str(text)?;
        table.validate()?;
        Ok(table)
    }

    /// Parse either a bare JSON array or an object with a `signals` array.
    pub fn from_json_str(text: &str) -> SignalResult<Self> {
        let table = match serde_json::from_str::<JsonTable>(text)? {
            JsonTable::List(signals) => SignalTable { signals },
            JsonTable::Table(table) => table,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> SignalResult<()> {
        self.signals.iter().try_for_each(SignalDefinition::validate)
    }
}
