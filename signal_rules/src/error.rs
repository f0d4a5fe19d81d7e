//! Error types for the world-side crate.

use thiserror::Error;

/// Errors raised while loading or validating world configuration.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Signal '{payload_id}' has non-positive tolerance {tolerance}")]
    InvalidTolerance { payload_id: String, tolerance: f64 },

    #[error("Signal '{payload_id}' has base strength {base_strength} outside [0, 1]")]
    InvalidBaseStrength {
        payload_id: String,
        base_strength: f64,
    },

    #[error("Signal at {frequency} has an empty payload id")]
    EmptyPayloadId { frequency: f64 },

    #[error("Signal '{payload_id}' has a non-finite frequency")]
    InvalidFrequency { payload_id: String },

    #[error("Signal tuning '{field}' has invalid value {value}")]
    InvalidTuning { field: &'static str, value: f64 },

    #[error("Failed to parse signal table TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse signal table JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for world-side operations.
pub type SignalResult<T> = Result<T, SignalError>;
