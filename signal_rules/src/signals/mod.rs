//! Signal matching - turns a dial position into a signal identity and strength.
//!
//! Lookup walks definitions in declaration order and the first band containing
//! the dial wins, so overlapping bands resolve by position in the table.

mod table;

pub use table::*;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SignalError, SignalResult};
use crate::flags::{keys, FlagStore};

/// A configured band of dial values mapping to a narrative payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDefinition {
    pub frequency: f64,
    /// Half-width of the band. Always positive.
    pub tolerance: f64,
    /// Strength at the exact centre frequency, 0.0 to 1.0.
    #[serde(alias = "baseStrength")]
    pub base_strength: f64,
    #[serde(alias = "payloadId")]
    pub payload_id: String,
    #[serde(default, alias = "isNoisy")]
    pub is_noisy: bool,
}

impl SignalDefinition {
    pub fn new(
        frequency: f64,
        tolerance: f64,
        base_strength: f64,
        payload_id: impl Into<String>,
    ) -> Self {
        Self {
            frequency,
            tolerance,
            base_strength,
            payload_id: payload_id.into(),
            is_noisy: false,
        }
    }

    /// Mark the signal as carrying audible static.
    pub fn noisy(mut self) -> Self {
        self.is_noisy = true;
        self
    }

    pub fn validate(&self) -> SignalResult<()> {
        if self.payload_id.is_empty() {
            return Err(SignalError::EmptyPayloadId {
                frequency: self.frequency,
            });
        }
        if !self.frequency.is_finite() {
            return Err(SignalError::InvalidFrequency {
                payload_id: self.payload_id.clone(),
            });
        }
        if !(self.tolerance > 0.0) || !self.tolerance.is_finite() {
            return Err(SignalError::InvalidTolerance {
                payload_id: self.payload_id.clone(),
                tolerance: self.tolerance,
            });
        }
        if !(0.0..=1.0).contains(&self.base_strength) {
            return Err(SignalError::InvalidBaseStrength {
                payload_id: self.payload_id.clone(),
                base_strength: self.base_strength,
            });
        }
        Ok(())
    }

    /// Distance from the centre frequency.
    pub fn distance(&self, dial: f64) -> f64 {
        (dial - self.frequency).abs()
    }

    /// Whether the dial sits inside this band (edges inclusive).
    pub fn contains(&self, dial: f64) -> bool {
        self.distance(dial) <= self.tolerance
    }
}

/// Result of a successful match at a dial position.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalMatch {
    pub signal: SignalDefinition,
    pub distance: f64,
    /// Perceived strength, 0.0 to 1.0.
    pub strength: f64,
}

/// What the receiver hears at a dial position.
#[derive(Debug, Clone, PartialEq)]
pub enum Reception {
    Signal(SignalMatch),
    /// Dead air, with a presentation-only texture level.
    Static { intensity: f64 },
}

impl Reception {
    pub fn signal(&self) -> Option<&SignalMatch> {
        match self {
            Reception::Signal(m) => Some(m),
            Reception::Static { .. } => None,
        }
    }
}

/// Tunables for strength noise and ambient static.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalTuning {
    /// Half-width of the uniform perturbation added to strength.
    pub noise_amplitude: f64,
    pub ambient_base: f64,
    pub ambient_amplitude: f64,
    pub ambient_wavenumber: f64,
}

impl SignalTuning {
    /// All values must be finite and the noise amplitude must lie in `[0, 1]`.
    pub fn validate(&self) -> SignalResult<()> {
        let fields = [
            ("noise_amplitude", self.noise_amplitude),
            ("ambient_base", self.ambient_base),
            ("ambient_amplitude", self.ambient_amplitude),
            ("ambient_wavenumber", self.ambient_wavenumber),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(SignalError::InvalidTuning { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.noise_amplitude) {
            return Err(SignalError::InvalidTuning {
                field: "noise_amplitude",
                value: self.noise_amplitude,
            });
        }
        Ok(())
    }
}

impl Default for SignalTuning {
    fn default() -> Self {
        Self {
            noise_amplitude: 0.05,
            ambient_base: 0.08,
            ambient_amplitude: 0.04,
            ambient_wavenumber: 7.3,
        }
    }
}

/// Holds the ordered signal table and answers dial queries against it.
#[derive(Debug, Clone, Default)]
pub struct SignalMatcher {
    signals: Vec<SignalDefinition>,
    tuning: SignalTuning,
}

impl SignalMatcher {
    /// Create a matcher, rejecting the whole set if any definition is invalid.
    pub fn new(signals: Vec<SignalDefinition>) -> SignalResult<Self> {
        for signal in &signals {
            signal.validate()?;
        }
        Ok(Self {
            signals,
            tuning: SignalTuning::default(),
        })
    }

    pub fn from_table(table: SignalTable) -> SignalResult<Self> {
        Self::new(table.signals)
    }

    /// Replace the tuning. Invalid values are rejected and the matcher is dropped.
    pub fn with_tuning(mut self, tuning: SignalTuning) -> SignalResult<Self> {
        tuning.validate()?;
        self.tuning = tuning;
        Ok(self)
    }

    pub fn tuning(&self) -> &SignalTuning {
        &self.tuning
    }

    pub fn signals(&self) -> &[SignalDefinition] {
        &self.signals
    }

    /// Swap in a new signal set. On a validation error the current set is kept.
    pub fn replace_signals(&mut self, signals: Vec<SignalDefinition>) -> SignalResult<()> {
        for signal in &signals {
            signal.validate()?;
        }
        debug!(count = signals.len(), "replaced signal table");
        self.signals = signals;
        Ok(())
    }

    /// First definition, in declaration order, whose band contains the dial.
    pub fn find_signal_at_frequency(&self, dial: f64) -> Option<&SignalDefinition> {
        self.signals.iter().find(|s| s.contains(dial))
    }

    /// Strength without the random term: linear falloff across the band.
    pub fn clean_strength(&self, dial: f64, signal: &SignalDefinition) -> f64 {
        let falloff = 1.0 - signal.distance(dial) / signal.tolerance;
        clamp_unit(signal.base_strength * falloff)
    }

    /// Strength with noise drawn from the thread RNG.
    pub fn calculate_strength(&self, dial: f64, signal: &SignalDefinition) -> f64 {
        self.calculate_strength_with_rng(dial, signal, &mut rand::thread_rng())
    }

    /// Strength with noise drawn from a caller-supplied RNG (useful for testing).
    pub fn calculate_strength_with_rng<R: Rng + ?Sized>(
        &self,
        dial: f64,
        signal: &SignalDefinition,
        rng: &mut R,
    ) -> f64 {
        let base = signal.base_strength * (1.0 - signal.distance(dial) / signal.tolerance);
        let amplitude = self.tuning.noise_amplitude;
        let noise = if amplitude > 0.0 {
            rng.gen_range(-amplitude..=amplitude)
        } else {
            0.0
        };
        clamp_unit(base + noise)
    }

    /// Presentation-only texture for dead air. Deterministic in the dial.
    pub fn ambient_intensity(&self, dial: f64) -> f64 {
        let t = &self.tuning;
        clamp_unit(t.ambient_base + t.ambient_amplitude * (dial * t.ambient_wavenumber).sin())
    }

    pub fn match_at(&self, dial: f64) -> Option<SignalMatch> {
        self.match_at_with_rng(dial, &mut rand::thread_rng())
    }

    pub fn match_at_with_rng<R: Rng + ?Sized>(&self, dial: f64, rng: &mut R) -> Option<SignalMatch> {
        let signal = self.find_signal_at_frequency(dial)?;
        Some(SignalMatch {
            signal: signal.clone(),
            distance: signal.distance(dial),
            strength: self.calculate_strength_with_rng(dial, signal, rng),
        })
    }

    /// Everything the receiver hears at the dial.
    pub fn tune(&self, dial: f64) -> Reception {
        self.tune_with_rng(dial, &mut rand::thread_rng())
    }

    pub fn tune_with_rng<R: Rng + ?Sized>(&self, dial: f64, rng: &mut R) -> Reception {
        match self.match_at_with_rng(dial, rng) {
            Some(m) => Reception::Signal(m),
            None => Reception::Static {
                intensity: self.ambient_intensity(dial),
            },
        }
    }

    /// Write the discovered-signal flag. Returns `true` on first discovery.
    pub fn record_discovery(&self, found: &SignalMatch, store: &mut dyn FlagStore) -> bool {
        let flag = keys::discovered_flag(&found.signal.payload_id);
        if store.get_flag(&flag) {
            return false;
        }
        store.set_flag(&flag, true);
        debug!(payload_id = %found.signal.payload_id, "signal discovered");
        true
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
