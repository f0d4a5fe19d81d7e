//! Trigger evaluation - standing rules that fire story events on their own.
//!
//! Each poll walks the triggers in registration order. A trigger fires when all of
//! its state conditions hold and its firing policy allows it: one-time triggers
//! fire once for the lifetime of the evaluator, cooldown triggers at most once
//! per cooldown window. Runtime state is keyed by trigger id, so reconfiguring
//! with the same ids keeps what has already fired.

mod schedule;

pub use schedule::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use signal_rules::{FlagStore, StateSnapshot};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::conditions::{all_met, StateCondition};
use crate::config::TriggerSettings;
use crate::error::{NarrativeError, NarrativeResult};
use crate::narrative::{parse_records, NarrativeGraph};

/// Event type that [`NarrativeGraph`] handles when used as a sink.
pub const NARRATIVE_EVENT_TYPE: &str = "narrative";

/// What a trigger dispatches when it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl TriggerEvent {
    /// Create an event of any type.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Event that asks the narrative graph to trigger `event_id`.
    pub fn narrative(event_id: impl Into<String>) -> Self {
        Self::new(NARRATIVE_EVENT_TYPE, Value::String(event_id.into()))
    }

    /// Event id carried by a narrative payload, either a bare string or `{ "id": ... }`.
    pub fn narrative_event_id(&self) -> Option<&str> {
        if self.kind != NARRATIVE_EVENT_TYPE {
            return None;
        }
        match &self.payload {
            Value::String(id) => Some(id),
            Value::Object(map) => map.get("id").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// A standing rule: conditions, the event to dispatch, and a firing policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub id: String,
    #[serde(default)]
    pub conditions: Vec<StateCondition>,
    pub event: TriggerEvent,
    #[serde(default, alias = "one_time")]
    pub one_time: bool,
    #[serde(default, alias = "cooldown_ms", skip_serializing_if = "Option::is_none")]
    pub cooldown_ms: Option<u64>,
}

impl Trigger {
    /// Create a trigger that fires on every poll until conditions are added.
    pub fn new(id: impl Into<String>, event: TriggerEvent) -> Self {
        Self {
            id: id.into(),
            conditions: Vec::new(),
            event,
            one_time: false,
            cooldown_ms: None,
        }
    }

    /// Add a condition. All conditions must hold.
    pub fn with_condition(mut self, condition: StateCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Fire at most once for the lifetime of the evaluator.
    pub fn once(mut self) -> Self {
        self.one_time = true;
        self
    }

    /// Minimum milliseconds between two dispatches.
    pub fn with_cooldown(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = Some(cooldown_ms);
        self
    }

    /// Check the id, the event type and every condition.
    pub fn validate(&self) -> NarrativeResult<()> {
        if self.id.is_empty() {
            return Err(NarrativeError::MissingField { field: "id" });
        }
        if self.event.kind.is_empty() {
            return Err(NarrativeError::MissingField { field: "event.type" });
        }
        self.conditions.iter().try_for_each(StateCondition::validate)
    }
}

/// Receiver of dispatched trigger events.
pub trait EventSink {
    fn dispatch(&mut self, event: &TriggerEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&TriggerEvent),
{
    fn dispatch(&mut self, event: &TriggerEvent) {
        self(event)
    }
}

impl<S: FlagStore> EventSink for NarrativeGraph<S> {
    fn dispatch(&mut self, event: &TriggerEvent) {
        match event.narrative_event_id() {
            Some(event_id) => {
                self.trigger_event(event_id);
            }
            None => debug!(kind = %event.kind, "narrative graph ignored trigger event"),
        }
    }
}

/// Runtime state owned by the evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerState {
    pub has_fired: bool,
    /// Milliseconds timestamp of the last dispatch.
    pub last_fired_at: Option<u64>,
    pub fire_count: u32,
}

/// Polls registered triggers against live state.
#[derive(Debug)]
pub struct TriggerEvaluator {
    triggers: Vec<Trigger>,
    states: HashMap<String, TriggerState>,
    interval: Duration,
    active_timer: Option<TimerHandle>,
}

impl Default for TriggerEvaluator {
    fn default() -> Self {
        Self::new(&TriggerSettings::default())
    }
}

impl TriggerEvaluator {
    /// Create an evaluator polling at the configured interval.
    pub fn new(settings: &TriggerSettings) -> Self {
        Self {
            triggers: Vec::new(),
            states: HashMap::new(),
            interval: settings.poll_interval(),
            active_timer: None,
        }
    }

    /// Add a trigger, or update the definition of an existing id in place.
    pub fn register(&mut self, trigger: Trigger) -> bool {
        match self.try_register(trigger) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "rejected trigger");
                false
            }
        }
    }

    /// Add or update a trigger, returning the validation error on failure.
    pub fn try_register(&mut self, trigger: Trigger) -> NarrativeResult<()> {
        trigger.validate()?;
        match self.triggers.iter_mut().find(|t| t.id == trigger.id) {
            Some(existing) => *existing = trigger,
            None => self.triggers.push(trigger),
        }
        Ok(())
    }

    /// Remove a trigger and its runtime state.
    pub fn unregister(&mut self, trigger_id: &str) -> bool {
        let before = self.triggers.len();
        self.triggers.retain(|t| t.id != trigger_id);
        self.states.remove(trigger_id);
        self.triggers.len() != before
    }

    /// Replace the whole trigger list. State survives for ids still present.
    pub fn set_triggers(&mut self, triggers: Vec<Trigger>) -> bool {
        match self.try_set_triggers(triggers) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "rejected trigger set");
                false
            }
        }
    }

    /// Replace the trigger list, returning the first validation error.
    pub fn try_set_triggers(&mut self, triggers: Vec<Trigger>) -> NarrativeResult<()> {
        let mut ids = HashSet::new();
        for trigger in &triggers {
            trigger.validate()?;
            if !ids.insert(trigger.id.as_str()) {
                return Err(NarrativeError::DuplicateId(trigger.id.clone()));
            }
        }

        self.states.retain(|id, _| ids.contains(id.as_str()));
        self.triggers = triggers;
        Ok(())
    }

    /// Load one trigger record or a list of them, replacing the current set.
    pub fn load_triggers(&mut self, text: &str) -> bool {
        match parse_records::<Trigger>(text).and_then(|t| self.try_set_triggers(t)) {
            Ok(()) => {
                info!(count = self.triggers.len(), "loaded triggers");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to load triggers");
                false
            }
        }
    }

    /// Registered triggers in evaluation order.
    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Runtime state of a trigger that has been evaluated at least once.
    pub fn state(&self, trigger_id: &str) -> Option<&TriggerState> {
        self.states.get(trigger_id)
    }

    /// Forget that a trigger has fired.
    pub fn reset_trigger(&mut self, trigger_id: &str) -> bool {
        self.states.remove(trigger_id).is_some()
    }

    /// Run one poll. Returns the ids of fired triggers in registration order.
    pub fn evaluate(
        &mut self,
        now_ms: u64,
        snapshot: &StateSnapshot,
        sink: &mut dyn EventSink,
    ) -> Vec<String> {
        let mut fired = Vec::new();

        for trigger in &self.triggers {
            let state = self.states.entry(trigger.id.clone()).or_default();

            if trigger.one_time && state.has_fired {
                continue;
            }
            if let (Some(cooldown), Some(last)) = (trigger.cooldown_ms, state.last_fired_at) {
                if now_ms.saturating_sub(last) < cooldown {
                    debug!(trigger_id = %trigger.id, "trigger cooling down");
                    continue;
                }
            }
            if !all_met(&trigger.conditions, snapshot) {
                continue;
            }

            sink.dispatch(&trigger.event);
            state.last_fired_at = Some(now_ms);
            state.fire_count += 1;
            if trigger.one_time {
                state.has_fired = true;
            }
            info!(trigger_id = %trigger.id, kind = %trigger.event.kind, "trigger fired");
            fired.push(trigger.id.clone());
        }

        fired
    }

    /// Whether a poll timer is active.
    pub fn is_running(&self) -> bool {
        self.active_timer.is_some()
    }

    /// Schedule polling and evaluate once immediately. No-op if already running.
    pub fn start(
        &mut self,
        scheduler: &mut dyn Scheduler,
        now_ms: u64,
        snapshot: &StateSnapshot,
        sink: &mut dyn EventSink,
    ) -> Vec<String> {
        if self.is_running() {
            debug!("trigger evaluator already running");
            return Vec::new();
        }
        let handle = scheduler.schedule_interval(self.interval);
        self.active_timer = Some(handle);
        debug!(timer = %handle, interval_ms = self.interval.as_millis() as u64, "trigger polling started");
        self.evaluate(now_ms, snapshot, sink)
    }

    /// Handle a timer tick. Ticks from any handle but the active one are ignored,
    /// so nothing dispatches after [`TriggerEvaluator::stop`].
    pub fn on_tick(
        &mut self,
        handle: TimerHandle,
        now_ms: u64,
        snapshot: &StateSnapshot,
        sink: &mut dyn EventSink,
    ) -> Vec<String> {
        if self.active_timer != Some(handle) {
            debug!(timer = %handle, "ignored stale tick");
            return Vec::new();
        }
        self.evaluate(now_ms, snapshot, sink)
    }

    /// Cancel polling. Safe to call repeatedly; returns whether a timer was active.
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) -> bool {
        match self.active_timer.take() {
            Some(handle) => {
                scheduler.cancel(handle);
                debug!(timer = %handle, "trigger polling stopped");
                true
            }
            None => false,
        }
    }
}
