//! Narrative Graph - the event registry and its two-state machine.
//!
//! States are `Idle` (no current event) and `EventActive`. `trigger_event` moves
//! into `EventActive`; `make_choice` and `hide` move back to `Idle`. A choice whose
//! outcome is `trigger_<id>` re-enters `trigger_event` directly, after the graph
//! has already returned to `Idle`, so its notification arrives after the
//! `narrativeChoice` notification and before `make_choice` returns.

use signal_rules::{keys, FlagStore, FlagValue};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::interference::apply_interference;
use super::loader::parse_events;
use super::{ActiveEvent, NarrativeEvent, OutcomeDirective};
use crate::conditions::{Condition, ConditionContext};
use crate::config::NarrativeSettings;
use crate::error::{NarrativeError, NarrativeResult};
use crate::events::{ChoiceMade, Notification, NotificationBus, NotificationKind, SubscriptionId};

/// Condition context over the graph's flags, variables and history.
struct GraphContext<'a> {
    store: &'a dyn FlagStore,
    variables: &'a HashMap<String, String>,
    history: &'a [String],
}

impl ConditionContext for GraphContext<'_> {
    fn flag(&self, name: &str) -> bool {
        self.store.get_flag(name)
    }

    fn value(&self, name: &str) -> Option<String> {
        self.variables
            .get(name)
            .cloned()
            .or_else(|| self.store.get_data(name).map(|v| v.to_string()))
            .or_else(|| self.store.lookup_flag(name).map(|set| set.to_string()))
    }

    fn event_seen(&self, event_id: &str) -> bool {
        self.history.iter().any(|id| id == event_id)
    }
}

/// The narrative event graph, owning its flag store.
#[derive(Debug)]
pub struct NarrativeGraph<S: FlagStore> {
    events: HashMap<String, NarrativeEvent>,
    current: Option<ActiveEvent>,
    /// Chronological, append-only.
    history: Vec<String>,
    variables: HashMap<String, String>,
    store: S,
    bus: NotificationBus,
    settings: NarrativeSettings,
}

impl<S: FlagStore> NarrativeGraph<S> {
    /// Create a graph over a store, restoring history and variables from it.
    pub fn new(store: S) -> Self {
        Self::with_settings(store, NarrativeSettings::default())
    }

    /// Create a graph with explicit settings, restoring state from the store.
    pub fn with_settings(store: S, settings: NarrativeSettings) -> Self {
        let mut graph = Self {
            events: HashMap::new(),
            current: None,
            history: Vec::new(),
            variables: HashMap::new(),
            store,
            bus: NotificationBus::new(),
            settings,
        };
        graph.restore_history();
        graph.restore_variables();
        graph
    }

    fn context(&self) -> GraphContext<'_> {
        GraphContext {
            store: &self.store,
            variables: &self.variables,
            history: &self.history,
        }
    }

    /// Register one event, replacing any event with the same id.
    pub fn add_event(&mut self, event: NarrativeEvent) -> bool {
        match self.try_add_event(event) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "rejected narrative event");
                false
            }
        }
    }

    /// Register one event, returning the validation error on failure.
    pub fn try_add_event(&mut self, event: NarrativeEvent) -> NarrativeResult<()> {
        event.validate()?;
        if self.events.insert(event.id.clone(), event).is_some() {
            debug!("replaced existing narrative event");
        }
        Ok(())
    }

    /// Load one record or a list of records. All or nothing.
    pub fn load_events(&mut self, text: &str) -> bool {
        match self.try_load_events(text) {
            Ok(count) => {
                info!(count, "loaded narrative events");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to load narrative events");
                false
            }
        }
    }

    /// Returns the number of events loaded.
    pub fn try_load_events(&mut self, text: &str) -> NarrativeResult<usize> {
        let events = parse_events(text)?;
        let count = events.len();
        for event in events {
            self.events.insert(event.id.clone(), event);
        }
        Ok(count)
    }

    /// Hot reload: swap the entire registry for the parsed set.
    ///
    /// History, variables and the current event are left alone.
    pub fn replace_events(&mut self, text: &str) -> bool {
        match parse_events(text) {
            Ok(events) => {
                self.events = events.into_iter().map(|e| (e.id.clone(), e)).collect();
                info!(count = self.events.len(), "replaced narrative events");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to replace narrative events");
                false
            }
        }
    }

    /// Serialized record for a registered event, in the form `load_events` accepts.
    pub fn export_event(&self, event_id: &str) -> Option<String> {
        serde_json::to_string(self.events.get(event_id)?).ok()
    }

    /// Look up a registered event by id.
    pub fn event(&self, event_id: &str) -> Option<&NarrativeEvent> {
        self.events.get(event_id)
    }

    /// Check whether an event id is registered.
    pub fn has_event(&self, event_id: &str) -> bool {
        self.events.contains_key(event_id)
    }

    /// Registered ids in sorted order.
    pub fn event_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.events.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Activate an event if it exists and its guard passes.
    pub fn trigger_event(&mut self, event_id: &str) -> bool {
        match self.try_trigger_event(event_id) {
            Ok(()) => true,
            Err(e) => {
                warn!(event_id, error = %e, "narrative event not triggered");
                false
            }
        }
    }

    /// Activate an event, returning why it was refused. Nothing changes on error.
    pub fn try_trigger_event(&mut self, event_id: &str) -> NarrativeResult<()> {
        let active = {
            let event = self
                .events
                .get(event_id)
                .ok_or_else(|| NarrativeError::UnknownEvent(event_id.to_string()))?;
            let ctx = self.context();

            if let Some(guard) = &event.guard {
                if !guard.evaluate(&ctx) {
                    return Err(NarrativeError::GuardNotMet(event_id.to_string()));
                }
            }

            let choices = event
                .choices
                .iter()
                .filter(|c| c.guard.as_ref().map_or(true, |g| g.evaluate(&ctx)))
                .cloned()
                .collect();
            let message = match event.interference_level {
                Some(level) => apply_interference(&event.message, level, &event.id),
                None => event.message.clone(),
            };

            ActiveEvent {
                id: event.id.clone(),
                message,
                choices,
                interference_level: event.interference_level,
            }
        };

        self.record_history(event_id);
        self.current = Some(active.clone());
        info!(event_id, choices = active.choices.len(), "narrative event triggered");
        self.bus.emit(&Notification::NarrativeEvent(active));
        Ok(())
    }

    /// Resolve a choice on the current event. `index` refers to the filtered choices.
    pub fn make_choice(&mut self, index: usize) -> bool {
        match self.try_make_choice(index) {
            Ok(()) => true,
            Err(e) => {
                warn!(index, error = %e, "choice rejected");
                false
            }
        }
    }

    /// Resolve a choice, returning why it was refused. Nothing changes on error.
    pub fn try_make_choice(&mut self, index: usize) -> NarrativeResult<()> {
        let active = self.current.as_ref().ok_or(NarrativeError::NoActiveEvent)?;
        let choice = active
            .choices
            .get(index)
            .ok_or_else(|| NarrativeError::ChoiceOutOfRange {
                event_id: active.id.clone(),
                index,
                available: active.choices.len(),
            })?;

        if let Some(guard) = &choice.guard {
            if !guard.evaluate(&self.context()) {
                return Err(NarrativeError::ChoiceGuardNotMet {
                    event_id: active.id.clone(),
                    index,
                });
            }
        }

        let event_id = active.id.clone();
        let choice = choice.clone();

        self.store.set_flag(&keys::choice_flag(&event_id, index), true);
        debug!(event_id = %event_id, index, "choice taken");
        self.bus.emit(&Notification::NarrativeChoice(ChoiceMade {
            event_id,
            choice_index: index,
            choice: choice.clone(),
        }));

        self.current = None;

        match choice.outcome {
            OutcomeDirective::Trigger { event_id } => {
                self.trigger_event(&event_id);
            }
            OutcomeDirective::SetVariable { name, value } => self.set_variable(&name, value),
            OutcomeDirective::Noop => {}
        }
        Ok(())
    }

    /// Dismiss the current event without taking a choice.
    pub fn hide(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// The active event, if any.
    pub fn current_event(&self) -> Option<&ActiveEvent> {
        self.current.as_ref()
    }

    /// Whether no event is active.
    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    fn record_history(&mut self, event_id: &str) {
        self.history.push(event_id.to_string());
        self.store.set_flag(&keys::event_flag(event_id), true);
        if self.settings.persist_ordered_history {
            self.store.set_data(
                &self.settings.history_key,
                FlagValue::List(self.history.clone()),
            );
        }
    }

    /// Rebuild history from the store.
    ///
    /// The ordered list under the history key is authoritative when present.
    /// Otherwise ids are collected from `event_<id>` flags and sorted, since the
    /// store's flag order says nothing about when events fired; only membership
    /// is reliable in that case.
    pub fn restore_history(&mut self) {
        if self.settings.persist_ordered_history {
            if let Some(FlagValue::List(ids)) = self.store.get_data(&self.settings.history_key) {
                self.history = ids;
                return;
            }
        }

        let mut ids: Vec<String> = self
            .store
            .all_flags()
            .into_iter()
            .filter(|(_, set)| *set)
            .filter_map(|(flag, _)| keys::parse_event_flag(&flag).map(str::to_string))
            .collect();
        ids.sort_unstable();
        self.history = ids;
    }

    fn restore_variables(&mut self) {
        for (flag, set) in self.store.all_flags() {
            let Some(name) = flag.strip_prefix(keys::VARIABLE_PREFIX) else {
                continue;
            };
            if !set {
                continue;
            }
            if let Some(value) = self.store.get_data(&keys::variable_value_key(name)) {
                self.variables.insert(name.to_string(), value.to_string());
            }
        }
    }

    /// Triggered event ids, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Check whether an event has ever been triggered.
    pub fn has_triggered_event(&self, event_id: &str) -> bool {
        self.history.iter().any(|id| id == event_id)
    }

    /// Write a variable and persist its `var_<name>` marker and value.
    pub fn set_variable(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.store.set_flag(&keys::variable_flag(name), true);
        self.store
            .set_data(&keys::variable_value_key(name), FlagValue::String(value.clone()));
        debug!(name, value = %value, "variable set");
        self.variables.insert(name.to_string(), value);
    }

    /// Current value of a variable.
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Evaluate a condition string against the graph's current state.
    pub fn evaluate_condition(&self, expr: &str) -> bool {
        Condition::parse(expr).evaluate(&self.context())
    }

    /// The backing flag store.
    pub fn flags(&self) -> &S {
        &self.store
    }

    /// Mutable access to the backing flag store.
    pub fn flags_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consume the graph and hand back its store for persistence.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Register a handler for one notification kind.
    pub fn subscribe<F>(&mut self, kind: NotificationKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&Notification) + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    /// Subscribe by notification name. `None` if the name is unknown.
    pub fn subscribe_named<F>(&mut self, name: &str, handler: F) -> Option<SubscriptionId>
    where
        F: FnMut(&Notification) + 'static,
    {
        let kind = name.parse::<NotificationKind>().ok()?;
        Some(self.bus.subscribe(kind, handler))
    }

    /// Remove a handler. Returns `false` if the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }
}
