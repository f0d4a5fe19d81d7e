//! World state - the live game record that triggers poll.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::flags::FlagStore;

/// Story progression tracking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Progress {
    /// Milliseconds of play time.
    pub elapsed_ms: u64,
    pub chapter: u32,
}

/// The state of the game world that trigger conditions can observe.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldState {
    /// Current dial position.
    pub dial: f64,

    /// Where the player currently is, if anywhere.
    pub location: Option<String>,

    /// Item names carried by the player.
    pub inventory: Vec<String>,

    pub progress: Progress,

    /// Host-specific values exposed at the top level of the snapshot.
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

impl WorldState {
    /// Create a new empty world state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the dial.
    pub fn tune(&mut self, dial: f64) {
        self.dial = dial;
    }

    pub fn move_to(&mut self, location: impl Into<String>) {
        self.location = Some(location.into());
    }

    /// Add an item unless it is already carried.
    pub fn add_item(&mut self, item: impl Into<String>) {
        let item = item.into();
        if !self.inventory.contains(&item) {
            self.inventory.push(item);
        }
    }

    /// Remove an item, returning whether it was carried.
    pub fn remove_item(&mut self, item: &str) -> bool {
        let before = self.inventory.len();
        self.inventory.retain(|i| i != item);
        self.inventory.len() != before
    }

    pub fn has_item(&self, item: &str) -> bool {
        self.inventory.iter().any(|i| i == item)
    }

    /// Advance play time by the given milliseconds.
    pub fn advance_time(&mut self, ms: u64) {
        self.progress.elapsed_ms = self.progress.elapsed_ms.saturating_add(ms);
    }

    /// Project the state into a snapshot for path-based condition lookups.
    ///
    /// Layout: `radio.dial`, `player.location`, `player.inventory`,
    /// `progress.elapsed_ms`, `progress.chapter`, then every `extra` key at the root.
    pub fn snapshot(&self) -> StateSnapshot {
        let mut root = Map::new();
        root.insert("radio".into(), json!({ "dial": self.dial }));
        root.insert(
            "player".into(),
            json!({
                "location": self.location,
                "inventory": self.inventory,
            }),
        );
        root.insert(
            "progress".into(),
            json!({
                "elapsed_ms": self.progress.elapsed_ms,
                "chapter": self.progress.chapter,
            }),
        );
        for (key, value) in &self.extra {
            root.insert(key.clone(), value.clone());
        }
        StateSnapshot::new(Value::Object(root))
    }

    /// Snapshot that also exposes every stored flag under `flags.<name>`.
    pub fn snapshot_with_flags(&self, store: &dyn FlagStore) -> StateSnapshot {
        let mut snapshot = self.snapshot();
        let flags: Map<String, Value> = store
            .all_flags()
            .into_iter()
            .map(|(name, value)| (name, Value::Bool(value)))
            .collect();
        if let Value::Object(root) = &mut snapshot.root {
            root.insert("flags".into(), Value::Object(flags));
        }
        snapshot
    }
}

/// An immutable view of arbitrary nested game state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot {
    root: Value,
}

impl StateSnapshot {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Resolve a dotted path such as `player.inventory.0`.
    ///
    /// Object keys and array indices are both accepted. Any miss yields `None`.
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.root);
        }

        path.split('.').try_fold(&self.root, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

impl From<Value> for StateSnapshot {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}
