//! Notifications the narrative graph emits to the presentation layer.
//!
//! Handlers subscribe by notification name and are called synchronously, in
//! subscription order, from inside the operation that produced the notification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::narrative::{ActiveEvent, Choice};

/// The two notification names hosts can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "narrativeEvent")]
    NarrativeEvent,
    #[serde(rename = "narrativeChoice")]
    NarrativeChoice,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NarrativeEvent => "narrativeEvent",
            NotificationKind::NarrativeChoice => "narrativeChoice",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "narrativeEvent" => Ok(NotificationKind::NarrativeEvent),
            "narrativeChoice" => Ok(NotificationKind::NarrativeChoice),
            other => Err(format!("unknown notification '{}'", other)),
        }
    }
}

/// Payload of a `narrativeChoice` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceMade {
    pub event_id: String,
    pub choice_index: usize,
    pub choice: Choice,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// An event became active. Carries the processed event.
    NarrativeEvent(ActiveEvent),
    NarrativeChoice(ChoiceMade),
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::NarrativeEvent(_) => NotificationKind::NarrativeEvent,
            Notification::NarrativeChoice(_) => NotificationKind::NarrativeChoice,
        }
    }
}

/// Handle returned by [`NotificationBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Handler = Box<dyn FnMut(&Notification)>;

struct Subscriber {
    id: SubscriptionId,
    kind: NotificationKind,
    handler: Handler,
}

/// Name-keyed subscriber list.
#[derive(Default)]
pub struct NotificationBus {
    subscribers: Vec<Subscriber>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: NotificationKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&Notification) + 'static,
    {
        let id = SubscriptionId::new();
        self.subscribers.push(Subscriber {
            id,
            kind,
            handler: Box::new(handler),
        });
        id
    }

    /// Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, notification: &Notification) {
        let kind = notification.kind();
        for subscriber in self.subscribers.iter_mut().filter(|s| s.kind == kind) {
            (subscriber.handler)(notification);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
