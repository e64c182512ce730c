//! Typed publish/subscribe registry for intra-client events.
//!
//! DESIGN
//! ======
//! Entries are keyed by a monotonically increasing id rather than a vec
//! index, so removal during delivery (a callback unsubscribing itself or a
//! neighbor) can never skip or double-invoke another subscriber. Delivery
//! iterates a snapshot taken under the lock and re-checks liveness per entry;
//! callbacks run outside the lock, so they are free to call back into the
//! bus (`off`, `emit`, new subscriptions).
//!
//! A `once` entry is unregistered in the same locked section that snapshots
//! it, which makes reentrant emits unable to fire it twice.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::{SessionUpdate, TokenPair};

/// Events broadcast between the client's components.
#[derive(Debug, Clone)]
pub enum Event {
    /// A new token pair after a successful refresh or retried authenticate.
    TokensUpdate(TokenPair),
    /// A batch of session updates pushed by the server.
    SessionUpdates(Vec<SessionUpdate>),
    /// The socket closed; all pending requests have been rejected.
    Closed,
}

/// Topic discriminator for [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    TokensUpdate,
    SessionUpdates,
    Closed,
}

impl Event {
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Self::TokensUpdate(_) => Topic::TokensUpdate,
            Self::SessionUpdates(_) => Topic::SessionUpdates,
            Self::Closed => Topic::Closed,
        }
    }
}

/// Subscriber callback. Invoked synchronously, in subscription order.
pub type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handle returned by [`EventBus::on`] / [`EventBus::once`]; pass it to
/// [`EventBus::off`] to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Entry {
    id: u64,
    once: bool,
    cb: Callback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    topics: HashMap<Topic, Vec<Entry>>,
}

/// In-process event bus. One instance per client connection.
#[derive(Default)]
pub struct EventBus {
    registry: Mutex<Registry>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe durably to a topic.
    pub fn on(&self, topic: Topic, cb: Callback) -> SubscriptionId {
        self.subscribe(topic, cb, false)
    }

    /// Subscribe for a single delivery; the entry is removed before its
    /// first invocation completes.
    pub fn once(&self, topic: Topic, cb: Callback) -> SubscriptionId {
        self.subscribe(topic, cb, true)
    }

    fn subscribe(&self, topic: Topic, cb: Callback, once: bool) -> SubscriptionId {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.topics.entry(topic).or_default().push(Entry { id, once, cb });
        SubscriptionId(id)
    }

    /// Remove a subscription. Unknown or already-removed ids are a no-op.
    pub fn off(&self, topic: Topic, id: SubscriptionId) {
        let mut registry = lock(&self.registry);
        if let Some(entries) = registry.topics.get_mut(&topic) {
            entries.retain(|entry| entry.id != id.0);
        }
    }

    /// Deliver an event to every live subscriber of its topic, in
    /// subscription order. No subscribers is a no-op.
    pub fn emit(&self, event: &Event) {
        let topic = event.topic();
        let snapshot: Vec<(u64, bool, Callback)> = {
            let mut registry = lock(&self.registry);
            let Some(entries) = registry.topics.get_mut(&topic) else {
                return;
            };
            let snapshot = entries
                .iter()
                .map(|entry| (entry.id, entry.once, Arc::clone(&entry.cb)))
                .collect();
            entries.retain(|entry| !entry.once);
            snapshot
        };

        for (id, once, cb) in snapshot {
            // Durable entries removed by an earlier callback in this same
            // delivery must not fire; once entries were already unregistered
            // above and fire exactly once.
            if !once && !self.is_live(topic, id) {
                continue;
            }
            cb(event);
        }
    }

    fn is_live(&self, topic: Topic, id: u64) -> bool {
        let registry = lock(&self.registry);
        registry
            .topics
            .get(&topic)
            .is_some_and(|entries| entries.iter().any(|entry| entry.id == id))
    }
}

#[cfg(test)]
#[path = "bus_test.rs"]
mod tests;
