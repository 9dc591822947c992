//! Subscription registry.
//!
//! Maps event names to handlers in registration order. The client only
//! hands out [`Subscription`] disposers holding a weak reference back here,
//! so a disposer outliving its client is harmless.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::identifiers::SubscriptionId;
use crate::protocol::{ClientEvent, EventName};

// ============================================================================
// Types
// ============================================================================

/// Event handler callback type.
///
/// Handlers run synchronously on the task that produced the event. A
/// panicking handler is isolated; the others still run.
pub type Handler = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

// ============================================================================
// SubscriptionRegistry
// ============================================================================

/// Event name → handlers, in registration order.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    handlers: FxHashMap<EventName, Vec<(SubscriptionId, Handler)>>,
}

impl SubscriptionRegistry {
    /// Registers a handler and returns its ID.
    pub(crate) fn insert(&mut self, name: EventName, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.handlers.entry(name).or_default().push((id, handler));
        id
    }

    /// Removes one handler. Empty names are dropped from the map.
    pub(crate) fn remove(&mut self, name: &EventName, id: SubscriptionId) -> bool {
        let Some(entries) = self.handlers.get_mut(name) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;

        if entries.is_empty() {
            self.handlers.remove(name);
        }
        removed
    }

    /// Snapshot of the handlers for `name`, in registration order.
    pub(crate) fn handlers_for(&self, name: &EventName) -> Vec<Handler> {
        self.handlers
            .get(name)
            .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }

    /// Number of distinct subscribed event names.
    pub(crate) fn event_count(&self) -> usize {
        self.handlers.len()
    }

    /// Number of handlers across all names.
    pub(crate) fn total_handlers(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Disposer for handlers registered with
/// [`SocketClient::on`](crate::SocketClient::on) or
/// [`SocketClient::subscribe`](crate::SocketClient::subscribe).
///
/// Dropping a `Subscription` keeps the handlers registered; call
/// [`unsubscribe`](Self::unsubscribe) or convert it with
/// [`guard`](Self::guard) for scope-bound handlers.
pub struct Subscription {
    registry: Weak<Mutex<SubscriptionRegistry>>,
    entries: Vec<(EventName, SubscriptionId)>,
}

impl Subscription {
    pub(crate) fn new(
        registry: &Arc<Mutex<SubscriptionRegistry>>,
        entries: Vec<(EventName, SubscriptionId)>,
    ) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            entries,
        }
    }

    /// IDs of the registered handlers, one per event name.
    #[must_use]
    pub fn ids(&self) -> Vec<SubscriptionId> {
        self.entries.iter().map(|(_, id)| *id).collect()
    }

    /// Event names covered by this subscription.
    #[must_use]
    pub fn names(&self) -> Vec<EventName> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Removes every handler of this subscription.
    pub fn unsubscribe(mut self) {
        self.remove_all();
    }

    /// Turns the subscription into a guard that unsubscribes on drop.
    #[must_use]
    pub fn guard(self) -> SubscriptionGuard {
        SubscriptionGuard(self)
    }

    fn remove_all(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.lock();
        for (name, id) in self.entries.drain(..) {
            registry.remove(&name, id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("entries", &self.entries)
            .finish()
    }
}

/// Scope-bound [`Subscription`].
#[must_use = "dropping the guard unsubscribes immediately"]
#[derive(Debug)]
pub struct SubscriptionGuard(Subscription);

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.remove_all();
    }
}

// ============================================================================
// Tests
// ============================================================================
