//! Fan-out of server events to registered callbacks.
//!
//! Each hub connection owns one [`EventDispatcher`]. Callbacks for the
//! same event name run in registration order; a [`Subscription`] removes
//! its callback when dropped, so listener lifetime follows ordinary Rust
//! ownership instead of manual unsubscribe calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;

type Callback = Arc<dyn Fn(Value) + Send + Sync>;

struct Handler {
    id: u64,
    callback: Callback,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    handlers: HashMap<String, Vec<Handler>>,
}

/// Routes decoded event payloads to callbacks by event name.
#[derive(Default)]
pub struct EventDispatcher {
    inner: Mutex<Inner>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `event`. The callback stays registered
    /// until the returned [`Subscription`] is dropped.
    pub fn register<F>(self: &Arc<Self>, event: &str, callback: F) -> Subscription
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let id = inner.next_id;
            inner.next_id += 1;
            inner
                .handlers
                .entry(event.to_owned())
                .or_default()
                .push(Handler {
                    id,
                    callback: Arc::new(callback),
                });
            id
        };
        Subscription {
            dispatcher: Arc::downgrade(self),
            event: event.to_owned(),
            id,
        }
    }

    /// Delivers `payload` to every callback registered for `event`, in
    /// registration order. A `null` payload is dropped here so callbacks
    /// never see one.
    pub fn dispatch(&self, event: &str, payload: Value) {
        if payload.is_null() {
            tracing::trace!(event, "dropping event with null payload");
            return;
        }

        // Snapshot the callbacks so a callback may register or drop
        // subscriptions without deadlocking on the handler table.
        let callbacks: Vec<Callback> = {
            let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            match inner.handlers.get(event) {
                Some(handlers) => {
                    handlers.iter().map(|h| Arc::clone(&h.callback)).collect()
                }
                None => {
                    tracing::trace!(event, "no listeners for event");
                    return;
                }
            }
        };

        for callback in callbacks {
            callback(payload.clone());
        }
    }

    /// How many callbacks are registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.handlers.get(event).map_or(0, Vec::len)
    }

    fn unregister(&self, event: &str, id: u64) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handlers) = inner.handlers.get_mut(event) {
            handlers.retain(|h| h.id != id);
            if handlers.is_empty() {
                inner.handlers.remove(event);
            }
        }
    }
}

/// A live registration for one event callback. Dropping it removes the
/// callback.
pub struct Subscription {
    dispatcher: Weak<EventDispatcher>,
    event: String,
    id: u64,
}

impl Subscription {
    /// The event name this subscription listens to.
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.unregister(&self.event, self.id);
        }
    }
}
