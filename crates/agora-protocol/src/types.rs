//! Wire types for hub traffic.
//!
//! A hub connection carries exactly three kinds of frames: server-pushed
//! events, client-invoked methods, and keepalive pings. Payloads are JSON
//! values; the typed structs below decode the payloads of the known
//! marketplace events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known hub names exposed by the backend.
pub mod hubs {
    /// Cart badge synchronization.
    pub const CART: &str = "cartHub";
    /// Notification dropdown feed.
    pub const NOTIFICATION: &str = "notificationHub";
}

/// Well-known event names pushed by the backend.
///
/// Event names are part of the wire contract and are matched verbatim,
/// including the backend's idiosyncratic casing.
pub mod events {
    /// Cart item count / total changed.
    pub const RECEIVE_CART_UPDATE: &str = "ReceiveCartUpdate";
    /// A single new notification.
    pub const RECEIVE_NOTIFICATION: &str = "ReceiveNotification";
    /// The latest-notifications list, sent after subscribing.
    pub const RECEIVE_LATEST_NOTIFICATIONS: &str =
        "ReceiveListofLatestNotification";
}

// ---------------------------------------------------------------------------
// HubMessage — the frame envelope
// ---------------------------------------------------------------------------

/// A single frame on a hub connection.
///
/// Tagged JSON on the wire:
///
/// ```json
/// {"type":"event","event":"ReceiveCartUpdate","payload":{"numberOfItems":3,"totalPrice":45.5}}
/// {"type":"invocation","method":"MarkNotificationRead","args":[17]}
/// {"type":"ping"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HubMessage {
    /// A server-pushed event, dispatched to subscribers by event name.
    Event {
        /// Event name, e.g. `"ReceiveCartUpdate"`.
        event: String,
        /// JSON payload handed to subscriber callbacks.
        payload: Value,
    },

    /// A client-to-server method call (fire-and-forget).
    Invocation {
        /// Server-side method name.
        method: String,
        /// Positional arguments.
        args: Vec<Value>,
    },

    /// Keepalive. Never surfaced to subscribers.
    Ping,
}

impl HubMessage {
    /// Builds an event frame.
    pub fn event(event: impl Into<String>, payload: Value) -> Self {
        Self::Event {
            event: event.into(),
            payload,
        }
    }

    /// Builds an invocation frame.
    pub fn invocation(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Invocation {
            method: method.into(),
            args,
        }
    }
}

// ---------------------------------------------------------------------------
// Typed payloads
// ---------------------------------------------------------------------------

/// Payload of [`events::RECEIVE_CART_UPDATE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartUpdate {
    /// Total item count across the cart.
    pub number_of_items: u32,
    /// Cart total in the display currency.
    pub total_price: f64,
}

/// Payload of [`events::RECEIVE_NOTIFICATION`]; also the element type of
/// [`events::RECEIVE_LATEST_NOTIFICATIONS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Server-assigned notification id.
    pub id: u64,
    /// Short headline shown in the dropdown.
    pub title: String,
    /// Full message body.
    pub body: String,
    /// Whether the user has already seen it.
    pub is_read: bool,
    /// ISO-8601 creation timestamp, as the backend formats it.
    pub created_at: String,
}
