//! The hub registry: at most one live connection per hub name.
//!
//! UI code talks to hubs by name ("cartHub", "notificationHub") and never
//! holds a connection itself. The registry enforces the single-flight
//! rule: asking for a hub that is already connecting or connected hands
//! back the existing connection instead of dialing a second one.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use agora_transport::{ConnectionId, Connector, ReconnectPolicy, TransportState};

use crate::connection::{spawn_hub, HubHandle};
use crate::dispatcher::Subscription;
use crate::TokenProvider;

/// Owns every hub connection, keyed by hub name.
///
/// All methods take `&self`; the registry is meant to live in an `Arc`
/// shared across the UI layer.
pub struct HubRegistry<C: Connector, T: TokenProvider> {
    connector: Arc<C>,
    tokens: Arc<T>,
    policy: ReconnectPolicy,
    hubs: Mutex<HashMap<String, HubHandle>>,
}

impl<C: Connector, T: TokenProvider> HubRegistry<C, T> {
    pub fn new(connector: C, tokens: T, policy: ReconnectPolicy) -> Self {
        Self {
            connector: Arc::new(connector),
            tokens: Arc::new(tokens),
            policy,
            hubs: Mutex::new(HashMap::new()),
        }
    }

    /// Ensures a connection for `hub` exists, dialing one if needed.
    ///
    /// Single-flight: while the hub is connecting, connected, or
    /// reconnecting, further calls return the existing handle. A hub
    /// whose task gave up (or was stopped) is replaced by a fresh one.
    pub async fn start_connection(&self, hub: &str) -> HubHandle {
        // The lock is held across the check and the insert so two
        // concurrent calls cannot both dial.
        let mut hubs = self.hubs.lock().await;
        if let Some(handle) = hubs.get(hub) {
            if handle.state().is_live() && !handle.is_stopped() {
                tracing::debug!(hub, "connection already live, reusing");
                return handle.clone();
            }
            tracing::debug!(hub, "replacing dead connection entry");
        }

        tracing::info!(hub, "starting hub connection");
        let handle = spawn_hub(
            hub,
            Arc::clone(&self.connector),
            Arc::clone(&self.tokens),
            self.policy.clone(),
        );
        hubs.insert(hub.to_owned(), handle.clone());
        handle
    }

    /// Registers `callback` for `event` on `hub`.
    ///
    /// Returns `None` (with a warning) when the hub has no connection —
    /// subscribing is only meaningful against a started hub.
    pub async fn subscribe_to_event<F>(
        &self,
        hub: &str,
        event: &str,
        callback: F,
    ) -> Option<Subscription>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let hubs = self.hubs.lock().await;
        match hubs.get(hub) {
            Some(handle) => Some(handle.subscribe(event, callback)),
            None => {
                tracing::warn!(hub, event, "subscribe on unknown hub ignored");
                None
            }
        }
    }

    /// Sends a method invocation to `hub`.
    ///
    /// Diagnostics-only when the hub is absent or not currently
    /// connected; the message is dropped, never queued across a dial.
    pub async fn send_message(&self, hub: &str, method: &str, args: Vec<Value>) {
        let handle = {
            let hubs = self.hubs.lock().await;
            hubs.get(hub).cloned()
        };
        let Some(handle) = handle else {
            tracing::warn!(hub, method, "send on unknown hub ignored");
            return;
        };
        if handle.state() != TransportState::Connected {
            tracing::warn!(
                hub,
                method,
                state = %handle.state(),
                "send while not connected ignored"
            );
            return;
        }
        if let Err(e) = handle.invoke(method, args).await {
            tracing::warn!(hub, method, error = %e, "send failed");
        }
    }

    /// Stops `hub`'s connection. Idempotent; unknown hubs are a no-op.
    pub async fn stop_connection(&self, hub: &str) {
        let handle = {
            let mut hubs = self.hubs.lock().await;
            hubs.remove(hub)
        };
        match handle {
            Some(handle) => handle.stop().await,
            None => tracing::debug!(hub, "stop on unknown hub ignored"),
        }
    }

    /// Stops every connection, for sign-out.
    pub async fn stop_all_connections(&self) {
        let handles: Vec<HubHandle> = {
            let mut hubs = self.hubs.lock().await;
            hubs.drain().map(|(_, h)| h).collect()
        };
        for handle in handles {
            handle.stop().await;
        }
    }

    /// Current transport state for `hub`, `Disconnected` when absent.
    pub async fn connection_state(&self, hub: &str) -> TransportState {
        let hubs = self.hubs.lock().await;
        hubs.get(hub)
            .map(HubHandle::state)
            .unwrap_or(TransportState::Disconnected)
    }

    /// The underlying connection id for `hub`, while one is live.
    pub async fn connection_id(&self, hub: &str) -> Option<ConnectionId> {
        let hubs = self.hubs.lock().await;
        hubs.get(hub).and_then(HubHandle::connection_id)
    }
}
