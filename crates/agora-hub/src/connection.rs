//! The per-hub connection actor.
//!
//! Each live hub connection is a spawned task that owns the transport
//! connection outright. All interaction goes through a [`HubHandle`]:
//! commands travel over an mpsc channel, connection state comes back over
//! watch channels, and inbound events fan out through the hub's
//! [`EventDispatcher`].
//!
//! ```text
//!        HubHandle                        connection task
//!  invoke() ──┐
//!  stop()   ──┼── mpsc ──────────────→ ┌────────────────────┐
//!             │                        │ dial → session loop │──→ dispatcher
//!  state()  ←─┴── watch ←───────────── │   └─ reconnect ladder
//!                                      └────────────────────┘
//! ```
//!
//! Reconnection is owned here, not by callers: when a session drops, the
//! task walks the [`ReconnectPolicy`] ladder with a fresh token per
//! attempt. A successful connection resets the ladder; exhausting it
//! parks the hub in `Disconnected` and ends the task.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use agora_protocol::{Codec, HubMessage, JsonCodec};
use agora_transport::{
    Connection, ConnectionId, Connector, ReconnectPolicy, TransportError,
    TransportState,
};

use crate::dispatcher::{EventDispatcher, Subscription};
use crate::{HubError, TokenProvider};

const COMMAND_BUFFER: usize = 32;

enum Command {
    Invoke { method: String, args: Vec<Value> },
    Stop,
}

/// Handle to one hub's connection task.
///
/// Cheap to clone; all clones address the same task. The task outlives
/// its handles only until it notices the command channel closed.
#[derive(Clone)]
pub struct HubHandle {
    name: String,
    cmd_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<TransportState>,
    conn_id_rx: watch::Receiver<Option<ConnectionId>>,
    dispatcher: Arc<EventDispatcher>,
}

impl HubHandle {
    /// The hub name this connection serves.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current transport state.
    pub fn state(&self) -> TransportState {
        *self.state_rx.borrow()
    }

    /// A receiver for transport state transitions.
    pub fn state_changes(&self) -> watch::Receiver<TransportState> {
        self.state_rx.clone()
    }

    /// The id of the underlying connection, while one exists.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        *self.conn_id_rx.borrow()
    }

    /// Registers `callback` for `event` on this hub. Delivery starts with
    /// the next matching frame and stops when the returned subscription
    /// is dropped.
    pub fn subscribe<F>(&self, event: &str, callback: F) -> Subscription
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.dispatcher.register(event, callback)
    }

    /// Queues a method invocation for the server.
    pub async fn invoke(
        &self,
        method: impl Into<String>,
        args: Vec<Value>,
    ) -> Result<(), HubError> {
        self.cmd_tx
            .send(Command::Invoke {
                method: method.into(),
                args,
            })
            .await
            .map_err(|_| HubError::Stopped(self.name.clone()))
    }

    /// Asks the task to close the connection and exit. Idempotent; also a
    /// no-op if the task already exited.
    pub async fn stop(&self) {
        let _ = self.cmd_tx.send(Command::Stop).await;
    }

    /// Whether the connection task has exited.
    pub fn is_stopped(&self) -> bool {
        self.cmd_tx.is_closed()
    }
}

/// Spawns the connection task for `name` and returns its handle.
pub fn spawn_hub<C, T>(
    name: impl Into<String>,
    connector: Arc<C>,
    tokens: Arc<T>,
    policy: ReconnectPolicy,
) -> HubHandle
where
    C: Connector,
    T: TokenProvider,
{
    let name = name.into();
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (state_tx, state_rx) = watch::channel(TransportState::Connecting);
    let (conn_id_tx, conn_id_rx) = watch::channel(None);
    let dispatcher = Arc::new(EventDispatcher::new());

    let task = HubTask {
        name: name.clone(),
        connector,
        tokens,
        policy,
        dispatcher: Arc::clone(&dispatcher),
        cmd_rx,
        state_tx,
        conn_id_tx,
    };
    tokio::spawn(task.run());

    HubHandle {
        name,
        cmd_tx,
        state_rx,
        conn_id_rx,
        dispatcher,
    }
}

struct HubTask<C: Connector, T: TokenProvider> {
    name: String,
    connector: Arc<C>,
    tokens: Arc<T>,
    policy: ReconnectPolicy,
    dispatcher: Arc<EventDispatcher>,
    cmd_rx: mpsc::Receiver<Command>,
    state_tx: watch::Sender<TransportState>,
    conn_id_tx: watch::Sender<Option<ConnectionId>>,
}

/// Why a session loop returned.
enum SessionEnd {
    /// Stop command, or every handle dropped.
    Stopped,
    /// Connection lost; try to reconnect.
    Lost,
}

impl<C: Connector, T: TokenProvider> HubTask<C, T> {
    async fn run(mut self) {
        let mut first = true;
        loop {
            let phase = if first {
                TransportState::Connecting
            } else {
                TransportState::Reconnecting
            };
            self.transition(phase);

            let Some(conn) = self.dial_with_backoff(first).await else {
                // Ladder exhausted or stopped during backoff.
                self.transition(TransportState::Disconnected);
                return;
            };

            self.transition(TransportState::Connected);
            self.conn_id_tx.send_replace(Some(conn.id()));
            tracing::info!(hub = %self.name, connection = %conn.id(), "hub connected");

            let end = self.session(&conn).await;
            self.conn_id_tx.send_replace(None);
            match end {
                SessionEnd::Stopped => {
                    let _ = conn.close().await;
                    self.transition(TransportState::Disconnected);
                    tracing::info!(hub = %self.name, "hub stopped");
                    return;
                }
                SessionEnd::Lost => {
                    first = false;
                }
            }
        }
    }

    /// Obtains a connection, walking the retry ladder on failures. `None`
    /// means the ladder ran out or a stop arrived while waiting.
    ///
    /// The ladder only schedules *retries*. On the first-ever connect the
    /// opening dial is unconditional, so a policy with no delays still
    /// dials exactly once; a reconnect cycle starts straight on the
    /// ladder, so the same policy never redials after a drop.
    async fn dial_with_backoff(&mut self, initial: bool) -> Option<C::Conn> {
        if initial {
            match self.try_dial().await {
                Ok(conn) => return Some(conn),
                Err(e) => {
                    tracing::warn!(hub = %self.name, error = %e, "dial failed");
                }
            }
        }

        for attempt in 0.. {
            let delay = match self.policy.delay(attempt) {
                Some(delay) => delay,
                None => {
                    tracing::warn!(
                        hub = %self.name,
                        attempts = attempt,
                        "giving up after exhausting reconnect delays"
                    );
                    return None;
                }
            };
            if !self.wait_or_stop(delay).await {
                return None;
            }

            match self.try_dial().await {
                Ok(conn) => return Some(conn),
                Err(e) => {
                    tracing::warn!(
                        hub = %self.name,
                        attempt,
                        error = %e,
                        "dial failed"
                    );
                }
            }
        }
        unreachable!("for loop over 0.. only exits via return")
    }

    /// One dial attempt with a freshly fetched token: a refresh that
    /// landed during an outage must be used, not the token from before it.
    async fn try_dial(&self) -> Result<C::Conn, TransportError> {
        let token = self.tokens.access_token().await;
        self.connector.dial(&self.name, token.as_deref()).await
    }

    /// Sleeps for `delay`, still answering commands. Returns `false` when
    /// a stop arrived.
    async fn wait_or_stop(&mut self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return true,
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Invoke { method, .. }) => {
                        tracing::debug!(
                            hub = %self.name,
                            method,
                            "dropping invocation while not connected"
                        );
                    }
                    Some(Command::Stop) | None => return false,
                },
            }
        }
    }

    /// Pumps one live connection until it drops or a stop arrives.
    async fn session(&mut self, conn: &C::Conn) -> SessionEnd {
        let codec = JsonCodec;
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Invoke { method, args }) => {
                        let msg = HubMessage::invocation(method, args);
                        let bytes = match codec.encode(&msg) {
                            Ok(bytes) => bytes,
                            Err(e) => {
                                tracing::warn!(hub = %self.name, error = %e, "failed to encode invocation");
                                continue;
                            }
                        };
                        if let Err(e) = conn.send(&bytes).await {
                            tracing::warn!(hub = %self.name, error = %e, "send failed, reconnecting");
                            return SessionEnd::Lost;
                        }
                    }
                    Some(Command::Stop) | None => return SessionEnd::Stopped,
                },
                frame = conn.recv() => match frame {
                    Ok(Some(bytes)) => self.handle_frame(&codec, &bytes),
                    Ok(None) => {
                        tracing::info!(hub = %self.name, "server closed the connection");
                        return SessionEnd::Lost;
                    }
                    Err(e) => {
                        tracing::warn!(hub = %self.name, error = %e, "receive failed, reconnecting");
                        return SessionEnd::Lost;
                    }
                },
            }
        }
    }

    fn handle_frame(&self, codec: &JsonCodec, bytes: &[u8]) {
        match codec.decode::<HubMessage>(bytes) {
            Ok(HubMessage::Event { event, payload }) => {
                tracing::trace!(hub = %self.name, event, "event received");
                self.dispatcher.dispatch(&event, payload);
            }
            Ok(HubMessage::Ping) => {
                tracing::trace!(hub = %self.name, "ping");
            }
            Ok(HubMessage::Invocation { method, .. }) => {
                tracing::debug!(hub = %self.name, method, "ignoring server-side invocation frame");
            }
            // A malformed frame is the server's bug, not a reason to drop
            // an otherwise healthy connection.
            Err(e) => {
                tracing::debug!(hub = %self.name, error = %e, "skipping undecodable frame");
            }
        }
    }

    fn transition(&self, state: TransportState) {
        let old = *self.state_tx.borrow();
        if old != state {
            tracing::debug!(hub = %self.name, from = %old, to = %state, "transport state change");
        }
        self.state_tx.send_replace(state);
    }
}
