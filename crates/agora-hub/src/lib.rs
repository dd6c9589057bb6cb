//! Realtime hub connections for Agora.
//!
//! A *hub* is a named server endpoint pushing events to the client
//! ("cartHub", "notificationHub"). This crate keeps at most one live
//! connection per hub name and multiplexes any number of event listeners
//! over it:
//!
//! - [`HubRegistry`] — the by-name connection table and its single-flight
//!   guarantee
//! - [`HubHandle`] / [`spawn_hub`] — the per-hub connection task
//! - [`EventDispatcher`] / [`Subscription`] — callback fan-out with
//!   drop-based unsubscription
//! - [`TokenProvider`] — where dials get their bearer token from
//!
//! Reconnection lives inside the connection task; callers only ever see
//! the [`TransportState`](agora_transport::TransportState) it publishes.


mod connection;
mod dispatcher;
mod error;
mod registry;
mod token;

pub use connection::{spawn_hub, HubHandle};
pub use dispatcher::{EventDispatcher, Subscription};
pub use error::HubError;
pub use registry::HubRegistry;
pub use token::{Anonymous, StaticToken, TokenProvider};
