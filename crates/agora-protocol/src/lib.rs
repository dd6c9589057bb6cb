//! Wire protocol for Agora hubs.
//!
//! This crate defines the "language" spoken on a hub connection:
//!
//! - **Types** ([`HubMessage`], [`CartUpdate`], [`Notification`]) — the
//!   structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those structures are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! The protocol layer sits between transport (raw frames) and the hub
//! registry (subscriptions). It knows nothing about connections, tokens,
//! or callbacks — only how messages are shaped.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{events, hubs, CartUpdate, HubMessage, Notification};
