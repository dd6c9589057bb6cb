//! Client core for the Agora marketplace frontend.
//!
//! Two concerns, one facade:
//!
//! - **Session** — login, logout, token persistence, and a background
//!   check that refreshes the access token before it expires
//!   (re-exported from [`agora_session`])
//! - **Realtime** — named hub connections ("cartHub", "notificationHub")
//!   with at most one live connection per hub, event subscriptions, and
//!   transport-owned reconnection (re-exported from [`agora_hub`])
//!
//! [`AgoraClient`] ties them together: hubs always dial with whatever
//! token the session currently holds.
//!
//! # Example
//!
//! ```no_run
//! use agora::{AgoraClient, AgoraClientBuilder};
//! use agora::session::{Credentials, Audience, FileTokenStore, HttpAuthBackend};
//! use agora::transport::WebSocketConnector;
//! use agora::protocol::{events, hubs};
//!
//! # async fn run() -> Result<(), agora::AgoraError> {
//! let client = AgoraClientBuilder::new(
//!     WebSocketConnector::new("wss://api.example.com/hubs"),
//!     FileTokenStore::new("/tmp/agora"),
//!     HttpAuthBackend::new("https://api.example.com")?,
//! )
//! .build();
//!
//! client.initialize().await;
//! client
//!     .sign_in(
//!         &Credentials {
//!             email: "shopper@example.com".into(),
//!             password: "secret".into(),
//!         },
//!         Audience::Customer,
//!     )
//!     .await?;
//!
//! client.hubs().start_connection(hubs::CART).await;
//! let _badge = client
//!     .hubs()
//!     .subscribe_to_event(hubs::CART, events::RECEIVE_CART_UPDATE, |payload| {
//!         println!("cart changed: {payload}");
//!     })
//!     .await;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;

pub use client::{AgoraClient, AgoraClientBuilder, SessionTokens};
pub use error::AgoraError;

pub use agora_hub as hub;
pub use agora_protocol as protocol;
pub use agora_session as session;
pub use agora_transport as transport;
