//! Access-token session management for Agora.
//!
//! This crate owns the authoritative copy of the access token and keeps it
//! fresh:
//!
//! 1. **Claims** — decoding the token's embedded claims and expiry
//!    ([`Claims`], [`decode_claims`])
//! 2. **Persistence** — remembering the token across reloads
//!    ([`TokenStore`] trait)
//! 3. **Exchange** — login / refresh / logout against the auth endpoints
//!    ([`AuthBackend`] trait)
//! 4. **Lifecycle** — the state machine tying them together
//!    ([`SessionManager`]), plus the background refresh check
//!    ([`RefreshTask`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Hub Registry (sibling)  ← pulls the current bearer token at connect time
//!     ↕
//! Session layer (this crate)  ← owns token, claims, and auth state
//!     ↕
//! Auth endpoints (remote)  ← login / refresh / logout
//! ```
//!
//! Every failure in this layer degrades to "not authenticated" — a bad
//! token, a rejected refresh, or an unreachable endpoint never panics and
//! never retries in a loop. Redirect decisions belong to the UI layer,
//! which observes [`AuthState`] through a watch channel.


mod backend;
mod claims;
mod error;
mod manager;
mod refresh;
mod store;

pub use backend::{Audience, AuthBackend, Credentials, HttpAuthBackend};
pub use claims::{decode_claims, Claims};
pub use error::SessionError;
pub use manager::{AuthState, Session, SessionConfig, SessionManager};
pub use refresh::{RefreshConfig, RefreshTask};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_FILE_NAME};
