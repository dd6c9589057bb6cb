//! Where hub connections get their bearer token from.
//!
//! The registry asks the provider for a token at every dial, including
//! every reconnect attempt, so a token refreshed mid-outage is picked up
//! automatically.

use std::future::Future;

/// Supplies the current access token for authenticated dials.
pub trait TokenProvider: Send + Sync + 'static {
    /// The token to attach to the next dial, or `None` for an anonymous
    /// connection.
    fn access_token(&self) -> impl Future<Output = Option<String>> + Send;
}

/// Always dials anonymously.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl TokenProvider for Anonymous {
    async fn access_token(&self) -> Option<String> {
        None
    }
}

/// A fixed token, mainly for tests and tools.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}
