//! Error types for the session layer.

/// Errors that can occur during session management.
///
/// None of these are fatal: every path through the session layer catches
/// them and degrades to the unauthenticated state.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token could not be decoded as a JWT with the expected claims.
    /// Covers truncated tokens, wrong formats, and missing claims alike —
    /// the caller's reaction is the same for all of them.
    #[error("invalid access token")]
    InvalidToken,

    /// The login endpoint rejected the credentials or was unreachable.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// The refresh endpoint rejected the cookie or was unreachable.
    #[error("refresh failed: {0}")]
    RefreshFailed(String),

    /// Reading or writing the persisted token failed.
    #[error("token store failed: {0}")]
    StoreFailed(#[source] std::io::Error),

    /// Building or using the HTTP client failed outside a specific
    /// login/refresh exchange.
    #[error("http error: {0}")]
    Http(String),
}
