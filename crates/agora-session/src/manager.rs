//! The session manager: the authoritative owner of the access token.
//!
//! It's responsible for:
//! - Adopting a persisted token at startup (or refreshing it if stale)
//! - Performing the login and logout exchanges
//! - Running the periodic freshness check that the refresh task drives
//! - Publishing [`AuthState`] so UI guards can react to sign-in/sign-out
//!
//! # Failure philosophy
//!
//! Nothing here is fatal. Every failure — undecodable token, rejected
//! refresh, unreachable endpoint, broken store — collapses into the
//! `SignedOut` state. The worst possible outcome of this layer is a forced
//! logout.

use std::time::Duration;

use tokio::sync::{watch, RwLock};

use crate::claims::{decode_claims, Claims};
use crate::{AuthBackend, Audience, Credentials, SessionError, TokenStore};

/// Configuration for session freshness.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// A token expiring within this window triggers a refresh on the next
    /// scheduled check. Must exceed the check interval, or an expiry can
    /// slip between two checks.
    pub refresh_threshold: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_threshold: Duration::from_secs(300),
        }
    }
}

/// Authentication state, published on a watch channel.
///
/// The UI layer decides what to do about transitions (redirect to login,
/// show the account menu); this layer only reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No valid session.
    SignedOut,
    /// A valid session exists for the given subject.
    SignedIn {
        /// The `sub` claim of the current token.
        subject: String,
    },
}

impl AuthState {
    /// Whether this state represents an authenticated session.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::SignedIn { .. })
    }
}

/// A read-only snapshot of the current session.
///
/// Handed out by value; mutating it does not affect the manager.
#[derive(Debug, Clone)]
pub struct Session {
    /// The raw bearer token, as sent to the backend.
    pub raw_token: String,
    /// The decoded claims.
    pub claims: Claims,
}

/// Owns the access token and its lifecycle.
///
/// ```text
/// initialize() ──→ [SignedIn] ──(scheduled_check: near expiry)──→ refresh
///      │                │                                            │
///      │ (no/bad token, │ (logout, refresh failure)                  │
///      │  refresh fails)▼                                            │
///      └──────────→ [SignedOut] ←────────────────────────────────────┘
///                                                        (on failure)
/// ```
///
/// All methods take `&self`; interior state lives behind an async `RwLock`
/// that is never held across an await point, so the manager can be shared
/// as an `Arc` between the UI, the hub registry, and the refresh task.
pub struct SessionManager<S: TokenStore, B: AuthBackend> {
    store: S,
    backend: B,
    config: SessionConfig,
    session: RwLock<Option<Session>>,
    state_tx: watch::Sender<AuthState>,
}

impl<S: TokenStore, B: AuthBackend> SessionManager<S, B> {
    /// Creates a manager in the `SignedOut` state. Call
    /// [`initialize`](Self::initialize) to adopt a persisted token.
    pub fn new(store: S, backend: B, config: SessionConfig) -> Self {
        let (state_tx, _) = watch::channel(AuthState::SignedOut);
        Self {
            store,
            backend,
            config,
            session: RwLock::new(None),
            state_tx,
        }
    }

    /// Restores the session persisted by a previous run.
    ///
    /// - No persisted token → `SignedOut`, zero network calls.
    /// - Token with a future expiry → adopted as-is.
    /// - Expired or undecodable token → exactly one refresh attempt; on
    ///   failure the token is cleared and the state is `SignedOut`.
    ///
    /// Never fails for authentication reasons — the resulting state *is*
    /// the answer.
    pub async fn initialize(&self) -> AuthState {
        let persisted = match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "token store unreadable, treating as absent");
                None
            }
        };

        let Some(token) = persisted else {
            tracing::debug!("no persisted token, starting signed out");
            return self.current_state();
        };

        match decode_claims(&token) {
            Ok(claims) if !claims.is_expired() => {
                tracing::info!(
                    subject = %claims.sub,
                    expires_at = %claims.expires_at(),
                    "adopted persisted session"
                );
                self.adopt(token, claims).await;
            }
            // Expired or undecodable: one refresh attempt, then give up.
            _ => match self.try_refresh().await {
                Ok(()) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "stale token and refresh failed, signing out");
                    self.clear_local().await;
                }
            },
        }

        self.current_state()
    }

    /// Performs the login exchange and adopts the resulting token.
    ///
    /// Returns the new session on success. Redirecting afterwards is the
    /// caller's business.
    pub async fn login(
        &self,
        credentials: &Credentials,
        audience: Audience,
    ) -> Result<Session, SessionError> {
        let token = self.backend.login(credentials, audience).await?;
        let claims = decode_claims(&token)?;

        if let Err(e) = self.store.save(&token) {
            // A session that won't survive a reload is still a session.
            tracing::warn!(error = %e, "failed to persist token");
        }

        tracing::info!(subject = %claims.sub, "login succeeded");
        self.adopt(token.clone(), claims.clone()).await;
        Ok(Session {
            raw_token: token,
            claims,
        })
    }

    /// Signs out: best-effort server notification, then unconditional
    /// local teardown. Cannot fail.
    pub async fn logout(&self) {
        if let Err(e) = self.backend.logout().await {
            tracing::debug!(error = %e, "logout notification failed (ignored)");
        }
        self.clear_local().await;
        tracing::info!("signed out");
    }

    /// The periodic freshness check, invoked by the refresh task.
    ///
    /// Refreshes when the current token expires within the configured
    /// threshold; a failed refresh forces a logout. A no-op while signed
    /// out.
    pub async fn scheduled_check(&self) {
        let needs_refresh = {
            let session = self.session.read().await;
            match session.as_ref() {
                None => false,
                Some(s) => {
                    s.claims.expires_within(self.config.refresh_threshold)
                }
            }
        };

        if !needs_refresh {
            return;
        }

        match self.try_refresh().await {
            Ok(()) => tracing::debug!("access token refreshed"),
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed, forcing logout");
                self.logout().await;
            }
        }
    }

    /// A snapshot of the current session, if signed in.
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// The current raw bearer token, for transports and REST calls.
    pub async fn bearer_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.raw_token.clone())
    }

    /// Whether a session currently exists.
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// The current [`AuthState`].
    pub fn current_state(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    /// Subscribes to [`AuthState`] transitions.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    // -- internals ---------------------------------------------------------

    /// One refresh exchange: new token, decode, persist, adopt.
    async fn try_refresh(&self) -> Result<(), SessionError> {
        let token = self.backend.refresh().await?;
        let claims = decode_claims(&token)?;

        if let Err(e) = self.store.save(&token) {
            tracing::warn!(error = %e, "failed to persist refreshed token");
        }

        self.adopt(token, claims).await;
        Ok(())
    }

    async fn adopt(&self, raw_token: String, claims: Claims) {
        let subject = claims.sub.clone();
        *self.session.write().await = Some(Session { raw_token, claims });
        self.state_tx.send_replace(AuthState::SignedIn { subject });
    }

    async fn clear_local(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear persisted token");
        }
        *self.session.write().await = None;
        self.state_tx.send_replace(AuthState::SignedOut);
    }
}

// =========================================================================
// Tests
// =========================================================================
