//! The client facade: one object wiring the session layer to the hub
//! layer.
//!
//! [`AgoraClient`] owns the [`SessionManager`], the background refresh
//! task, and the [`HubRegistry`]. The registry pulls its bearer token
//! from the session through the [`SessionTokens`] adapter, so hubs dialed
//! after a refresh automatically carry the new token.

use std::sync::Arc;

use agora_hub::{HubRegistry, TokenProvider};
use agora_session::{
    AuthBackend, AuthState, Credentials, Audience, RefreshConfig, RefreshTask,
    Session, SessionConfig, SessionManager, TokenStore,
};
use agora_transport::{Connector, ReconnectPolicy};
use tokio::sync::watch;

use crate::AgoraError;

/// [`TokenProvider`] backed by the session manager's current token.
pub struct SessionTokens<S: TokenStore, B: AuthBackend> {
    session: Arc<SessionManager<S, B>>,
}

impl<S: TokenStore, B: AuthBackend> TokenProvider for SessionTokens<S, B> {
    async fn access_token(&self) -> Option<String> {
        self.session.bearer_token().await
    }
}

/// Builder for [`AgoraClient`].
pub struct AgoraClientBuilder<C: Connector, S: TokenStore, B: AuthBackend> {
    connector: C,
    store: S,
    backend: B,
    session_config: SessionConfig,
    refresh_config: RefreshConfig,
    reconnect_policy: ReconnectPolicy,
}

impl<C: Connector, S: TokenStore, B: AuthBackend> AgoraClientBuilder<C, S, B> {
    pub fn new(connector: C, store: S, backend: B) -> Self {
        Self {
            connector,
            store,
            backend,
            session_config: SessionConfig::default(),
            refresh_config: RefreshConfig::default(),
            reconnect_policy: ReconnectPolicy::default(),
        }
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    pub fn refresh_config(mut self, config: RefreshConfig) -> Self {
        self.refresh_config = config;
        self
    }

    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect_policy = policy;
        self
    }

    /// Builds the client. No network traffic happens until
    /// [`AgoraClient::initialize`].
    pub fn build(self) -> AgoraClient<C, S, B> {
        let session = Arc::new(SessionManager::new(
            self.store,
            self.backend,
            self.session_config,
        ));
        let hubs = HubRegistry::new(
            self.connector,
            SessionTokens {
                session: Arc::clone(&session),
            },
            self.reconnect_policy,
        );
        AgoraClient {
            session,
            hubs,
            refresh_config: self.refresh_config,
            refresh: std::sync::Mutex::new(None),
        }
    }
}

/// The assembled client core: session on one side, realtime hubs on the
/// other.
pub struct AgoraClient<C: Connector, S: TokenStore, B: AuthBackend> {
    session: Arc<SessionManager<S, B>>,
    hubs: HubRegistry<C, SessionTokens<S, B>>,
    refresh_config: RefreshConfig,
    refresh: std::sync::Mutex<Option<RefreshTask>>,
}

impl<C: Connector, S: TokenStore, B: AuthBackend> AgoraClient<C, S, B> {
    /// Restores any persisted session and starts the background refresh
    /// check. The check runs for the client's lifetime; it is a no-op
    /// while signed out.
    pub async fn initialize(&self) -> AuthState {
        let state = self.session.initialize().await;

        let mut refresh = self.refresh.lock().unwrap_or_else(|e| e.into_inner());
        if refresh.is_none() {
            *refresh = Some(RefreshTask::spawn(
                Arc::clone(&self.session),
                self.refresh_config.clone(),
            ));
        }
        state
    }

    /// Signs in with the given credentials.
    pub async fn sign_in(
        &self,
        credentials: &Credentials,
        audience: Audience,
    ) -> Result<Session, AgoraError> {
        let session = self.session.login(credentials, audience).await?;
        Ok(session)
    }

    /// Signs out: realtime connections first (their token is about to
    /// die), then the session itself.
    pub async fn sign_out(&self) {
        self.hubs.stop_all_connections().await;
        self.session.logout().await;
    }

    /// Stops everything: hubs, refresh task. The session itself is left
    /// as-is so a later client picks it up from the store.
    pub async fn shutdown(&self) {
        self.hubs.stop_all_connections().await;
        let task = self
            .refresh
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            task.cancel();
        }
        tracing::info!("client shut down");
    }

    /// The realtime hub registry.
    pub fn hubs(&self) -> &HubRegistry<C, SessionTokens<S, B>> {
        &self.hubs
    }

    /// The session manager.
    pub fn session(&self) -> &Arc<SessionManager<S, B>> {
        &self.session
    }

    /// Current authentication state.
    pub fn auth_state(&self) -> AuthState {
        self.session.current_state()
    }

    /// Subscribes to authentication state transitions.
    pub fn subscribe_auth(&self) -> watch::Receiver<AuthState> {
        self.session.subscribe()
    }
}
