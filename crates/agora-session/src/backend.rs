//! Auth endpoint exchange: login, refresh, logout.
//!
//! Agora doesn't hard-code the HTTP stack into the session state machine.
//! The [`AuthBackend`] trait is the seam: production uses
//! [`HttpAuthBackend`] against the marketplace's auth endpoints, tests use
//! scripted mocks that count calls.

use serde::{Deserialize, Serialize};

use crate::SessionError;

const LOGIN_PATH: &str = "/api/auth/login";
const REFRESH_PATH: &str = "/api/auth/refresh";
const LOGOUT_PATH: &str = "/api/auth/logout";

/// Login credentials.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Plaintext password; travels only over the TLS'd login call.
    pub password: String,
}

/// Which face of the marketplace the session is for.
///
/// The backend issues tokens with different role claims for the shopper
/// UI and the admin console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Audience {
    /// The consumer storefront.
    Customer,
    /// The admin console.
    Admin,
}

/// Exchanges credentials and cookies for access tokens.
pub trait AuthBackend: Send + Sync + 'static {
    /// Performs the login exchange. Returns the raw access token.
    fn login(
        &self,
        credentials: &Credentials,
        audience: Audience,
    ) -> impl std::future::Future<Output = Result<String, SessionError>> + Send;

    /// Obtains a fresh access token. Authenticated by the refresh cookie
    /// the login exchange set — no token argument needed.
    fn refresh(
        &self,
    ) -> impl std::future::Future<Output = Result<String, SessionError>> + Send;

    /// Notifies the server that the session is over. Callers treat this as
    /// fire-and-forget; failures are logged and ignored.
    fn logout(
        &self,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// The REST layer's uniform response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPayload {
    access_token: String,
}

/// [`AuthBackend`] over HTTP, with a cookie store for the refresh cookie.
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    base_url: String,
    http: reqwest::Client,
}

impl HttpAuthBackend {
    /// Creates a backend for the given API origin, e.g.
    /// `https://api.example-market.com`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| SessionError::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Unwraps the `{ success, data, message }` envelope into a token.
    fn into_token(
        response: ApiResponse<TokenPayload>,
    ) -> Result<String, String> {
        if !response.success {
            return Err(response
                .message
                .unwrap_or_else(|| "rejected by server".to_string()));
        }
        response
            .data
            .map(|p| p.access_token)
            .ok_or_else(|| "response missing token".to_string())
    }
}

impl AuthBackend for HttpAuthBackend {
    async fn login(
        &self,
        credentials: &Credentials,
        audience: Audience,
    ) -> Result<String, SessionError> {
        let body = serde_json::json!({
            "email": credentials.email,
            "password": credentials.password,
            "audience": audience,
        });

        let response = self
            .http
            .post(self.url(LOGIN_PATH))
            .json(&body)
            .send()
            .await
            .map_err(|e| SessionError::LoginFailed(e.to_string()))?
            .json::<ApiResponse<TokenPayload>>()
            .await
            .map_err(|e| SessionError::LoginFailed(e.to_string()))?;

        Self::into_token(response).map_err(SessionError::LoginFailed)
    }

    async fn refresh(&self) -> Result<String, SessionError> {
        let response = self
            .http
            .post(self.url(REFRESH_PATH))
            .send()
            .await
            .map_err(|e| SessionError::RefreshFailed(e.to_string()))?
            .json::<ApiResponse<TokenPayload>>()
            .await
            .map_err(|e| SessionError::RefreshFailed(e.to_string()))?;

        Self::into_token(response).map_err(SessionError::RefreshFailed)
    }

    async fn logout(&self) -> Result<(), SessionError> {
        self.http
            .post(self.url(LOGOUT_PATH))
            .send()
            .await
            .map_err(|e| SessionError::Http(e.to_string()))?;
        Ok(())
    }
}
