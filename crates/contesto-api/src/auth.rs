//! Bearer-token session authentication.
//!
//! The identity provider is an external service; the API only needs
//! "which user does this token belong to". `Session` is the extractor
//! handlers take; it rejects with 401 when the token is missing or not
//! recognized.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use contesto_core::models::AuthUser;
use contesto_core::AppError;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::HttpAppError;
use crate::state::AppState;

#[async_trait]
pub trait SessionAuthenticator: Send + Sync {
    /// Resolve a bearer token to a user. `Ok(None)` means the token is
    /// unknown or expired; `Err` means the provider itself failed.
    async fn authenticate(&self, bearer_token: &str) -> Result<Option<AuthUser>, AppError>;
}

/// The authenticated caller of a request.
pub struct Session(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized("Missing bearer token".to_string()))
            })?;

        let user = state
            .sessions
            .authenticate(token)
            .await
            .map_err(HttpAppError)?
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized(
                    "Invalid or expired session".to_string(),
                ))
            })?;

        Ok(Session(user))
    }
}

#[derive(Deserialize)]
struct AuthUserResponse {
    id: uuid::Uuid,
    email: Option<String>,
    #[serde(default)]
    is_anonymous: bool,
}

/// Authenticator backed by the external identity provider's HTTP API.
pub struct AuthApiSessionAuthenticator {
    http_client: Client,
    base_url: String,
}

impl AuthApiSessionAuthenticator {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create auth HTTP client: {}", e)))?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SessionAuthenticator for AuthApiSessionAuthenticator {
    async fn authenticate(&self, bearer_token: &str) -> Result<Option<AuthUser>, AppError> {
        let response = self
            .http_client
            .get(format!("{}/user", self.base_url))
            .bearer_auth(bearer_token)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Auth provider request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::Internal(format!(
                "Auth provider returned status {}",
                status
            )));
        }

        let user: AuthUserResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Invalid auth provider response: {}", e)))?;

        Ok(Some(AuthUser {
            id: user.id,
            email: user.email,
            is_anonymous: user.is_anonymous,
        }))
    }
}

/// In-memory token table for tests and single-node development. An
/// empty table rejects every request.
#[derive(Clone, Default)]
pub struct StaticSessionAuthenticator {
    sessions: Arc<RwLock<HashMap<String, AuthUser>>>,
}

impl StaticSessionAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_session(&self, token: impl Into<String>, user: AuthUser) {
        self.sessions.write().await.insert(token.into(), user);
    }
}

#[async_trait]
impl SessionAuthenticator for StaticSessionAuthenticator {
    async fn authenticate(&self, bearer_token: &str) -> Result<Option<AuthUser>, AppError> {
        Ok(self.sessions.read().await.get(bearer_token).cloned())
    }
}
