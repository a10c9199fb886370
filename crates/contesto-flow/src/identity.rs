//! Identity/session collaborator.
//!
//! The flow only consumes "who is the current user" plus the two
//! email primitives the guest-merge path needs. The concrete provider
//! lives behind this trait; `StaticIdentityService` backs tests and
//! single-node development.

use async_trait::async_trait;
use contesto_core::models::AuthUser;
use contesto_core::AppError;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The requested email already belongs to another account.
    #[error("Email already registered: {0}")]
    EmailAlreadyRegistered(String),

    #[error("Identity service error: {0}")]
    Other(String),
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    /// The currently authenticated user, if any. Guests count as users.
    async fn current_user(&self) -> Result<Option<AuthUser>, AppError>;

    /// Start an email change for `user_id`. The provider sends its own
    /// confirmation email on success.
    async fn update_email(&self, user_id: Uuid, new_email: &str) -> Result<(), IdentityError>;

    /// Send a sign-in magic link to an already-registered address.
    async fn send_magic_link(&self, email: &str) -> Result<(), IdentityError>;
}

/// In-memory identity service with a settable current user and a set
/// of already-registered addresses.
#[derive(Clone, Default)]
pub struct StaticIdentityService {
    user: Arc<RwLock<Option<AuthUser>>>,
    registered_emails: Arc<RwLock<HashSet<String>>>,
    fail_magic_link: Arc<RwLock<bool>>,
}

impl StaticIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_user(&self, user: Option<AuthUser>) {
        *self.user.write().await = user;
    }

    pub async fn register_email(&self, email: &str) {
        self.registered_emails
            .write()
            .await
            .insert(email.trim().to_lowercase());
    }

    pub async fn set_fail_magic_link(&self, fail: bool) {
        *self.fail_magic_link.write().await = fail;
    }
}

#[async_trait]
impl IdentityService for StaticIdentityService {
    async fn current_user(&self) -> Result<Option<AuthUser>, AppError> {
        Ok(self.user.read().await.clone())
    }

    async fn update_email(&self, _user_id: Uuid, new_email: &str) -> Result<(), IdentityError> {
        let normalized = new_email.trim().to_lowercase();
        if self.registered_emails.read().await.contains(&normalized) {
            return Err(IdentityError::EmailAlreadyRegistered(normalized));
        }
        Ok(())
    }

    async fn send_magic_link(&self, email: &str) -> Result<(), IdentityError> {
        if *self.fail_magic_link.read().await {
            return Err(IdentityError::Other(format!(
                "magic link delivery failed for {}",
                email
            )));
        }
        Ok(())
    }
}
