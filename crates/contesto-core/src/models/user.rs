use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The identity service's view of the current user. Guests are
/// anonymous identities that can act before registering an email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl AuthUser {
    /// Normalized (trimmed, lowercase) email, if present and non-empty.
    pub fn normalized_email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    }
}

/// The profile fields this subsystem consumes. All nullable; see
/// [`crate::profile::is_profile_complete`] for the completeness rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl UserProfile {
    /// Trimmed first/last name pair, available only when both meet the
    /// 2-character minimum the submission flow requires.
    pub fn name_parts(&self) -> Option<(String, String)> {
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        if first.chars().count() < 2 || last.chars().count() < 2 {
            return None;
        }
        Some((first.to_string(), last.to_string()))
    }
}
