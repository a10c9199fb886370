//! Post-auth redirect resolver.
//!
//! Decides where a freshly signed-in user lands: the destination they
//! asked for, the profile-completion gate, or the resume-submission
//! path.

use contesto_core::paths::{
    is_submit_fine_resume_path, sanitize_next_path, PROFILE_REQUIRED_REDIRECT_PATH,
    SUBMIT_FINE_RESUME_PATH,
};
use contesto_core::profile::is_profile_complete;
use contesto_db::ProfileStore;
use uuid::Uuid;

use crate::identity::IdentityService;

/// Resolve the destination path right after sign-in.
///
/// Ordinary destinations pass through sanitized and untouched. Only the
/// exact resume-submission path gets special handling: it requires a
/// session and a complete profile, otherwise the user is routed to the
/// fallback or the mandatory profile gate. Profile lookup failures fail
/// open to the resume path.
pub async fn resolve_post_auth_path(
    identity: &dyn IdentityService,
    profiles: &dyn ProfileStore,
    requested_next_path: &str,
    fallback_path: &str,
    authenticated_user_id: Option<Uuid>,
) -> String {
    let safe_requested_path = sanitize_next_path(Some(requested_next_path));

    if !is_submit_fine_resume_path(&safe_requested_path) {
        return safe_requested_path;
    }

    let user_id = match authenticated_user_id {
        Some(id) => id,
        None => match identity.current_user().await {
            Ok(Some(user)) => user.id,
            Ok(None) => return sanitize_next_path(Some(fallback_path)),
            Err(e) => {
                tracing::error!(error = %e, "Session lookup failed during auth redirect");
                return sanitize_next_path(Some(fallback_path));
            }
        },
    };

    let profile = match profiles.get_profile(user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(error = %e, user_id = %user_id, "Profile lookup failed during auth redirect");
            return SUBMIT_FINE_RESUME_PATH.to_string();
        }
    };

    if !is_profile_complete(profile.as_ref()) {
        return PROFILE_REQUIRED_REDIRECT_PATH.to_string();
    }

    SUBMIT_FINE_RESUME_PATH.to_string()
}
