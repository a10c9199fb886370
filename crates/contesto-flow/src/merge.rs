//! Pending Profile-Merge Store and the consumer-side merge algorithm.
//!
//! When a guest attaches an email that already belongs to another
//! account, the profile fields they typed are parked in a durable
//! key-value slot. Once the real account signs in, the merge fills its
//! empty profile fields from the parked payload, exactly once.

use chrono::Utc;
use contesto_core::models::{AuthUser, PendingProfileMergePayload, UserProfile};
use contesto_core::AppError;
use contesto_db::ProfileStore;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::identity::{IdentityError, IdentityService};
use crate::sync::OnceLatch;

/// Durable client-side key-value slot holding one small text value.
/// Implementations swallow nothing on read, but `set` failures are
/// tolerated by callers (the feature degrades to "no merge available").
pub trait KeyValueSlot: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, value: &str) -> Result<(), String>;
    fn remove(&self);
}

/// In-memory slot, optionally configured to reject writes like a
/// private-mode browser store.
#[derive(Default)]
pub struct MemoryKeyValueSlot {
    value: Mutex<Option<String>>,
    write_fails: bool,
}

impl MemoryKeyValueSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_failing() -> Self {
        Self {
            value: Mutex::new(None),
            write_fails: true,
        }
    }
}

impl KeyValueSlot for MemoryKeyValueSlot {
    fn get(&self) -> Option<String> {
        self.value.lock().ok().and_then(|v| v.clone())
    }

    fn set(&self, value: &str) -> Result<(), String> {
        if self.write_fails {
            return Err("quota exceeded".to_string());
        }
        if let Ok(mut slot) = self.value.lock() {
            *slot = Some(value.to_string());
        }
        Ok(())
    }

    fn remove(&self) {
        if let Ok(mut slot) = self.value.lock() {
            *slot = None;
        }
    }
}

fn to_nullable_trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Fields parked for a later merge. `created_at` is stamped on save.
#[derive(Debug, Clone)]
pub struct ProfileMergeInput {
    pub target_email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub source_user_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct PendingProfileMergeStore {
    slot: Arc<dyn KeyValueSlot>,
}

impl PendingProfileMergeStore {
    pub fn new(slot: Arc<dyn KeyValueSlot>) -> Self {
        Self { slot }
    }

    /// Normalize and store the payload. Write failures are swallowed.
    pub fn save(&self, input: ProfileMergeInput) {
        let payload = PendingProfileMergePayload {
            target_email: input.target_email.trim().to_lowercase(),
            first_name: to_nullable_trimmed(input.first_name.as_deref()),
            last_name: to_nullable_trimmed(input.last_name.as_deref()),
            address: to_nullable_trimmed(input.address.as_deref()),
            phone: to_nullable_trimmed(input.phone.as_deref()),
            created_at: Utc::now().timestamp_millis(),
            source_user_id: input.source_user_id,
        };

        let json = match serde_json::to_string(&payload) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode pending profile merge");
                return;
            }
        };

        if let Err(e) = self.slot.set(&json) {
            tracing::debug!(error = %e, "Pending profile merge not persisted");
        }
    }

    /// Read the payload. Corrupt or expired values are deleted and
    /// treated as absent.
    pub fn get(&self) -> Option<PendingProfileMergePayload> {
        let raw = self.slot.get()?;

        let payload: PendingProfileMergePayload = match serde_json::from_str(&raw) {
            Ok(payload) => payload,
            Err(_) => {
                self.slot.remove();
                return None;
            }
        };

        if payload.is_expired_at(Utc::now().timestamp_millis()) {
            self.slot.remove();
            return None;
        }

        Some(payload)
    }

    pub fn clear(&self) {
        self.slot.remove();
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Fields were filled in and the profile was upserted.
    Merged(UserProfile),
    /// A valid payload existed but every field already had a value;
    /// the payload was cleared.
    NothingToMerge,
    /// No payload was stored (or it was expired/corrupt).
    NoPayload,
    /// Payload kept for later: no session, guest session, or a
    /// different account than the payload targets.
    Skipped,
    /// The per-session latch already fired.
    AlreadyApplied,
}

fn fill_missing(current: Option<&str>, pending: Option<&str>) -> Option<String> {
    to_nullable_trimmed(current).or_else(|| to_nullable_trimmed(pending))
}

/// Apply a pending profile merge for the current session, at most once
/// per `latch`. The payload is cleared whenever it was consumed (merge
/// applied or nothing to fill); it stays put when the session does not
/// match, so the right account can still pick it up later. Profile
/// lookup failures leave the payload in place and skip.
pub async fn apply_pending_profile_merge(
    merge_store: &PendingProfileMergeStore,
    identity: &dyn IdentityService,
    profiles: &dyn ProfileStore,
    latch: &OnceLatch,
) -> Result<MergeOutcome, AppError> {
    if !latch.acquire() {
        return Ok(MergeOutcome::AlreadyApplied);
    }

    let Some(payload) = merge_store.get() else {
        return Ok(MergeOutcome::NoPayload);
    };

    let Some(user) = identity.current_user().await? else {
        return Ok(MergeOutcome::Skipped);
    };
    if user.is_anonymous {
        return Ok(MergeOutcome::Skipped);
    }
    match user.normalized_email() {
        Some(email) if email == payload.target_email => {}
        _ => return Ok(MergeOutcome::Skipped),
    }

    let existing = match profiles.get_profile(user.id).await {
        Ok(existing) => existing.unwrap_or_default(),
        Err(e) => {
            tracing::error!(error = %e, user_id = %user.id, "Profile lookup failed during merge");
            return Ok(MergeOutcome::Skipped);
        }
    };

    let merged = UserProfile {
        first_name: fill_missing(existing.first_name.as_deref(), payload.first_name.as_deref()),
        last_name: fill_missing(existing.last_name.as_deref(), payload.last_name.as_deref()),
        address: fill_missing(existing.address.as_deref(), payload.address.as_deref()),
        phone: fill_missing(existing.phone.as_deref(), payload.phone.as_deref()),
    };

    let has_changes = merged.first_name != to_nullable_trimmed(existing.first_name.as_deref())
        || merged.last_name != to_nullable_trimmed(existing.last_name.as_deref())
        || merged.address != to_nullable_trimmed(existing.address.as_deref())
        || merged.phone != to_nullable_trimmed(existing.phone.as_deref());

    if !has_changes {
        merge_store.clear();
        return Ok(MergeOutcome::NothingToMerge);
    }

    // Payload stays on failure so the merge can be retried next session.
    profiles.upsert_profile(user.id, &merged).await?;
    merge_store.clear();

    Ok(MergeOutcome::Merged(merged))
}

#[derive(Debug, PartialEq, Eq)]
pub enum EmailChangeOutcome {
    /// Requested email equals the current one (or is empty).
    NoChange,
    /// Provider accepted the change; confirmation email is on its way.
    Updated,
    /// Guest hit an existing account: merge payload parked, magic link
    /// sent to the owning address.
    GuestMergePending,
    /// A signed-in (non-guest) user requested an address someone else
    /// owns.
    Conflict,
    Failed(String),
}

/// Run the email-change leg of a profile save, producing a pending
/// merge when a guest collides with an existing account.
pub async fn handle_email_change(
    identity: &dyn IdentityService,
    merge_store: &PendingProfileMergeStore,
    user: &AuthUser,
    requested_email: &str,
    fields: &UserProfile,
) -> EmailChangeOutcome {
    let requested = requested_email.trim().to_lowercase();
    if requested.is_empty() || Some(requested.clone()) == user.normalized_email() {
        return EmailChangeOutcome::NoChange;
    }

    match identity.update_email(user.id, &requested).await {
        Ok(()) => EmailChangeOutcome::Updated,
        Err(IdentityError::EmailAlreadyRegistered(_)) if user.is_anonymous => {
            merge_store.save(ProfileMergeInput {
                target_email: requested.clone(),
                first_name: fields.first_name.clone(),
                last_name: fields.last_name.clone(),
                address: fields.address.clone(),
                phone: fields.phone.clone(),
                source_user_id: Some(user.id),
            });

            match identity.send_magic_link(&requested).await {
                Ok(()) => EmailChangeOutcome::GuestMergePending,
                Err(e) => {
                    merge_store.clear();
                    tracing::warn!(error = %e, "Magic link delivery failed; pending merge dropped");
                    EmailChangeOutcome::Failed("magic link delivery failed".to_string())
                }
            }
        }
        Err(IdentityError::EmailAlreadyRegistered(_)) => EmailChangeOutcome::Conflict,
        Err(IdentityError::Other(message)) => EmailChangeOutcome::Failed(message),
    }
}
