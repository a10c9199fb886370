//! Persistence capability traits.

use async_trait::async_trait;
use contesto_core::models::{Fine, FineStatus, NewFine, UserProfile};
use contesto_core::AppError;
use uuid::Uuid;

/// Persistence for submitted fines. All reads are scoped to the owning
/// user.
#[async_trait]
pub trait FineStore: Send + Sync {
    /// Insert a new fine and return the stored record.
    async fn create_fine(&self, new_fine: NewFine) -> Result<Fine, AppError>;

    /// Fetch a fine by id, only if it belongs to `user_id`.
    async fn get_fine_for_user(
        &self,
        user_id: Uuid,
        fine_id: Uuid,
    ) -> Result<Option<Fine>, AppError>;

    /// Update the processing status of a fine.
    async fn update_fine_status(&self, fine_id: Uuid, status: FineStatus) -> Result<(), AppError>;
}

/// Persistence for user profile fields.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError>;

    /// Insert or update the profile row for `user_id`.
    async fn upsert_profile(&self, user_id: Uuid, profile: &UserProfile) -> Result<(), AppError>;
}
