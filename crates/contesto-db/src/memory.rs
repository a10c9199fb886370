//! In-memory store implementations for tests and single-node development.

use async_trait::async_trait;
use chrono::Utc;
use contesto_core::models::{Fine, FineStatus, NewFine, UserProfile};
use contesto_core::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::stores::{FineStore, ProfileStore};

#[derive(Clone, Default)]
pub struct MemoryFineStore {
    fines: Arc<RwLock<HashMap<Uuid, Fine>>>,
}

impl MemoryFineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FineStore for MemoryFineStore {
    async fn create_fine(&self, new_fine: NewFine) -> Result<Fine, AppError> {
        let now = Utc::now();
        let fine = Fine {
            id: Uuid::new_v4(),
            user_id: new_fine.user_id,
            file_url: new_fine.file_url,
            file_name: new_fine.file_name,
            file_size: new_fine.file_size,
            extracted_text: String::new(),
            user_notes: new_fine.user_notes,
            status: FineStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.fines.write().await.insert(fine.id, fine.clone());
        Ok(fine)
    }

    async fn get_fine_for_user(
        &self,
        user_id: Uuid,
        fine_id: Uuid,
    ) -> Result<Option<Fine>, AppError> {
        Ok(self
            .fines
            .read()
            .await
            .get(&fine_id)
            .filter(|f| f.user_id == user_id)
            .cloned())
    }

    async fn update_fine_status(&self, fine_id: Uuid, status: FineStatus) -> Result<(), AppError> {
        let mut fines = self.fines.write().await;
        let fine = fines
            .get_mut(&fine_id)
            .ok_or_else(|| AppError::NotFound(format!("Fine not found: {}", fine_id)))?;
        fine.status = status;
        fine.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    profiles: Arc<RwLock<HashMap<Uuid, UserProfile>>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }

    async fn upsert_profile(&self, user_id: Uuid, profile: &UserProfile) -> Result<(), AppError> {
        self.profiles
            .write()
            .await
            .insert(user_id, profile.clone());
        Ok(())
    }
}
