//! Pending Draft Store.
//!
//! A single-slot durable holding area for an in-progress fine
//! submission (file + notes). A new save overwrites any prior draft;
//! reads lazily expire drafts older than one hour. An unavailable
//! backing store is a degraded mode, not a crash: callers fall back to
//! asking the user to re-upload.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use contesto_core::models::{CandidateFile, PendingFineDraft};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const MAX_DRAFT_AGE: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum DraftStoreError {
    #[error("Draft storage unavailable: {0}")]
    Unavailable(String),
}

/// Has this draft outlived the one-hour TTL at the given instant?
pub fn is_draft_expired(draft: &PendingFineDraft, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(draft.created_at).num_milliseconds()
        > MAX_DRAFT_AGE.as_millis() as i64
}

#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Overwrite the single draft slot.
    async fn save(&self, file: &CandidateFile, additional_info: &str)
        -> Result<(), DraftStoreError>;

    /// Current draft, or `None` if absent or expired (expired drafts
    /// are deleted on read).
    async fn get(&self) -> Result<Option<PendingFineDraft>, DraftStoreError>;

    /// Delete any draft. Idempotent.
    async fn clear(&self) -> Result<(), DraftStoreError>;
}

/// In-memory single-slot draft store.
#[derive(Clone, Default)]
pub struct MemoryDraftStore {
    slot: Arc<Mutex<Option<PendingFineDraft>>>,
    unavailable: bool,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that fails every operation, mimicking a client whose
    /// durable storage cannot be opened.
    pub fn unavailable() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            unavailable: true,
        }
    }

    fn check_available(&self) -> Result<(), DraftStoreError> {
        if self.unavailable {
            return Err(DraftStoreError::Unavailable(
                "draft store cannot be opened".to_string(),
            ));
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn backdate(&self, created_at: DateTime<Utc>) {
        if let Some(draft) = self.slot.lock().await.as_mut() {
            draft.created_at = created_at;
        }
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn save(
        &self,
        file: &CandidateFile,
        additional_info: &str,
    ) -> Result<(), DraftStoreError> {
        self.check_available()?;
        *self.slot.lock().await = Some(PendingFineDraft {
            file: file.clone(),
            additional_info: additional_info.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn get(&self) -> Result<Option<PendingFineDraft>, DraftStoreError> {
        self.check_available()?;
        let mut slot = self.slot.lock().await;
        match slot.as_ref() {
            None => Ok(None),
            Some(draft) if is_draft_expired(draft, Utc::now()) => {
                *slot = None;
                Ok(None)
            }
            Some(draft) => Ok(Some(draft.clone())),
        }
    }

    async fn clear(&self) -> Result<(), DraftStoreError> {
        self.check_available()?;
        *self.slot.lock().await = None;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct DraftMeta {
    file_name: String,
    content_type: String,
    additional_info: String,
    created_at_ms: i64,
}

/// File-backed draft store: `meta.json` plus `payload.bin` under a
/// fixed directory. Survives process restarts the way the browser slot
/// survives a navigation cycle.
#[derive(Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn meta_path(&self) -> PathBuf {
        self.dir.join("meta.json")
    }

    fn payload_path(&self) -> PathBuf {
        self.dir.join("payload.bin")
    }

    async fn remove_files(&self) -> Result<(), DraftStoreError> {
        for path in [self.meta_path(), self.payload_path()] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(DraftStoreError::Unavailable(format!(
                        "failed to remove {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DraftStore for FileDraftStore {
    async fn save(
        &self,
        file: &CandidateFile,
        additional_info: &str,
    ) -> Result<(), DraftStoreError> {
        let _guard = self.lock.lock().await;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DraftStoreError::Unavailable(format!("cannot open draft dir: {}", e)))?;

        let meta = DraftMeta {
            file_name: file.name.clone(),
            content_type: file.content_type.clone(),
            additional_info: additional_info.to_string(),
            created_at_ms: Utc::now().timestamp_millis(),
        };
        let meta_json = serde_json::to_vec(&meta)
            .map_err(|e| DraftStoreError::Unavailable(format!("cannot encode draft: {}", e)))?;

        tokio::fs::write(self.payload_path(), &file.data)
            .await
            .map_err(|e| DraftStoreError::Unavailable(format!("cannot write payload: {}", e)))?;
        tokio::fs::write(self.meta_path(), meta_json)
            .await
            .map_err(|e| DraftStoreError::Unavailable(format!("cannot write meta: {}", e)))?;

        Ok(())
    }

    async fn get(&self) -> Result<Option<PendingFineDraft>, DraftStoreError> {
        let _guard = self.lock.lock().await;

        let meta_bytes = match tokio::fs::read(self.meta_path()).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DraftStoreError::Unavailable(format!(
                    "cannot read draft meta: {}",
                    e
                )))
            }
        };

        // Corrupt metadata is treated as absence.
        let meta: DraftMeta = match serde_json::from_slice(&meta_bytes) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding corrupt draft metadata");
                self.remove_files().await?;
                return Ok(None);
            }
        };

        let created_at = match Utc.timestamp_millis_opt(meta.created_at_ms).single() {
            Some(ts) => ts,
            None => {
                self.remove_files().await?;
                return Ok(None);
            }
        };

        let draft_age = Utc::now().signed_duration_since(created_at);
        if draft_age.num_milliseconds() > MAX_DRAFT_AGE.as_millis() as i64 {
            self.remove_files().await?;
            return Ok(None);
        }

        let payload = match tokio::fs::read(self.payload_path()).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.remove_files().await?;
                return Ok(None);
            }
            Err(e) => {
                return Err(DraftStoreError::Unavailable(format!(
                    "cannot read draft payload: {}",
                    e
                )))
            }
        };

        Ok(Some(PendingFineDraft {
            file: CandidateFile::new(meta.file_name, meta.content_type, Bytes::from(payload)),
            additional_info: meta.additional_info,
            created_at,
        }))
    }

    async fn clear(&self) -> Result<(), DraftStoreError> {
        let _guard = self.lock.lock().await;
        self.remove_files().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn candidate() -> CandidateFile {
        CandidateFile::new(
            "avis.pdf",
            "application/pdf",
            Bytes::from_static(b"%PDF-1.4 test"),
        )
    }

    #[tokio::test]
    async fn test_memory_round_trip_within_ttl() {
        let store = MemoryDraftStore::new();
        store.save(&candidate(), "notes").await.unwrap();

        let draft = store.get().await.unwrap().unwrap();
        assert_eq!(draft.file, candidate());
        assert_eq!(draft.additional_info, "notes");
    }

    #[tokio::test]
    async fn test_memory_lazy_expiry_empties_slot() {
        let store = MemoryDraftStore::new();
        store.save(&candidate(), "notes").await.unwrap();
        store
            .backdate(Utc::now() - ChronoDuration::minutes(61))
            .await;

        assert!(store.get().await.unwrap().is_none());
        // Slot was cleared by the expired read.
        assert!(store.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_save_overwrites() {
        let store = MemoryDraftStore::new();
        store.save(&candidate(), "first").await.unwrap();
        store.save(&candidate(), "second").await.unwrap();

        let draft = store.get().await.unwrap().unwrap();
        assert_eq!(draft.additional_info, "second");
    }

    #[tokio::test]
    async fn test_unavailable_store_errors() {
        let store = MemoryDraftStore::unavailable();
        assert!(matches!(
            store.save(&candidate(), "x").await,
            Err(DraftStoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.get().await,
            Err(DraftStoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(dir.path());

        store.save(&candidate(), "notes").await.unwrap();
        let draft = store.get().await.unwrap().unwrap();
        assert_eq!(draft.file.data, candidate().data);
        assert_eq!(draft.file.content_type, "application/pdf");

        store.clear().await.unwrap();
        assert!(store.get().await.unwrap().is_none());
        // clear is idempotent
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_discards_corrupt_meta() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(dir.path());
        store.save(&candidate(), "notes").await.unwrap();

        tokio::fs::write(dir.path().join("meta.json"), b"not json")
            .await
            .unwrap();
        assert!(store.get().await.unwrap().is_none());
        assert!(!dir.path().join("payload.bin").exists());
    }

    #[tokio::test]
    async fn test_file_store_expires_old_draft() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(dir.path());
        store.save(&candidate(), "notes").await.unwrap();

        let stale = DraftMeta {
            file_name: "avis.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            additional_info: "notes".to_string(),
            created_at_ms: (Utc::now() - ChronoDuration::hours(2)).timestamp_millis(),
        };
        tokio::fs::write(
            dir.path().join("meta.json"),
            serde_json::to_vec(&stale).unwrap(),
        )
        .await
        .unwrap();

        assert!(store.get().await.unwrap().is_none());
        assert!(!dir.path().join("meta.json").exists());
    }
}
