use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A user-selected file awaiting validation and upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Lowercased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.name.trim();
        let dot = name.rfind('.')?;
        if dot == 0 || dot == name.len() - 1 {
            return None;
        }
        Some(name[dot + 1..].to_lowercase())
    }
}

/// An in-progress fine submission (file + notes) held in the durable
/// draft slot while the user authenticates or completes their profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFineDraft {
    pub file: CandidateFile,
    pub additional_info: String,
    pub created_at: DateTime<Utc>,
}
