use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing status of a submitted fine. Created as `Pending`; mutated
/// later only by the external processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FineStatus {
    Pending,
    Processing,
    Processed,
    Error,
}

impl FineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FineStatus::Pending => "pending",
            FineStatus::Processing => "processing",
            FineStatus::Processed => "processed",
            FineStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for FineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FineStatus::Pending),
            "processing" => Ok(FineStatus::Processing),
            "processed" => Ok(FineStatus::Processed),
            "error" => Ok(FineStatus::Error),
            other => Err(format!("unknown fine status: {}", other)),
        }
    }
}

/// A submitted traffic fine. `file_url` holds the storage key of the
/// uploaded document; `extracted_text` stays empty until the external
/// processing pipeline fills it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fine {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_url: String,
    pub file_name: String,
    pub file_size: i64,
    pub extracted_text: String,
    pub user_notes: String,
    pub status: FineStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new fine record.
#[derive(Debug, Clone)]
pub struct NewFine {
    pub user_id: Uuid,
    pub file_url: String,
    pub file_name: String,
    pub file_size: i64,
    pub user_notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_round_trip() {
        for status in [
            FineStatus::Pending,
            FineStatus::Processing,
            FineStatus::Processed,
            FineStatus::Error,
        ] {
            assert_eq!(FineStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(FineStatus::from_str("queued").is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&FineStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
