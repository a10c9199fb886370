use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum age of a pending profile merge before it is discarded on read.
pub const MAX_PENDING_PROFILE_MERGE_AGE_MS: i64 = 24 * 60 * 60 * 1000;

/// Profile fields collected under a guest identity, waiting to be merged
/// into the account that already owns `target_email` once that account
/// signs in. Stored as JSON in a durable client slot; anything that does
/// not parse into this shape is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingProfileMergePayload {
    #[serde(rename = "targetEmail")]
    pub target_email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(
        rename = "sourceUserId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_user_id: Option<Uuid>,
}

impl PendingProfileMergePayload {
    /// Pure expiry check against the given clock reading.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms - self.created_at > MAX_PENDING_PROFILE_MERGE_AGE_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let payload = PendingProfileMergePayload {
            target_email: "user@example.com".to_string(),
            first_name: None,
            last_name: None,
            address: None,
            phone: None,
            created_at: 1_000,
            source_user_id: None,
        };
        assert!(!payload.is_expired_at(1_000 + MAX_PENDING_PROFILE_MERGE_AGE_MS));
        assert!(payload.is_expired_at(1_001 + MAX_PENDING_PROFILE_MERGE_AGE_MS));
    }

    #[test]
    fn test_wire_field_names() {
        let payload = PendingProfileMergePayload {
            target_email: "user@example.com".to_string(),
            first_name: Some("Jean".to_string()),
            last_name: None,
            address: None,
            phone: None,
            created_at: 42,
            source_user_id: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["targetEmail"], "user@example.com");
        assert_eq!(json["createdAt"], 42);
        assert!(json.get("sourceUserId").is_none());
    }
}
