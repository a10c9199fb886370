//! Trigger-failure alerting.
//!
//! Fires an email to the on-call recipients when a processing trigger
//! fails, deduplicated per `fineId:reason` over a ten-minute window.
//! The dedup cache is injected state owned by the alerter, so tests and
//! multi-instance deployments can replace it. Alert failures are logged
//! and never surfaced to the user.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::email::EmailService;

const ALERT_DEDUP_WINDOW: Duration = Duration::from_secs(10 * 60);
const ALERT_DEDUP_CAPACITY: usize = 256;
const MAX_BODY_EXCERPT_CHARS: usize = 3000;

/// Time-boxed dedup cache keyed by `fineId:reason`.
pub struct AlertDeduper {
    recent: Mutex<LruCache<String, Instant>>,
    window: Duration,
}

impl Default for AlertDeduper {
    fn default() -> Self {
        Self::new(ALERT_DEDUP_WINDOW)
    }
}

impl AlertDeduper {
    pub fn new(window: Duration) -> Self {
        let capacity = NonZeroUsize::new(ALERT_DEDUP_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            recent: Mutex::new(LruCache::new(capacity)),
            window,
        }
    }

    /// True if no alert for `key` went out within the window; records
    /// the attempt either way it returns true.
    pub fn should_send(&self, key: &str) -> bool {
        let Ok(mut recent) = self.recent.lock() else {
            return true;
        };
        let now = Instant::now();
        if let Some(last_sent) = recent.get(key) {
            if now.duration_since(*last_sent) < self.window {
                return false;
            }
        }
        recent.put(key.to_string(), now);
        true
    }
}

#[derive(Debug, Clone)]
pub struct TriggerFailureAlert {
    pub fine_id: String,
    pub user_id: Option<Uuid>,
    pub webhook_status: Option<u16>,
    pub webhook_response_body: Option<String>,
    pub reason: String,
}

impl TriggerFailureAlert {
    fn dedup_key(&self) -> String {
        format!("{}:{}", self.fine_id, self.reason)
    }
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}

/// Outbound alert channel for processing-trigger failures.
pub struct OpsAlerter {
    email: Option<EmailService>,
    recipients: Vec<String>,
    deduper: AlertDeduper,
}

impl OpsAlerter {
    pub fn new(email: Option<EmailService>, recipients: Vec<String>, deduper: AlertDeduper) -> Self {
        Self {
            email,
            recipients,
            deduper,
        }
    }

    /// Send a trigger-failure alert unless one for the same fine and
    /// reason already went out within the dedup window. Returns whether
    /// a delivery was attempted.
    pub async fn send_trigger_failure_alert(&self, alert: &TriggerFailureAlert) -> bool {
        if !self.deduper.should_send(&alert.dedup_key()) {
            tracing::debug!(
                fine_id = %alert.fine_id,
                reason = %alert.reason,
                "Trigger failure alert suppressed by dedup window"
            );
            return false;
        }

        let Some(email) = &self.email else {
            tracing::warn!(
                fine_id = %alert.fine_id,
                reason = %alert.reason,
                "Email alerts not configured; trigger failure alert not sent"
            );
            return true;
        };

        let subject = format!("Alerte déclenchement analyse — dossier {}", alert.fine_id);
        let mut lines = vec![
            "Le déclenchement de l'analyse a échoué.".to_string(),
            format!("fineId: {}", alert.fine_id),
        ];
        if let Some(user_id) = alert.user_id {
            lines.push(format!("userId: {}", user_id));
        }
        if let Some(status) = alert.webhook_status {
            lines.push(format!("webhookStatus: {}", status));
        }
        lines.push(format!("reason: {}", alert.reason));
        if let Some(body) = alert
            .webhook_response_body
            .as_deref()
            .filter(|b| !b.is_empty())
        {
            lines.push(format!(
                "webhookBody: {}",
                truncate_chars(body, MAX_BODY_EXCERPT_CHARS)
            ));
        }
        lines.push(format!("timestamp: {}", chrono::Utc::now().to_rfc3339()));

        if let Err(e) = email
            .send(&self.recipients, &subject, &lines.join("\n"))
            .await
        {
            tracing::error!(
                error = %e,
                fine_id = %alert.fine_id,
                "Failed to send trigger failure alert"
            );
        } else {
            tracing::info!(fine_id = %alert.fine_id, "Trigger failure alert sent");
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(fine_id: &str, reason: &str) -> TriggerFailureAlert {
        TriggerFailureAlert {
            fine_id: fine_id.to_string(),
            user_id: None,
            webhook_status: Some(502),
            webhook_response_body: Some("bad gateway".to_string()),
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_dedup_window_suppresses_repeats() {
        let deduper = AlertDeduper::default();
        assert!(deduper.should_send("fine-1:webhook_non_2xx"));
        assert!(!deduper.should_send("fine-1:webhook_non_2xx"));
        // Different fine or reason is a different key.
        assert!(deduper.should_send("fine-2:webhook_non_2xx"));
        assert!(deduper.should_send("fine-1:trigger_route_exception"));
    }

    #[test]
    fn test_dedup_window_expires() {
        let deduper = AlertDeduper::new(Duration::from_millis(0));
        assert!(deduper.should_send("fine-1:webhook_non_2xx"));
        assert!(deduper.should_send("fine-1:webhook_non_2xx"));
    }

    #[tokio::test]
    async fn test_alert_attempted_once_per_window() {
        let alerter = OpsAlerter::new(
            None,
            vec!["admin@contesto.fr".to_string()],
            AlertDeduper::default(),
        );

        let first = alerter
            .send_trigger_failure_alert(&alert("fine-1", "webhook_non_2xx"))
            .await;
        let second = alerter
            .send_trigger_failure_alert(&alert("fine-1", "webhook_non_2xx"))
            .await;
        assert!(first);
        assert!(!second);
    }

    #[test]
    fn test_truncate_keeps_short_bodies_intact() {
        assert_eq!(truncate_chars("short", 3000), "short");
        let long = "x".repeat(3001);
        let truncated = truncate_chars(&long, 3000);
        assert_eq!(truncated.chars().count(), 3001);
        assert!(truncated.ends_with('…'));
    }
}
