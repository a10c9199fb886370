//! Processing webhook client.
//!
//! Signs the trigger payload with HMAC-SHA256 over the exact JSON body
//! bytes and posts it to the downstream OCR/processing service. The
//! call is fire-and-forget from the user's point of view, so it carries
//! a short fixed timeout.

use anyhow::Context;
use contesto_core::AppError;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

#[derive(Debug, Clone, Serialize)]
pub struct TriggerPayload {
    #[serde(rename = "fineId")]
    pub fine_id: Uuid,
    #[serde(rename = "fileName", skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// What the downstream service answered. Non-2xx is not an error at
/// this level; callers decide how to react.
#[derive(Debug, Clone)]
pub struct WebhookResponse {
    pub ok: bool,
    pub status: u16,
    pub raw_body: String,
    pub job_id: Option<String>,
}

#[derive(Deserialize)]
struct WebhookResponseBody {
    #[serde(rename = "jobId")]
    job_id: Option<String>,
}

/// Compute the signature header value for a request body.
pub fn sign_body(secret: &str, body: &[u8]) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid webhook secret: {}", e)))?;
    mac.update(body);
    Ok(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[derive(Clone)]
pub struct ProcessingWebhookClient {
    http_client: Client,
    webhook_url: String,
    secret: String,
}

impl ProcessingWebhookClient {
    pub fn new(webhook_url: String, secret: String, timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for processing webhook")?;

        Ok(Self {
            http_client,
            webhook_url,
            secret,
        })
    }

    /// Sign and deliver a trigger request. Network failures and
    /// timeouts surface as errors; HTTP rejections come back as a
    /// non-`ok` response.
    #[tracing::instrument(skip(self), fields(fine_id = %payload.fine_id))]
    pub async fn trigger(&self, payload: &TriggerPayload) -> Result<WebhookResponse, AppError> {
        let body = serde_json::to_vec(payload)?;
        let signature = sign_body(&self.secret, &body)?;

        let response = self
            .http_client
            .post(&self.webhook_url)
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                AppError::Internal(format!("Processing webhook request failed: {}", e))
            })?;

        let status = response.status().as_u16();
        let ok = response.status().is_success();
        let raw_body = response.text().await.unwrap_or_default();

        let job_id = serde_json::from_str::<WebhookResponseBody>(&raw_body)
            .ok()
            .and_then(|b| b.job_id)
            .filter(|id| !id.is_empty());

        tracing::debug!(status, ok, job_id = ?job_id, "Processing webhook responded");

        Ok(WebhookResponse {
            ok,
            status,
            raw_body,
            job_id,
        })
    }
}
