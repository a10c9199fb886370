//! Configuration module
//!
//! Environment-driven configuration for the API and services: server,
//! database, storage, processing-webhook, and alerting settings.

use std::env;

use anyhow::{anyhow, Context};

const DEFAULT_SERVER_PORT: u16 = 3000;
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 60;
const DEFAULT_ALERT_RECIPIENT: &str = "admin@contesto.fr";

/// Application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub environment: String,
    pub database_url: String,
    // Storage configuration
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    pub signed_url_ttl_secs: u64,
    // Identity/session collaborator
    pub auth_api_url: Option<String>,
    // Processing webhook configuration
    pub webhook_url: String,
    pub webhook_secret: String,
    pub webhook_timeout_secs: u64,
    // Email / alert notifications
    pub email_alerts_enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
    pub alert_recipients: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let server_port = env_parsed("PORT", DEFAULT_SERVER_PORT)?;
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not configured")?;

        let local_storage_path =
            env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./data/fine-documents".to_string());
        let local_storage_base_url = env::var("LOCAL_STORAGE_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}/files", server_port));

        let webhook_url = resolve_webhook_url()?;
        let webhook_secret = env_trimmed("WEBHOOK_SECRET")
            .ok_or_else(|| anyhow!("WEBHOOK_SECRET is not configured"))?;

        Ok(Self {
            server_port,
            environment,
            database_url,
            local_storage_path,
            local_storage_base_url,
            signed_url_ttl_secs: env_parsed("SIGNED_URL_TTL_SECS", DEFAULT_SIGNED_URL_TTL_SECS)?,
            auth_api_url: env_trimmed("AUTH_API_URL"),
            webhook_url,
            webhook_secret,
            webhook_timeout_secs: env_parsed(
                "PROCESSING_WEBHOOK_TIMEOUT_SECS",
                DEFAULT_WEBHOOK_TIMEOUT_SECS,
            )?,
            email_alerts_enabled: env::var("EMAIL_ALERTS_ENABLED")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
            smtp_host: env_trimmed("SMTP_HOST"),
            smtp_port: env_trimmed("SMTP_PORT").and_then(|v| v.parse().ok()),
            smtp_user: env_trimmed("SMTP_USER"),
            smtp_password: env_trimmed("SMTP_PASSWORD"),
            smtp_from: env_trimmed("SMTP_FROM"),
            smtp_tls: env::var("SMTP_TLS")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(true),
            alert_recipients: alert_recipients_from_env(),
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

/// Explicit PROCESSING_WEBHOOK_URL wins; otherwise PROCESSING_SERVER_URL
/// with `/webhook` appended.
fn resolve_webhook_url() -> Result<String, anyhow::Error> {
    if let Some(url) = env_trimmed("PROCESSING_WEBHOOK_URL") {
        return Ok(url);
    }
    if let Some(server_url) = env_trimmed("PROCESSING_SERVER_URL") {
        return Ok(if server_url.ends_with('/') {
            format!("{}webhook", server_url)
        } else {
            format!("{}/webhook", server_url)
        });
    }
    Err(anyhow!(
        "PROCESSING_WEBHOOK_URL (or PROCESSING_SERVER_URL) is not configured"
    ))
}

fn alert_recipients_from_env() -> Vec<String> {
    let recipients: Vec<String> = env::var("TEAM_NOTIFICATION_EMAILS")
        .map(|raw| {
            raw.split(',')
                .map(|entry| entry.trim().to_string())
                .filter(|entry| !entry.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if recipients.is_empty() {
        vec![DEFAULT_ALERT_RECIPIENT.to_string()]
    } else {
        recipients
    }
}

fn env_trimmed(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, anyhow::Error> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("{} is not a valid value for {}", raw, key)),
        Err(_) => Ok(default),
    }
}
