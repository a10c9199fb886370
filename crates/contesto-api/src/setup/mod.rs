//! Application setup: database, services, and routing.

pub mod database;
pub mod routes;
pub mod server;

use anyhow::{Context, Result};
use axum::Router;
use contesto_core::AppConfig;
use contesto_db::PgFineRepository;
use contesto_flow::{
    AlertDeduper, EmailService, OpsAlerter, ProcessingWebhookClient,
};
use contesto_storage::LocalStorage;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthApiSessionAuthenticator, SessionAuthenticator, StaticSessionAuthenticator};
use crate::state::AppState;

const AUTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Wire up the database, storage, webhook client, and alerting, and
/// build the router.
pub async fn initialize_app(config: AppConfig) -> Result<(Arc<AppState>, Router)> {
    let pool = database::setup_database(&config).await?;

    let storage = LocalStorage::new(
        config.local_storage_path.clone(),
        config.local_storage_base_url.clone(),
    )
    .await
    .context("Failed to initialize document storage")?;

    let webhook = ProcessingWebhookClient::new(
        config.webhook_url.clone(),
        config.webhook_secret.clone(),
        Duration::from_secs(config.webhook_timeout_secs),
    )
    .context("Failed to initialize processing webhook client")?;

    let alerter = Arc::new(OpsAlerter::new(
        EmailService::from_config(&config),
        config.alert_recipients.clone(),
        AlertDeduper::default(),
    ));

    let sessions: Arc<dyn SessionAuthenticator> = match &config.auth_api_url {
        Some(auth_api_url) => Arc::new(
            AuthApiSessionAuthenticator::new(auth_api_url.clone(), AUTH_REQUEST_TIMEOUT)
                .context("Failed to initialize session authenticator")?,
        ),
        None => {
            tracing::warn!("AUTH_API_URL not set; all requests will be rejected as unauthorized");
            Arc::new(StaticSessionAuthenticator::new())
        }
    };

    let state = Arc::new(AppState {
        config,
        sessions,
        fines: Arc::new(PgFineRepository::new(pool)),
        storage: Arc::new(storage),
        webhook,
        alerter,
    });

    let router = routes::build_router(Arc::clone(&state));
    Ok((state, router))
}
