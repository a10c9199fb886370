//! Application state shared across handlers.

use contesto_core::AppConfig;
use contesto_db::FineStore;
use contesto_flow::{OpsAlerter, ProcessingWebhookClient};
use contesto_storage::Storage;
use std::sync::Arc;

use crate::auth::SessionAuthenticator;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub sessions: Arc<dyn SessionAuthenticator>,
    pub fines: Arc<dyn FineStore>,
    pub storage: Arc<dyn Storage>,
    pub webhook: ProcessingWebhookClient,
    pub alerter: Arc<OpsAlerter>,
}
