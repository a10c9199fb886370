//! Short-lived signed URL for a fine's uploaded document.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use contesto_core::AppError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::Session;
use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DocumentUrlResponse {
    pub url: String,
    #[serde(rename = "expiresInSecs")]
    pub expires_in_secs: u64,
}

pub async fn get_document_url(
    State(state): State<Arc<AppState>>,
    Session(user): Session,
    Path(fine_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let fine = state
        .fines
        .get_fine_for_user(user.id, fine_id)
        .await
        .map_err(HttpAppError)?
        .ok_or_else(|| HttpAppError(AppError::NotFound("Fine not found".to_string())))?;

    let ttl = Duration::from_secs(state.config.signed_url_ttl_secs);
    let url = state
        .storage
        .presigned_url(&fine.file_url, ttl)
        .await
        .map_err(HttpAppError::from)?;

    Ok(Json(DocumentUrlResponse {
        url,
        expires_in_secs: ttl.as_secs(),
    }))
}
