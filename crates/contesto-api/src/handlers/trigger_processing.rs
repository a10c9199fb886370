//! Manual processing trigger for an already-submitted fine.
//!
//! The submission flow fires this automatically; the route exists for
//! retries from the dashboard when the first attempt was rejected.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use contesto_core::models::AuthUser;
use contesto_core::AppError;
use contesto_flow::{TriggerFailureAlert, TriggerPayload};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Session;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TriggerProcessingRequest {
    #[serde(rename = "fineId")]
    pub fine_id: String,
}

#[derive(Debug, Serialize)]
pub struct TriggerProcessingResponse {
    pub status: &'static str,
    #[serde(rename = "jobId", skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

pub async fn trigger_processing(
    State(state): State<Arc<AppState>>,
    Session(user): Session,
    ValidatedJson(request): ValidatedJson<TriggerProcessingRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let fine_id = Uuid::parse_str(request.fine_id.trim())
        .map_err(|_| AppError::InvalidInput("fineId must be a UUID".to_string()))?;

    match run_trigger(&state, &user, fine_id).await {
        Ok(response) => Ok((StatusCode::ACCEPTED, Json(response))),
        Err(err) => {
            // Unexpected failures page the on-call; client errors and the
            // already-alerted webhook rejection do not.
            if matches!(
                err,
                AppError::Database(_)
                    | AppError::Storage(_)
                    | AppError::Internal(_)
                    | AppError::InternalWithSource { .. }
            ) {
                state
                    .alerter
                    .send_trigger_failure_alert(&TriggerFailureAlert {
                        fine_id: fine_id.to_string(),
                        user_id: Some(user.id),
                        webhook_status: None,
                        webhook_response_body: Some(err.detailed_message()),
                        reason: "trigger_route_exception".to_string(),
                    })
                    .await;
            }
            Err(err.into())
        }
    }
}

async fn run_trigger(
    state: &AppState,
    user: &AuthUser,
    fine_id: Uuid,
) -> Result<TriggerProcessingResponse, AppError> {
    let fine = state
        .fines
        .get_fine_for_user(user.id, fine_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Fine not found".to_string()))?;

    let payload = TriggerPayload {
        fine_id: fine.id,
        file_name: Some(fine.file_name.clone()),
    };
    let response = state.webhook.trigger(&payload).await?;

    if !response.ok {
        tracing::error!(
            status = response.status,
            body = %response.raw_body,
            fine_id = %fine.id,
            "Processing webhook rejected manual trigger"
        );
        state
            .alerter
            .send_trigger_failure_alert(&TriggerFailureAlert {
                fine_id: fine.id.to_string(),
                user_id: Some(user.id),
                webhook_status: Some(response.status),
                webhook_response_body: Some(response.raw_body.clone()),
                reason: "webhook_non_2xx".to_string(),
            })
            .await;
        return Err(AppError::UpstreamRejected {
            status: response.status,
            body: response.raw_body,
        });
    }

    Ok(TriggerProcessingResponse {
        status: "queued",
        job_id: response.job_id,
    })
}
