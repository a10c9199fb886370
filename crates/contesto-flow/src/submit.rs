//! Fine Submission Orchestrator.
//!
//! Drives one submission attempt end to end: validate the file, stash
//! a draft and redirect when authentication or profile completion is
//! missing, otherwise upload, persist and trigger processing. The
//! resume sequence replays a stashed draft after the interruption,
//! at most once per page lifetime.

use async_trait::async_trait;
use contesto_core::models::{CandidateFile, Fine, NewFine};
use contesto_core::paths::{
    build_login_path_with_next, PROFILE_REQUIRED_REDIRECT_FALLBACK_PATH,
    PROFILE_REQUIRED_REDIRECT_PATH, SUBMIT_FINE_PATH, SUBMIT_FINE_RESUME_PATH,
};
use contesto_core::profile::is_profile_complete;
use contesto_core::AppError;
use contesto_db::{FineStore, ProfileStore};
use contesto_storage::{build_fine_document_key, Storage};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::alerts::{OpsAlerter, TriggerFailureAlert};
use crate::draft::DraftStore;
use crate::identity::IdentityService;
use crate::sync::{InFlightToken, OnceLatch};
use crate::validate::{validate_fine_file, FileValidationError};
use crate::webhook::{ProcessingWebhookClient, TriggerPayload};

/// Downstream processing kick-off for a freshly persisted fine.
#[async_trait]
pub trait ProcessingTrigger: Send + Sync {
    async fn trigger(&self, fine: &Fine) -> Result<(), AppError>;
}

/// Production trigger: signs and posts to the processing webhook,
/// alerting on rejection or transport failure.
pub struct WebhookProcessingTrigger {
    webhook: ProcessingWebhookClient,
    alerter: Arc<OpsAlerter>,
}

impl WebhookProcessingTrigger {
    pub fn new(webhook: ProcessingWebhookClient, alerter: Arc<OpsAlerter>) -> Self {
        Self { webhook, alerter }
    }
}

#[async_trait]
impl ProcessingTrigger for WebhookProcessingTrigger {
    async fn trigger(&self, fine: &Fine) -> Result<(), AppError> {
        let payload = TriggerPayload {
            fine_id: fine.id,
            file_name: Some(fine.file_name.clone()),
        };

        let response = match self.webhook.trigger(&payload).await {
            Ok(response) => response,
            Err(e) => {
                self.alerter
                    .send_trigger_failure_alert(&TriggerFailureAlert {
                        fine_id: fine.id.to_string(),
                        user_id: Some(fine.user_id),
                        webhook_status: None,
                        webhook_response_body: Some(e.to_string()),
                        reason: "trigger_request_failed".to_string(),
                    })
                    .await;
                return Err(e);
            }
        };

        if !response.ok {
            tracing::error!(
                status = response.status,
                body = %response.raw_body,
                fine_id = %fine.id,
                "Processing webhook rejected request"
            );
            self.alerter
                .send_trigger_failure_alert(&TriggerFailureAlert {
                    fine_id: fine.id.to_string(),
                    user_id: Some(fine.user_id),
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

        Ok(())
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// File rejected by validation; nothing was persisted.
    Rejected(FileValidationError),
    /// No session: draft stashed (when possible) and the user goes to
    /// login with the right `next` destination.
    RedirectToLogin { path: String, draft_saved: bool },
    /// Profile incomplete: draft stashed (when possible) and the user
    /// goes to the mandatory profile gate.
    RedirectToProfile { path: String, draft_saved: bool },
    /// Upload, insert and trigger attempt all ran; the fine exists.
    Submitted(Fine),
    /// Another submission is in flight.
    Busy,
}

#[derive(Debug)]
pub enum ResumeOutcome {
    /// No draft (absent, expired, or the store is unavailable); ask the
    /// user to re-upload and strip the resume signal.
    NoDraft,
    RedirectToLogin { path: String },
    RedirectToProfile { path: String },
    /// The stored draft no longer passes validation.
    Rejected(FileValidationError),
    Submitted(Fine),
    /// The one-shot resume latch already fired for this page lifetime.
    AlreadyAttempted,
    Busy,
}

pub struct SubmitFineService {
    identity: Arc<dyn IdentityService>,
    profiles: Arc<dyn ProfileStore>,
    fines: Arc<dyn FineStore>,
    storage: Arc<dyn Storage>,
    drafts: Arc<dyn DraftStore>,
    trigger: Arc<dyn ProcessingTrigger>,
    signed_url_ttl: Duration,
    in_flight: InFlightToken,
    resume_latch: OnceLatch,
}

impl SubmitFineService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: Arc<dyn IdentityService>,
        profiles: Arc<dyn ProfileStore>,
        fines: Arc<dyn FineStore>,
        storage: Arc<dyn Storage>,
        drafts: Arc<dyn DraftStore>,
        trigger: Arc<dyn ProcessingTrigger>,
        signed_url_ttl: Duration,
    ) -> Self {
        Self {
            identity,
            profiles,
            fines,
            storage,
            drafts,
            trigger,
            signed_url_ttl,
            in_flight: InFlightToken::default(),
            resume_latch: OnceLatch::new(),
        }
    }

    /// Main submission sequence.
    #[tracing::instrument(skip(self, file, additional_info), fields(file_name = %file.name))]
    pub async fn submit(
        &self,
        file: &CandidateFile,
        additional_info: &str,
    ) -> Result<SubmitOutcome, AppError> {
        let Some(_guard) = self.in_flight.try_acquire() else {
            return Ok(SubmitOutcome::Busy);
        };

        if let Err(rejection) = validate_fine_file(file) {
            return Ok(SubmitOutcome::Rejected(rejection));
        }

        let Some(user) = self.identity.current_user().await? else {
            let draft_saved = self.try_save_draft(file, additional_info).await;
            let next = if draft_saved {
                SUBMIT_FINE_RESUME_PATH
            } else {
                SUBMIT_FINE_PATH
            };
            return Ok(SubmitOutcome::RedirectToLogin {
                path: build_login_path_with_next(next),
                draft_saved,
            });
        };

        let profile = self.profiles.get_profile(user.id).await?;
        let name_parts = profile
            .as_ref()
            .filter(|p| is_profile_complete(Some(p)))
            .and_then(|p| p.name_parts());

        let Some((first_name, last_name)) = name_parts else {
            let draft_saved = self.try_save_draft(file, additional_info).await;
            let path = if draft_saved {
                PROFILE_REQUIRED_REDIRECT_PATH
            } else {
                PROFILE_REQUIRED_REDIRECT_FALLBACK_PATH
            };
            return Ok(SubmitOutcome::RedirectToProfile {
                path: path.to_string(),
                draft_saved,
            });
        };

        let fine = self
            .persist_and_trigger(user.id, &first_name, &last_name, file, additional_info)
            .await?;
        Ok(SubmitOutcome::Submitted(fine))
    }

    /// Resume sequence: replay a stashed draft after authentication or
    /// profile completion. Runs at most once per service lifetime.
    #[tracing::instrument(skip(self))]
    pub async fn resume(&self) -> Result<ResumeOutcome, AppError> {
        // The in-flight guard comes first so a lost race reports Busy
        // without consuming the one-shot latch.
        let Some(_guard) = self.in_flight.try_acquire() else {
            return Ok(ResumeOutcome::Busy);
        };
        if !self.resume_latch.acquire() {
            return Ok(ResumeOutcome::AlreadyAttempted);
        }

        let draft = match self.drafts.get().await {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(error = %e, "Draft store unavailable during resume");
                None
            }
        };
        let Some(draft) = draft else {
            return Ok(ResumeOutcome::NoDraft);
        };

        // Draft stays stored on both redirects so a later visit can retry.
        let Some(user) = self.identity.current_user().await? else {
            return Ok(ResumeOutcome::RedirectToLogin {
                path: build_login_path_with_next(SUBMIT_FINE_RESUME_PATH),
            });
        };

        let profile = self.profiles.get_profile(user.id).await?;
        let name_parts = profile
            .as_ref()
            .filter(|p| is_profile_complete(Some(p)))
            .and_then(|p| p.name_parts());
        let Some((first_name, last_name)) = name_parts else {
            return Ok(ResumeOutcome::RedirectToProfile {
                path: PROFILE_REQUIRED_REDIRECT_PATH.to_string(),
            });
        };

        // A draft is not trusted blindly after an arbitrary delay.
        if let Err(rejection) = validate_fine_file(&draft.file) {
            return Ok(ResumeOutcome::Rejected(rejection));
        }

        let fine = self
            .persist_and_trigger(
                user.id,
                &first_name,
                &last_name,
                &draft.file,
                &draft.additional_info,
            )
            .await?;
        Ok(ResumeOutcome::Submitted(fine))
    }

    /// Short-lived preview URL for a stored document.
    pub async fn document_preview_url(&self, storage_key: &str) -> Result<String, AppError> {
        self.storage
            .presigned_url(storage_key, self.signed_url_ttl)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }

    async fn try_save_draft(&self, file: &CandidateFile, additional_info: &str) -> bool {
        match self.drafts.save(file, additional_info).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Could not stash pending draft");
                false
            }
        }
    }

    /// Upload the document, insert the fine, then fire the processing
    /// trigger. Trigger failures never fail the submission; the fine
    /// stays `pending` for back-office follow-up.
    async fn persist_and_trigger(
        &self,
        user_id: Uuid,
        first_name: &str,
        last_name: &str,
        file: &CandidateFile,
        additional_info: &str,
    ) -> Result<Fine, AppError> {
        let storage_key = build_fine_document_key(first_name, last_name, &file.name);

        self.storage
            .upload(&storage_key, &file.content_type, file.data.to_vec())
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let fine = match self
            .fines
            .create_fine(NewFine {
                user_id,
                file_url: storage_key.clone(),
                file_name: file.name.clone(),
                file_size: file.size() as i64,
                user_notes: additional_info.to_string(),
            })
            .await
        {
            Ok(fine) => fine,
            Err(e) => {
                // The uploaded blob is orphaned; cleanup is external.
                tracing::warn!(key = %storage_key, "Fine insert failed after upload");
                return Err(e);
            }
        };

        if let Err(e) = self.trigger.trigger(&fine).await {
            tracing::error!(
                error = %e.detailed_message(),
                fine_id = %fine.id,
                "Processing trigger failed; fine stays pending"
            );
        }

        if let Err(e) = self.drafts.clear().await {
            tracing::warn!(error = %e, "Could not clear pending draft after submission");
        }

        tracing::info!(fine_id = %fine.id, key = %storage_key, "Fine submitted");
        Ok(fine)
    }
}
