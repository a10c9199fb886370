//! Contesto Submission Flow
//!
//! The post-authentication resume flow and pending-submission draft
//! reconciliation: draft and profile-merge stores, the post-auth
//! redirect resolver, file validation, and the submission orchestrator
//! with its processing-webhook trigger and failure alerting.

pub mod alerts;
pub mod draft;
pub mod email;
pub mod identity;
pub mod merge;
pub mod redirect;
pub mod submit;
pub mod sync;
pub mod validate;
pub mod webhook;

pub use alerts::{AlertDeduper, OpsAlerter, TriggerFailureAlert};
pub use draft::{DraftStore, DraftStoreError, FileDraftStore, MemoryDraftStore};
pub use email::EmailService;
pub use identity::{IdentityError, IdentityService, StaticIdentityService};
pub use merge::{
    apply_pending_profile_merge, handle_email_change, EmailChangeOutcome, KeyValueSlot,
    MemoryKeyValueSlot, MergeOutcome, PendingProfileMergeStore, ProfileMergeInput,
};
pub use redirect::resolve_post_auth_path;
pub use submit::{
    ProcessingTrigger, ResumeOutcome, SubmitFineService, SubmitOutcome, WebhookProcessingTrigger,
};
pub use sync::OnceLatch;
pub use validate::{validate_fine_file, FileValidationError, MAX_FILE_SIZE_BYTES};
pub use webhook::{ProcessingWebhookClient, TriggerPayload, WebhookResponse};
