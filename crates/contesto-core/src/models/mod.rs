pub mod draft;
pub mod fine;
pub mod merge;
pub mod user;

pub use draft::{CandidateFile, PendingFineDraft};
pub use fine::{Fine, FineStatus, NewFine};
pub use merge::{PendingProfileMergePayload, MAX_PENDING_PROFILE_MERGE_AGE_MS};
pub use user::{AuthUser, UserProfile};
