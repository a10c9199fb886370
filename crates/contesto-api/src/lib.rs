//! Contesto API Library
//!
//! HTTP surface of the fine-contesting service: session extraction,
//! error response conversion, the trigger-processing and document-url
//! endpoints, and application setup.

mod handlers;
mod telemetry;

pub mod auth;
pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError, ValidatedJson};
pub use setup::routes::build_router;
pub use telemetry::init_telemetry;
