//! Contesto Core Library
//!
//! Domain models, error types, configuration, and the pure path/profile
//! logic shared across all Contesto components.

pub mod config;
pub mod error;
pub mod models;
pub mod paths;
pub mod profile;

pub use config::AppConfig;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use profile::is_profile_complete;
