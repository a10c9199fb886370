//! Contesto Storage Library
//!
//! Storage abstraction and implementations for fine documents.
//! It includes the `Storage` trait, a local filesystem backend, an
//! in-memory backend for tests and single-node development, and the
//! deterministic document key builder.
//!
//! # Storage key format
//!
//! Keys are built as `{owner-slug}/{timestamp}-{token}-{name}.{ext}`
//! by the `document_key` module. Keys must not contain `..` or a
//! leading `/`.

pub mod document_key;
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use document_key::build_fine_document_key;
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use traits::{Storage, StorageError, StorageResult};
