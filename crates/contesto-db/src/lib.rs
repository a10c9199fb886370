//! Contesto Database Layer
//!
//! Capability traits for fine and profile persistence plus their
//! Postgres and in-memory implementations. The submission flow only
//! ever sees the traits.

pub mod memory;
pub mod postgres;
pub mod stores;

pub use memory::{MemoryFineStore, MemoryProfileStore};
pub use postgres::{run_migrations, PgFineRepository, PgProfileRepository};
pub use stores::{FineStore, ProfileStore};
