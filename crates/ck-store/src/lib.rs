//! Persistence of generated creations.
//!
//! This crate provides:
//! - The `CreationStore` trait used by the API
//! - `PgCreationStore`, backed by Postgres with embedded migrations
//! - `MemoryCreationStore`, for local development and tests

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryCreationStore;
pub use postgres::{PgCreationStore, StoreConfig};
pub use repository::CreationStore;
