//! Identity provider client and credit store.
//!
//! This crate provides:
//! - A REST client for the identity provider's user/metadata API
//! - The `MetadataStore` seam over per-user private metadata
//! - `CreditStore`, which keeps the credit balance and plan in that metadata

pub mod client;
pub mod credits;
pub mod error;
pub mod metrics;
pub mod store;
pub mod types;

pub use client::{IdentityClient, IdentityConfig};
pub use credits::CreditStore;
pub use error::{IdentityError, IdentityResult};
pub use store::MetadataStore;
pub use types::{Metadata, UserRecord};
