//! Shared data models for CreatorKit backend.
//!
//! This crate provides Serde-serializable types for:
//! - Plans, credit balances and credit costs
//! - Creations (generated artifacts) and their content shapes
//! - Generation request bodies

pub mod creation;
pub mod plan;
pub mod request;

// Re-export common types
pub use creation::{
    ContentError, Creation, CreationContent, CreationSummary, CreationType, DescriptionContent,
    NewCreation, PublishedCreation,
};
pub use plan::{
    Balance, CreditCosts, Plan, DEFAULT_THUMBNAIL_CREDIT_COST, INITIAL_FREE_CREDITS,
    TEXT_CREDIT_COST,
};
pub use request::{DescriptionRequest, ScriptRequest, ThumbnailRequest, TitleRequest};
