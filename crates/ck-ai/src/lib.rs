//! Upstream generation for CreatorKit.
//!
//! This crate provides:
//! - Chat completion and image generation clients behind traits
//! - Retry with exponential backoff for rate-limited upstream calls
//! - Prompt builders for each generation feature
//! - Normalizers turning raw model output into structured content

pub mod completion;
pub mod error;
pub mod image;
pub mod metrics;
pub mod normalize;
pub mod prompts;
pub mod retry;

pub use completion::{CompletionClient, CompletionRequest, OpenRouterClient, OpenRouterConfig};
pub use error::{UpstreamError, UpstreamResult};
pub use image::{ClipdropClient, ClipdropConfig, ImageClient};
pub use normalize::GenerationParseError;
pub use prompts::PromptError;
pub use retry::{retry_with_backoff, RateLimitSignal, RetryPolicy};
