//! Axum HTTP API server for CreatorKit.
//!
//! This crate provides:
//! - Generation endpoints for titles, descriptions, scripts and thumbnails
//! - Creation management and the community feed
//! - Session token verification and credit gating
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use auth::{CallerContext, TokenVerifier};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{CreditGate, GenerationService};
pub use state::{AppState, Backends};
