//! Request handlers.

pub mod ai;
pub mod health;
pub mod user;

pub use health::*;
