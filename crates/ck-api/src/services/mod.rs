//! Business logic services.

pub mod credit;
pub mod generation;

pub use credit::CreditGate;
pub use generation::{GenerationResponse, GenerationService};
