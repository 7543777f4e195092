//! Shared types and models for the Stockroom inventory platform
//!
//! This crate contains the domain model, the stock alert evaluator, the
//! reconciliation planner and the movement decisions built on them. It is
//! used by the backend (with the `sqlx` feature for database derives) and by
//! the WASM bindings.

pub mod alerting;
pub mod models;
pub mod movement;
pub mod types;
pub mod validation;

pub use alerting::*;
pub use models::*;
pub use movement::*;
pub use types::*;
pub use validation::*;
