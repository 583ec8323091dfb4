//! # RCON Core
//!
//! Core types shared by every stage of RCON command delivery.
//!
//! This crate provides the fundamental building blocks:
//! - [`CommandTemplate`] / [`ServerTarget`] - read-only catalog records
//! - [`PurchaseLine`] - one purchased product and its quantity
//! - [`ExecutionResult`] - the auditable outcome of a delivery run
//! - [`RconError`] - the error taxonomy
//! - [`EngineConfig`] - delivery tuning knobs

pub mod config;
pub mod error;
pub mod result;
pub mod types;

// Re-exports for convenience
pub use config::EngineConfig;
pub use error::{ProtocolError, RconError, Result};
pub use result::{CommandResult, DeliveryAttempt, ExecutionResult};
pub use types::*;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::error::{ProtocolError, RconError, Result};
    pub use crate::result::{CommandResult, DeliveryAttempt, ExecutionResult};
    pub use crate::types::{CommandTemplate, Product, PurchaseLine, ServerTarget};
}
