//! # RCON SDK
//!
//! Client SDK for submitting deliveries to an RCON relay node.

pub mod client;

pub use client::{DeliveryReceipt, RconRelayClient, TestCommand};

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::client::{DeliveryReceipt, RconRelayClient, TestCommand};
    pub use rcon_core::prelude::*;
}
