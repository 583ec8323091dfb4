//! # RCON Delivery
//!
//! Runs the console commands of purchased products against game servers and
//! reports a per-command result.

pub mod acceptance;
pub mod aggregate;
pub mod engine;
pub mod player;

pub use acceptance::{AcceptancePolicy, KeywordAcceptance, DEFAULT_ACCEPTANCE_KEYWORDS};
pub use aggregate::{DeliveryEvent, ResultAccumulator};
pub use engine::DeliveryEngine;
pub use player::{sanitize_player_name, substitute_player, PLAYER_TOKEN};
