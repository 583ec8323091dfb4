//! # RCON Protocol
//!
//! Source RCON wire codec and a TCP client for talking to one game server.

pub mod client;
pub mod codec;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::{ConnectOptions, Connector, RconClient, RconSession, TcpConnector};
pub use codec::{Packet, AUTH, AUTH_RESPONSE, EXEC_COMMAND, RESPONSE_VALUE, UNAUTHENTICATED_ID};
