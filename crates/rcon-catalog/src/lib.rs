//! # RCON Catalog
//!
//! Read-only views of the command store and server registry, and the
//! resolver that maps a purchased product onto commands and servers.

pub mod resolver;
pub mod store;

pub use resolver::{resolve_commands, resolve_targets};
pub use store::{CatalogSnapshot, CommandStore, InMemoryCatalog, ServerRegistry, UnavailableStore};
