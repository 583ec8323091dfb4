//! Node configuration.
//!
//! Read from a JSON file named by `RCON_NODE_CONFIG` (default
//! `rcon-node.json`). The default file is optional; an explicitly named one
//! is not. `RCON_NODE_LISTEN` overrides the listen address.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use rcon_catalog::{CatalogSnapshot, InMemoryCatalog};
use rcon_core::{CommandTemplate, EngineConfig, ServerTarget};
use serde::Deserialize;
use tracing::{info, warn};

/// Env var naming the config file.
pub const CONFIG_PATH_ENV: &str = "RCON_NODE_CONFIG";

/// Env var overriding the listen address.
pub const LISTEN_ENV: &str = "RCON_NODE_LISTEN";

const DEFAULT_CONFIG_PATH: &str = "rcon-node.json";

/// Everything the node needs to start.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// HTTP listen address.
    pub listen: SocketAddr,

    /// Delivery engine tuning.
    pub engine: EngineConfig,

    /// Game servers to deliver to.
    pub servers: Vec<ServerTarget>,

    /// Console commands per product.
    pub commands: Vec<CommandTemplate>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            engine: EngineConfig::default(),
            servers: Vec::new(),
            commands: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Load from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).ok();
        let listen = std::env::var(LISTEN_ENV).ok();
        Self::from_sources(path.as_deref(), listen.as_deref())
    }

    /// Load from an explicit file path and listen override.
    pub fn from_sources(path: Option<&str>, listen: Option<&str>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(Path::new(path))?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?,
            None => {
                warn!("No {} found, starting with an empty catalog", DEFAULT_CONFIG_PATH);
                Self::default()
            }
        };

        if let Some(listen) = listen {
            config.listen = listen
                .parse()
                .with_context(|| format!("invalid {} value {:?}", LISTEN_ENV, listen))?;
        }

        Ok(config)
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_json(&raw).with_context(|| format!("invalid config file {}", path.display()))?;
        info!("Loaded node config from {}", path.display());
        Ok(config)
    }

    /// Parse config JSON.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Build the in-memory catalog. Servers without an id get sequential ones.
    pub fn catalog(&self) -> InMemoryCatalog {
        let mut servers = self.servers.clone();
        let mut next_id = servers.iter().map(|s| s.id).max().unwrap_or(0);
        for server in servers.iter_mut().filter(|s| s.id == 0) {
            next_id += 1;
            server.id = next_id;
        }

        InMemoryCatalog::from_snapshot(CatalogSnapshot {
            servers,
            commands: self.commands.clone(),
        })
    }
}
