//! Command store and server registry.

use std::sync::Arc;

use async_trait::async_trait;
use rcon_core::{CommandTemplate, RconError, Result, ServerTarget};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Source of configured console commands.
#[async_trait]
pub trait CommandStore: Send + Sync {
    /// Every command template, across all products.
    async fn list_all_command_templates(&self) -> Result<Vec<CommandTemplate>>;
}

/// Source of game server RCON endpoints.
#[async_trait]
pub trait ServerRegistry: Send + Sync {
    /// Every known server.
    async fn list_all_servers(&self) -> Result<Vec<ServerTarget>>;

    /// Current configuration of one server.
    async fn get_server_by_id(&self, id: i64) -> Result<Option<ServerTarget>>;
}

/// Serializable contents of a catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub servers: Vec<ServerTarget>,

    #[serde(default)]
    pub commands: Vec<CommandTemplate>,
}

/// In-memory implementation of both [`CommandStore`] and [`ServerRegistry`].
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    servers: Arc<RwLock<Vec<ServerTarget>>>,
    commands: Arc<RwLock<Vec<CommandTemplate>>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog from a snapshot.
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            servers: Arc::new(RwLock::new(snapshot.servers)),
            commands: Arc::new(RwLock::new(snapshot.commands)),
        }
    }

    /// Parse a JSON snapshot.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: CatalogSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Add or replace a server. Servers with id 0 get the next free id.
    pub async fn upsert_server(&self, mut server: ServerTarget) -> ServerTarget {
        let mut servers = self.servers.write().await;
        if server.id == 0 {
            server.id = servers.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        }
        match servers.iter_mut().find(|s| s.id == server.id) {
            Some(existing) => *existing = server.clone(),
            None => servers.push(server.clone()),
        }
        server
    }

    /// Add a command template.
    pub async fn add_command(&self, command: CommandTemplate) {
        self.commands.write().await.push(command);
    }

    /// Copy of the current contents.
    pub async fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            servers: self.servers.read().await.clone(),
            commands: self.commands.read().await.clone(),
        }
    }
}

#[async_trait]
impl CommandStore for InMemoryCatalog {
    async fn list_all_command_templates(&self) -> Result<Vec<CommandTemplate>> {
        Ok(self.commands.read().await.clone())
    }
}

#[async_trait]
impl ServerRegistry for InMemoryCatalog {
    async fn list_all_servers(&self) -> Result<Vec<ServerTarget>> {
        Ok(self.servers.read().await.clone())
    }

    async fn get_server_by_id(&self, id: i64) -> Result<Option<ServerTarget>> {
        let servers = self.servers.read().await;
        Ok(servers.iter().find(|s| s.id == id).cloned())
    }
}

/// A store whose every read fails. Useful for exercising failure paths.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    pub reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl CommandStore for UnavailableStore {
    async fn list_all_command_templates(&self) -> Result<Vec<CommandTemplate>> {
        Err(RconError::lookup("command store", self.reason.clone()))
    }
}

#[async_trait]
impl ServerRegistry for UnavailableStore {
    async fn list_all_servers(&self) -> Result<Vec<ServerTarget>> {
        Err(RconError::lookup("server registry", self.reason.clone()))
    }

    async fn get_server_by_id(&self, _id: i64) -> Result<Option<ServerTarget>> {
        Err(RconError::lookup("server registry", self.reason.clone()))
    }
}
