//! Application state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rcon_catalog::InMemoryCatalog;
use rcon_core::{ExecutionResult, PurchaseLine};
use rcon_delivery::DeliveryEngine;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::NodeConfig;

/// Deadline for each phase of a debug command.
pub const DEBUG_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The delivery engine.
    pub engine: Arc<DeliveryEngine>,

    /// Servers and commands the engine reads.
    pub catalog: InMemoryCatalog,

    /// Completed deliveries, the node's audit log.
    pub receipts: Arc<RwLock<HashMap<Uuid, DeliveryReceipt>>>,

    /// Connect and send deadline for `/api/v1/rcon/test`.
    pub debug_timeout: Duration,

    /// Frame size limit for debug connections.
    pub max_frame_size: usize,
}

/// Audit record of one delivery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub id: Uuid,

    /// Purchaser name as submitted, before sanitizing.
    pub purchaser: Option<String>,

    /// Lines that were delivered, with bound-server passwords redacted.
    pub lines: Vec<PurchaseLine>,

    pub completed_at: DateTime<Utc>,

    /// SHA-256 of the serialized result.
    pub digest: String,

    pub result: ExecutionResult,
}

impl AppState {
    /// Build the state from node configuration, delivering over TCP.
    pub fn from_config(config: &NodeConfig) -> Self {
        let catalog = config.catalog();
        let store = Arc::new(catalog.clone());
        let engine = DeliveryEngine::new(store.clone(), store, config.engine.clone());
        Self::with_engine(catalog, engine)
    }

    /// Build the state around an existing engine.
    pub fn with_engine(catalog: InMemoryCatalog, engine: DeliveryEngine) -> Self {
        let max_frame_size = engine.config().max_frame_size;
        Self {
            engine: Arc::new(engine),
            catalog,
            receipts: Arc::new(RwLock::new(HashMap::new())),
            debug_timeout: DEBUG_TIMEOUT,
            max_frame_size,
        }
    }

    /// Record a finished run and return its receipt.
    pub async fn store_receipt(
        &self,
        lines: Vec<PurchaseLine>,
        purchaser: Option<String>,
        result: ExecutionResult,
    ) -> DeliveryReceipt {
        let receipt = DeliveryReceipt {
            id: Uuid::new_v4(),
            purchaser,
            lines: lines.iter().map(PurchaseLine::redacted).collect(),
            completed_at: Utc::now(),
            digest: result.digest(),
            result,
        };

        let mut receipts = self.receipts.write().await;
        receipts.insert(receipt.id, receipt.clone());
        receipt
    }

    /// Get a receipt by ID.
    pub async fn get_receipt(&self, id: Uuid) -> Option<DeliveryReceipt> {
        let receipts = self.receipts.read().await;
        receipts.get(&id).cloned()
    }

    /// All receipts, oldest first.
    pub async fn list_receipts(&self) -> Vec<DeliveryReceipt> {
        let receipts = self.receipts.read().await;
        let mut all: Vec<DeliveryReceipt> = receipts.values().cloned().collect();
        all.sort_by_key(|r| r.completed_at);
        all
    }
}
