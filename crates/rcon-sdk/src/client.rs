//! RCON relay client implementation.

use chrono::{DateTime, Utc};
use rcon_core::{ExecutionResult, PurchaseLine, RconError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Client for interacting with an RCON relay node.
#[derive(Clone)]
pub struct RconRelayClient {
    /// Base URL of the node.
    base_url: String,

    /// HTTP client.
    http_client: reqwest::Client,
}

/// Audit record of one delivery run.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryReceipt {
    pub id: Uuid,
    pub purchaser: Option<String>,
    pub lines: Vec<PurchaseLine>,
    pub completed_at: DateTime<Utc>,
    pub digest: String,
    pub result: ExecutionResult,
}

impl DeliveryReceipt {
    /// True if the stored digest matches the result.
    pub fn verify_digest(&self) -> bool {
        self.result.digest() == self.digest
    }
}

/// A one-off debug command.
#[derive(Debug, Clone, Serialize)]
pub struct TestCommand {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub command: String,
}

#[derive(Debug, Serialize)]
struct DeliverRequest<'a> {
    lines: &'a [PurchaseLine],
    purchaser: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TestCommandResponse {
    response: String,
}

impl RconRelayClient {
    /// Connect to a node.
    pub async fn connect(url: &str) -> Result<Self> {
        let base_url = url.trim_end_matches('/').to_string();
        let http_client = reqwest::Client::new();

        // Verify connection with health check
        let health_url = format!("{}/health", base_url);
        http_client
            .get(&health_url)
            .send()
            .await
            .map_err(|e| RconError::Connection(e.to_string()))?
            .error_for_status()
            .map_err(|e| RconError::Connection(e.to_string()))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Deliver purchased products and wait for the receipt.
    pub async fn deliver(&self, lines: &[PurchaseLine], purchaser: Option<&str>) -> Result<DeliveryReceipt> {
        let url = format!("{}/api/v1/deliveries", self.base_url);
        debug!("Submitting delivery of {} line(s) to {}", lines.len(), url);

        let response = self
            .http_client
            .post(&url)
            .json(&DeliverRequest { lines, purchaser })
            .send()
            .await
            .map_err(|e| RconError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RconError::Internal(format!("Failed to submit delivery: {}", error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| RconError::Serialization(e.to_string()))
    }

    /// Get a delivery receipt.
    pub async fn get_delivery(&self, id: Uuid) -> Result<DeliveryReceipt> {
        let url = format!("{}/api/v1/deliveries/{}", self.base_url, id);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| RconError::Connection(e.to_string()))?;

        if response.status().as_u16() == 404 {
            return Err(RconError::NotFound {
                resource_type: "Delivery".to_string(),
                id: id.to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| RconError::Serialization(e.to_string()))
    }

    /// List every delivery receipt the node holds.
    pub async fn list_deliveries(&self) -> Result<Vec<DeliveryReceipt>> {
        let url = format!("{}/api/v1/deliveries", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| RconError::Connection(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| RconError::Serialization(e.to_string()))
    }

    /// Run one command through the node's debug endpoint.
    pub async fn test_command(&self, command: &TestCommand) -> Result<String> {
        let url = format!("{}/api/v1/rcon/test", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .json(command)
            .send()
            .await
            .map_err(|e| RconError::Connection(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error(status, error_text));
        }

        let body: TestCommandResponse = response
            .json()
            .await
            .map_err(|e| RconError::Serialization(e.to_string()))?;
        Ok(body.response)
    }
}

fn status_error(status: u16, message: String) -> RconError {
    match status {
        400 => RconError::InvalidTarget {
            server: "debug".to_string(),
            message,
        },
        504 => RconError::Timeout {
            duration_ms: 5_000,
            message,
        },
        502 => RconError::Connection(message),
        _ => RconError::Internal(format!("Debug command failed ({}): {}", status, message)),
    }
}
