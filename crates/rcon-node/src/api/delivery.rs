//! Delivery API endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rcon_core::PurchaseLine;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::ApiError;
use crate::state::{AppState, DeliveryReceipt};

/// Request to deliver purchased products.
#[derive(Debug, Deserialize)]
pub struct DeliverRequest {
    /// Purchased products and quantities.
    #[serde(default)]
    pub lines: Vec<PurchaseLine>,

    /// Name substituted for `%player%`.
    #[serde(default)]
    pub purchaser: Option<String>,
}

/// Run a delivery and record its receipt.
///
/// Delivery failures are part of the receipt, not an error status.
pub async fn submit_delivery(
    State(state): State<AppState>,
    Json(req): Json<DeliverRequest>,
) -> (StatusCode, Json<DeliveryReceipt>) {
    info!(
        "Delivery requested for {} line(s), purchaser {:?}",
        req.lines.len(),
        req.purchaser
    );

    let result = state.engine.execute(&req.lines, req.purchaser.as_deref()).await;
    let receipt = state.store_receipt(req.lines, req.purchaser, result).await;

    info!(
        "Delivery {} completed, all succeeded: {}",
        receipt.id, receipt.result.all_succeeded
    );

    (StatusCode::CREATED, Json(receipt))
}

/// Get a delivery receipt by ID.
pub async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryReceipt>, ApiError> {
    let receipt = state
        .get_receipt(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Delivery {} not found", id)))?;

    Ok(Json(receipt))
}

/// List all delivery receipts.
pub async fn list_deliveries(State(state): State<AppState>) -> Json<Vec<DeliveryReceipt>> {
    Json(state.list_receipts().await)
}
