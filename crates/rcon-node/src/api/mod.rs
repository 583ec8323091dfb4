//! HTTP API handlers.

pub mod catalog;
pub mod debug;
pub mod delivery;
pub mod health;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rcon_core::RconError;
use thiserror::Error;

/// Error returned by handlers, rendered as a status code and plain-text body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// A game server failed to answer correctly.
    #[error("{0}")]
    BadGateway(String),

    /// A game server did not answer in time.
    #[error("{0}")]
    GatewayTimeout(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<RconError> for ApiError {
    fn from(err: RconError) -> Self {
        match err {
            RconError::InvalidTarget { .. } => ApiError::BadRequest(err.to_string()),
            RconError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            RconError::Timeout { .. } => ApiError::GatewayTimeout(err.to_string()),
            _ => ApiError::BadGateway(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
