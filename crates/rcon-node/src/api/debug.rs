//! One-off RCON command for checking a server's configuration.

use axum::{extract::State, Json};
use rcon_core::ServerTarget;
use rcon_protocol::{ConnectOptions, RconClient};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::api::ApiError;
use crate::state::AppState;

/// Request to run a single command.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TestCommandRequest {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub password: Option<String>,
    pub command: Option<String>,
}

/// Raw server reply.
#[derive(Debug, Deserialize, Serialize)]
pub struct TestCommandResponse {
    pub response: String,
}

/// Connect, authenticate, send one command and return the reply.
///
/// Connect and send each get their own deadline; either running out is a
/// 504. Any other RCON failure is a 502.
pub async fn test_command(
    State(state): State<AppState>,
    Json(req): Json<TestCommandRequest>,
) -> Result<Json<TestCommandResponse>, ApiError> {
    let (host, port, password, command) = match (
        non_blank(req.host),
        req.port.filter(|p| *p != 0),
        non_blank(req.password),
        non_blank(req.command),
    ) {
        (Some(host), Some(port), Some(password), Some(command)) => (host, port, password, command),
        _ => {
            return Err(ApiError::BadRequest(
                "Missing host/port/password/command parameters".to_string(),
            ))
        }
    };

    let target = ServerTarget::new("debug", host, port, password);
    let options = ConnectOptions {
        connect_timeout: None,
        max_frame_size: state.max_frame_size,
    };

    let connect = tokio::time::timeout(
        state.debug_timeout,
        RconClient::connect_and_authenticate(&target, &options),
    )
    .await;
    let mut client = match connect {
        Ok(Ok(client)) => client,
        Ok(Err(e)) => {
            error!("RCON debug connect to {} failed: {}", target.endpoint(), e);
            return Err(e.into());
        }
        Err(_) => {
            warn!("RCON debug connect timed out for {}", target.endpoint());
            return Err(ApiError::GatewayTimeout("connect timed out".to_string()));
        }
    };

    info!("RCON debug command to {}: {}", target.endpoint(), command);
    let sent = tokio::time::timeout(state.debug_timeout, client.send_command(&command)).await;
    client.close().await;

    match sent {
        Ok(Ok(response)) => Ok(Json(TestCommandResponse { response })),
        Ok(Err(e)) => {
            error!("RCON debug send to {} failed: {}", target.endpoint(), e);
            Err(e.into())
        }
        Err(_) => {
            warn!("RCON debug send timed out for {}", target.endpoint());
            Err(ApiError::GatewayTimeout("send timed out".to_string()))
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rcon_catalog::InMemoryCatalog;
    use rcon_protocol::mock::{MockRconServer, MockReply};

    use crate::api::testing::server_for;

    fn request_for(rcon: &MockRconServer, password: &str, command: &str) -> TestCommandRequest {
        TestCommandRequest {
            host: Some(rcon.addr().ip().to_string()),
            port: Some(rcon.addr().port()),
            password: Some(password.to_string()),
            command: Some(command.to_string()),
        }
    }

    #[tokio::test]
    async fn test_command_round_trip() {
        let rcon = MockRconServer::start("pw", |cmd| MockReply::Respond(format!("ran {}", cmd)))
            .await
            .unwrap();
        let (server, _) = server_for(InMemoryCatalog::new());

        let response = server
            .post("/api/v1/rcon/test")
            .json(&request_for(&rcon, "pw", "list"))
            .await;
        response.assert_status_ok();

        let body: TestCommandResponse = response.json();
        assert_eq!(body.response, "ran list");
        assert_eq!(rcon.received(), vec!["list"]);
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let (server, _) = server_for(InMemoryCatalog::new());

        let response = server
            .post("/api/v1/rcon/test")
            .json(&TestCommandRequest {
                host: Some("127.0.0.1".to_string()),
                port: Some(25575),
                password: Some("  ".to_string()),
                command: Some("list".to_string()),
            })
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wrong_password_is_bad_gateway() {
        let rcon = MockRconServer::start("pw", |_| MockReply::Respond(String::new()))
            .await
            .unwrap();
        let (server, _) = server_for(InMemoryCatalog::new());

        let response = server
            .post("/api/v1/rcon/test")
            .json(&request_for(&rcon, "wrong", "list"))
            .await;
        response.assert_status(StatusCode::BAD_GATEWAY);
        assert!(rcon.received().is_empty());
    }

    #[tokio::test]
    async fn test_silent_server_is_gateway_timeout() {
        let rcon = MockRconServer::start("pw", |_| MockReply::Silent).await.unwrap();
        let (_, mut state) = server_for(InMemoryCatalog::new());
        state.debug_timeout = Duration::from_millis(50);
        let server = TestServer::new(crate::create_router(state)).unwrap();

        let response = server
            .post("/api/v1/rcon/test")
            .json(&request_for(&rcon, "pw", "list"))
            .await;
        response.assert_status(StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(response.text(), "send timed out");
    }
}
