//! RCON client over a single TCP connection.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use rcon_core::config::DEFAULT_MAX_FRAME_SIZE;
use rcon_core::{EngineConfig, ProtocolError, RconError, Result, ServerTarget};
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream};
use tracing::{debug, info, warn};

use crate::codec::{self, Packet, AUTH, EXEC_COMMAND, RESPONSE_VALUE, UNAUTHENTICATED_ID};

/// Packets with a foreign request id tolerated before giving up on a reply.
const MAX_STRAY_PACKETS: usize = 8;

/// An authenticated command channel to one game server.
#[async_trait]
pub trait RconSession: Send {
    /// Name of the server on the other end.
    fn server_name(&self) -> &str;

    /// Send one console command and return the server's reply body.
    async fn send_command(&mut self, command: &str) -> Result<String>;

    /// Tear the connection down.
    async fn close(self: Box<Self>);
}

/// Opens [`RconSession`]s to targets.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to a target and authenticate.
    async fn connect(&self, target: &ServerTarget) -> Result<Box<dyn RconSession>>;
}

/// Options for opening a connection.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Deadline for DNS, TCP connect and the auth exchange together.
    pub connect_timeout: Option<Duration>,

    /// Largest frame accepted from the server.
    pub max_frame_size: usize,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(5)),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl From<&EngineConfig> for ConnectOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            connect_timeout: Some(config.connect_timeout()),
            max_frame_size: config.max_frame_size,
        }
    }
}

/// RCON client owning one TCP connection.
pub struct RconClient {
    stream: TcpStream,
    server: String,
    next_id: i32,
    max_frame_size: usize,
}

impl RconClient {
    /// Connect to a target and authenticate with its password.
    ///
    /// A reply carrying request id `-1` means the password was rejected; the
    /// connection is closed and [`RconError::AuthRejected`] returned.
    pub async fn connect_and_authenticate(target: &ServerTarget, options: &ConnectOptions) -> Result<Self> {
        match options.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, Self::establish(target, options))
                .await
                .map_err(|_| RconError::Connect {
                    server: target.name.clone(),
                    message: format!("timed out after {}ms", limit.as_millis()),
                })?,
            None => Self::establish(target, options).await,
        }
    }

    async fn establish(target: &ServerTarget, options: &ConnectOptions) -> Result<Self> {
        if let Some(reason) = target.unusable_reason() {
            return Err(RconError::InvalidTarget {
                server: target.name.clone(),
                message: reason.to_string(),
            });
        }

        let addr = resolve(target).await?;
        info!("Connecting to RCON {} (server: {})", addr, target.name);

        let stream = TcpStream::connect(addr).await.map_err(|e| RconError::Connect {
            server: target.name.clone(),
            message: e.to_string(),
        })?;
        let _ = stream.set_nodelay(true);

        let mut client = Self {
            stream,
            server: target.name.clone(),
            next_id: 1,
            max_frame_size: options.max_frame_size,
        };

        match client.authenticate(&target.password).await {
            Ok(()) => Ok(client),
            Err(e) => {
                client.close().await;
                Err(e)
            }
        }
    }

    async fn authenticate(&mut self, password: &str) -> Result<()> {
        let id = self.next_request_id();
        codec::write_packet(&mut self.stream, &Packet::new(id, AUTH, password))
            .await
            .map_err(|e| self.connect_error(e))?;

        let mut reply = self.read().await.map_err(|e| self.connect_error(e))?;

        // Source servers send an empty RESPONSE_VALUE ahead of the auth reply.
        if reply.packet_type == RESPONSE_VALUE && reply.request_id != UNAUTHENTICATED_ID {
            debug!("Skipping empty response before auth reply from {}", self.server);
            reply = self.read().await.map_err(|e| self.connect_error(e))?;
        }

        if reply.request_id == UNAUTHENTICATED_ID {
            warn!("RCON authentication rejected by {}", self.server);
            return Err(RconError::AuthRejected {
                server: self.server.clone(),
            });
        }

        debug!("Authenticated with {}", self.server);
        Ok(())
    }

    /// Send a console command and wait for its response.
    ///
    /// No deadline is applied here; callers wrap this in a timeout and must
    /// discard the client if the wait is abandoned mid-frame.
    pub async fn send_command(&mut self, command: &str) -> Result<String> {
        let id = self.next_request_id();
        codec::write_packet(&mut self.stream, &Packet::new(id, EXEC_COMMAND, command)).await?;

        for _ in 0..=MAX_STRAY_PACKETS {
            let reply = self.read().await?;
            if reply.request_id == id {
                return Ok(reply.body);
            }
            if reply.request_id == UNAUTHENTICATED_ID {
                return Err(ProtocolError::Unauthenticated.into());
            }
            debug!(
                "Ignoring packet with request id {} from {} (waiting for {})",
                reply.request_id, self.server, id
            );
        }

        Err(ProtocolError::Malformed(format!("no response correlated to request id {}", id)).into())
    }

    /// Name of the server this client is connected to.
    pub fn server_name(&self) -> &str {
        &self.server
    }

    /// Shut the connection down.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("Error closing RCON connection to {}: {}", self.server, e);
        }
    }

    async fn read(&mut self) -> std::result::Result<Packet, ProtocolError> {
        codec::read_packet(&mut self.stream, self.max_frame_size).await
    }

    fn next_request_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = match self.next_id.checked_add(1) {
            Some(next) => next,
            None => 1,
        };
        id
    }

    fn connect_error(&self, err: ProtocolError) -> RconError {
        RconError::Connect {
            server: self.server.clone(),
            message: format!("authentication exchange failed: {}", err),
        }
    }
}

#[async_trait]
impl RconSession for RconClient {
    fn server_name(&self) -> &str {
        &self.server
    }

    async fn send_command(&mut self, command: &str) -> Result<String> {
        RconClient::send_command(self, command).await
    }

    async fn close(self: Box<Self>) {
        RconClient::close(*self).await
    }
}

/// [`Connector`] that opens real TCP connections.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    options: ConnectOptions,
}

impl TcpConnector {
    /// Create a connector with the given options.
    pub fn new(options: ConnectOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, target: &ServerTarget) -> Result<Box<dyn RconSession>> {
        let client = RconClient::connect_and_authenticate(target, &self.options).await?;
        Ok(Box::new(client))
    }
}

/// Resolve the target's host, treating IP literals without a DNS lookup.
async fn resolve(target: &ServerTarget) -> Result<SocketAddr> {
    let host = target.host.trim();
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, target.port));
    }

    let resolved = lookup_host((host, target.port)).await;
    match resolved {
        Ok(mut addrs) => addrs.next().ok_or_else(|| RconError::Connect {
            server: target.name.clone(),
            message: format!("no addresses found for host {}", host),
        }),
        Err(e) => Err(RconError::Connect {
            server: target.name.clone(),
            message: format!("failed to resolve host {}: {}", host, e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::AUTH_RESPONSE;
    use crate::mock::{MockReply, MockRconServer};
    use tokio::net::TcpListener;

    // A fresh client numbers its auth packet 1 and its first command 2.
    const AUTH_ID: i32 = 1;
    const FIRST_COMMAND_ID: i32 = 2;

    /// Serve one connection with canned packets: `auth_replies` after the
    /// auth request, `command_replies` after the first command.
    async fn scripted_peer(auth_replies: Vec<Packet>, command_replies: Vec<Packet>) -> ServerTarget {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            if codec::read_packet(&mut stream, DEFAULT_MAX_FRAME_SIZE).await.is_err() {
                return;
            }
            for packet in &auth_replies {
                let _ = codec::write_packet(&mut stream, packet).await;
            }
            if codec::read_packet(&mut stream, DEFAULT_MAX_FRAME_SIZE).await.is_ok() {
                for packet in &command_replies {
                    let _ = codec::write_packet(&mut stream, packet).await;
                }
            }
            // Hold the connection until the client goes away.
            let _ = codec::read_packet(&mut stream, DEFAULT_MAX_FRAME_SIZE).await;
        });

        ServerTarget::new("scripted", addr.ip().to_string(), addr.port(), "pw")
    }

    fn preamble() -> Packet {
        Packet::new(AUTH_ID, RESPONSE_VALUE, "")
    }

    #[tokio::test]
    async fn test_connect_and_send() {
        let server = MockRconServer::start("pw", |cmd| MockReply::Respond(format!("echo: {}", cmd)))
            .await
            .unwrap();

        let mut client = RconClient::connect_and_authenticate(&server.target("lobby"), &ConnectOptions::default())
            .await
            .unwrap();
        assert_eq!(client.server_name(), "lobby");

        let first = client.send_command("list").await.unwrap();
        let second = client.send_command("time set day").await.unwrap();
        assert_eq!(first, "echo: list");
        assert_eq!(second, "echo: time set day");
        client.close().await;

        assert_eq!(server.received(), vec!["list".to_string(), "time set day".to_string()]);
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let server = MockRconServer::start("pw", |_| MockReply::Respond(String::new()))
            .await
            .unwrap();

        let mut target = server.target("lobby");
        target.password = "wrong".to_string();

        let result = RconClient::connect_and_authenticate(&target, &ConnectOptions::default()).await;
        assert!(matches!(result, Err(RconError::AuthRejected { .. })));
        assert!(server.received().is_empty());
    }

    #[tokio::test]
    async fn test_empty_body_is_empty_string() {
        let server = MockRconServer::start("pw", |_| MockReply::Respond(String::new()))
            .await
            .unwrap();

        let mut client = RconClient::connect_and_authenticate(&server.target("lobby"), &ConnectOptions::default())
            .await
            .unwrap();
        assert_eq!(client.send_command("save-all").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_hangup_is_connection_closed() {
        let server = MockRconServer::start("pw", |_| MockReply::Hangup).await.unwrap();

        let mut client = RconClient::connect_and_authenticate(&server.target("lobby"), &ConnectOptions::default())
            .await
            .unwrap();
        let err = client.send_command("stop").await.unwrap_err();
        assert!(matches!(err, RconError::Protocol(ProtocolError::ConnectionClosed)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_refused_connection() {
        // Bind and drop to find a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let target = ServerTarget::new("offline", "127.0.0.1", port, "pw");
        let result = RconClient::connect_and_authenticate(&target, &ConnectOptions::default()).await;
        assert!(matches!(result, Err(RconError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_incomplete_target_is_invalid() {
        let target = ServerTarget::new("broken", "127.0.0.1", 25575, "");
        let result = RconClient::connect_and_authenticate(&target, &ConnectOptions::default()).await;
        assert!(matches!(result, Err(RconError::InvalidTarget { .. })));
    }

    #[tokio::test]
    async fn test_connector_opens_sessions() {
        let server = MockRconServer::start("pw", |_| MockReply::Respond("ok".to_string()))
            .await
            .unwrap();

        let connector = TcpConnector::default();
        let mut session = connector.connect(&server.target("lobby")).await.unwrap();
        assert_eq!(session.send_command("say hi").await.unwrap(), "ok");
        session.close().await;
        assert_eq!(server.connections(), 1);
    }

    #[tokio::test]
    async fn test_auth_preamble_is_skipped() {
        let target = scripted_peer(
            vec![preamble(), Packet::new(AUTH_ID, AUTH_RESPONSE, "")],
            vec![Packet::new(FIRST_COMMAND_ID, RESPONSE_VALUE, "pong")],
        )
        .await;

        let mut client = RconClient::connect_and_authenticate(&target, &ConnectOptions::default())
            .await
            .unwrap();
        assert_eq!(client.send_command("ping").await.unwrap(), "pong");
        client.close().await;
    }

    #[tokio::test]
    async fn test_auth_preamble_then_rejection() {
        let target = scripted_peer(
            vec![preamble(), Packet::new(UNAUTHENTICATED_ID, AUTH_RESPONSE, "")],
            Vec::new(),
        )
        .await;

        let result = RconClient::connect_and_authenticate(&target, &ConnectOptions::default()).await;
        assert!(matches!(result, Err(RconError::AuthRejected { .. })));
    }

    #[tokio::test]
    async fn test_stray_packets_are_skipped_up_to_a_bound() {
        let mut replies: Vec<Packet> = (0..MAX_STRAY_PACKETS)
            .map(|i| Packet::new(100 + i as i32, RESPONSE_VALUE, "stale"))
            .collect();
        replies.push(Packet::new(FIRST_COMMAND_ID, RESPONSE_VALUE, "fresh"));
        let target = scripted_peer(vec![Packet::new(AUTH_ID, AUTH_RESPONSE, "")], replies).await;

        let mut client = RconClient::connect_and_authenticate(&target, &ConnectOptions::default())
            .await
            .unwrap();
        assert_eq!(client.send_command("list").await.unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_too_many_stray_packets_is_malformed() {
        let replies: Vec<Packet> = (0..=MAX_STRAY_PACKETS)
            .map(|i| Packet::new(100 + i as i32, RESPONSE_VALUE, "stale"))
            .collect();
        assert_eq!(replies.len(), 9);
        let target = scripted_peer(vec![Packet::new(AUTH_ID, AUTH_RESPONSE, "")], replies).await;

        let mut client = RconClient::connect_and_authenticate(&target, &ConnectOptions::default())
            .await
            .unwrap();
        let err = client.send_command("list").await.unwrap_err();
        assert!(matches!(err, RconError::Protocol(ProtocolError::Malformed(_))));
    }
}
