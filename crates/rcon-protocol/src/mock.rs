//! Scripted RCON server on loopback, for tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rcon_core::config::DEFAULT_MAX_FRAME_SIZE;
use rcon_core::ServerTarget;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::codec::{read_packet, write_packet, Packet, AUTH, AUTH_RESPONSE, EXEC_COMMAND, RESPONSE_VALUE, UNAUTHENTICATED_ID};

/// What the mock does with a received command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Answer with this body.
    Respond(String),
    /// Never answer; keep the connection open.
    Silent,
    /// Drop the connection without answering.
    Hangup,
}

type Handler = Arc<dyn Fn(&str) -> MockReply + Send + Sync>;

/// A loopback RCON server driven by a handler closure.
pub struct MockRconServer {
    addr: SocketAddr,
    password: String,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl MockRconServer {
    /// Start listening on an ephemeral port.
    pub async fn start<F>(password: &str, handler: F) -> std::io::Result<Self>
    where
        F: Fn(&str) -> MockReply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let handler: Handler = Arc::new(handler);
        let handle = {
            let password = password.to_string();
            let received = Arc::clone(&received);
            let connections = Arc::clone(&connections);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(
                        stream,
                        password.clone(),
                        Arc::clone(&handler),
                        Arc::clone(&received),
                    ));
                }
            })
        };

        Ok(Self {
            addr,
            password: password.to_string(),
            received,
            connections,
            handle,
        })
    }

    /// Address the server listens on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// A target pointing at this server with the right password.
    pub fn target(&self, name: &str) -> ServerTarget {
        ServerTarget::new(name, self.addr.ip().to_string(), self.addr.port(), self.password.clone())
    }

    /// Every command received so far, in arrival order.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of accepted TCP connections.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for MockRconServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(mut stream: TcpStream, password: String, handler: Handler, received: Arc<Mutex<Vec<String>>>) {
    loop {
        let packet = match read_packet(&mut stream, DEFAULT_MAX_FRAME_SIZE).await {
            Ok(packet) => packet,
            Err(_) => return,
        };

        match packet.packet_type {
            AUTH => {
                let id = if packet.body == password {
                    packet.request_id
                } else {
                    UNAUTHENTICATED_ID
                };
                if write_packet(&mut stream, &Packet::new(id, AUTH_RESPONSE, "")).await.is_err() {
                    return;
                }
            }
            EXEC_COMMAND => {
                if let Ok(mut log) = received.lock() {
                    log.push(packet.body.clone());
                }
                match handler(&packet.body) {
                    MockReply::Respond(body) => {
                        let reply = Packet::new(packet.request_id, RESPONSE_VALUE, body);
                        if write_packet(&mut stream, &reply).await.is_err() {
                            return;
                        }
                    }
                    MockReply::Silent => {}
                    MockReply::Hangup => return,
                }
            }
            _ => return,
        }
    }
}
