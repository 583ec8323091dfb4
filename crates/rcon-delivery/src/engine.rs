//! Delivery orchestration.
//!
//! One call to [`DeliveryEngine::execute`] walks every purchase line,
//! resolves its commands and servers, and replays the commands `quantity`
//! times against every usable server. Per-server and per-command failures
//! are recovered locally and end up in the returned [`ExecutionResult`].

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use rcon_catalog::{resolve_commands, resolve_targets, CommandStore, ServerRegistry};
use rcon_core::result::{COMMAND_LOOKUP_MARKER, SERVER_LOOKUP_MARKER};
use rcon_core::{DeliveryAttempt, EngineConfig, ExecutionResult, PurchaseLine, RconError, Result, ServerTarget};
use rcon_protocol::{ConnectOptions, Connector, RconSession, TcpConnector};
use tracing::{debug, error, info, warn};

use crate::acceptance::{AcceptancePolicy, KeywordAcceptance};
use crate::aggregate::{DeliveryEvent, ResultAccumulator};
use crate::player::{sanitize_player_name, substitute_player};

/// The delivery engine.
pub struct DeliveryEngine {
    commands: Arc<dyn CommandStore>,
    servers: Arc<dyn ServerRegistry>,
    connector: Arc<dyn Connector>,
    policy: Arc<dyn AcceptancePolicy>,
    config: EngineConfig,
}

impl DeliveryEngine {
    /// Create an engine that talks RCON over TCP.
    pub fn new(commands: Arc<dyn CommandStore>, servers: Arc<dyn ServerRegistry>, config: EngineConfig) -> Self {
        let connector = Arc::new(TcpConnector::new(ConnectOptions::from(&config)));
        Self {
            commands,
            servers,
            connector,
            policy: Arc::new(KeywordAcceptance::default()),
            config,
        }
    }

    /// Replace the connector.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Replace the acceptance policy.
    pub fn with_policy(mut self, policy: Arc<dyn AcceptancePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Deliver the commands for every purchase line.
    ///
    /// Never fails: store failures, unreachable servers and rejected commands
    /// are all reported through the result.
    pub async fn execute(&self, lines: &[PurchaseLine], purchaser_name: Option<&str>) -> ExecutionResult {
        if lines.is_empty() {
            debug!("No products provided for RCON execution");
            return ExecutionResult::trivial_success();
        }

        let templates = match self.commands.list_all_command_templates().await {
            Ok(templates) => templates,
            Err(e) => {
                error!("Failed to load commands for RCON execution: {}", e);
                return ExecutionResult::run_failure(COMMAND_LOOKUP_MARKER, e.to_string());
            }
        };

        // Loaded on the first line that has commands.
        let mut known_servers: Option<Vec<ServerTarget>> = None;

        let player = sanitize_player_name(purchaser_name.unwrap_or_default());
        let mut acc = ResultAccumulator::new();

        for line in lines {
            let product = &line.product;

            let commands = resolve_commands(product, &templates);
            if commands.is_empty() {
                debug!("No commands defined for product {}", product.label());
                acc.note_line_without_commands(product);
                continue;
            }
            acc.note_line_with_commands();

            if known_servers.is_none() {
                match self.servers.list_all_servers().await {
                    Ok(servers) => known_servers = Some(servers),
                    Err(e) => {
                        error!("Failed to load servers for RCON execution: {}", e);
                        return ExecutionResult::run_failure(SERVER_LOOKUP_MARKER, e.to_string());
                    }
                }
            }
            let all_servers = known_servers.as_deref().unwrap_or_default();

            let targets = resolve_targets(product, self.servers.as_ref(), all_servers).await;
            let usable: Vec<ServerTarget> = targets
                .into_iter()
                .filter(|target| match target.unusable_reason() {
                    None => true,
                    Some(reason) => {
                        warn!(
                            "Skipping server {} ({}) because RCON config is incomplete: {}",
                            target.name, target.id, reason
                        );
                        false
                    }
                })
                .collect();

            let texts: Vec<String> = commands
                .iter()
                .map(|c| substitute_player(&c.text, &player))
                .collect();

            if usable.is_empty() {
                warn!("No usable RCON server for product {}", product.label());
                let error = format!("No usable RCON server configured for product {}", product.label());
                for text in &texts {
                    acc.apply(DeliveryEvent::Unreachable {
                        command_text: text.clone(),
                        server_name: "-".to_string(),
                        error: error.clone(),
                    });
                }
                continue;
            }

            let quantity = line.normalized_quantity();
            for round in 1..=quantity {
                debug!(
                    "Delivering {} round {}/{} to {} server(s)",
                    product.label(),
                    round,
                    quantity,
                    usable.len()
                );
                self.deliver_round(&usable, &texts, &player, &mut acc).await;
            }
        }

        let result = acc.finish();
        if result.all_succeeded {
            info!("RCON delivery finished: {} command(s) succeeded", result.command_results.len());
        } else {
            warn!(
                "RCON delivery finished with {} failed command(s)",
                result.failed_commands().len()
            );
        }
        result
    }

    /// Send one repetition of a line's commands to every target.
    async fn deliver_round(&self, targets: &[ServerTarget], texts: &[String], player: &str, acc: &mut ResultAccumulator) {
        if self.config.parallel_targets && targets.len() > 1 {
            let limit = self.config.max_parallel_targets.max(1);
            let jobs: Vec<_> = targets.iter().map(|t| self.deliver_to_target(t, texts, player)).collect();
            let mut workers = stream::iter(jobs).buffer_unordered(limit);

            while let Some(events) = workers.next().await {
                acc.apply_all(events);
            }
        } else {
            for target in targets {
                let events = self.deliver_to_target(target, texts, player).await;
                acc.apply_all(events);
            }
        }
    }

    /// Run every command against one server over a single connection.
    async fn deliver_to_target(&self, target: &ServerTarget, texts: &[String], player: &str) -> Vec<DeliveryEvent> {
        let mut events = Vec::new();

        let mut session = match self.connector.connect(target).await {
            Ok(session) => Some(session),
            Err(e) => {
                error!("Failed to connect to RCON on server {}: {}", target.name, e);
                for text in texts {
                    events.push(DeliveryEvent::Unreachable {
                        command_text: text.clone(),
                        server_name: target.name.clone(),
                        error: e.to_string(),
                    });
                }
                return events;
            }
        };

        for (i, text) in texts.iter().enumerate() {
            let Err(fatal) = self.deliver_command(target, &mut session, text, player, &mut events).await else {
                continue;
            };

            error!("Giving up on server {}: {}", target.name, fatal);
            for rest in &texts[i + 1..] {
                events.push(DeliveryEvent::Unreachable {
                    command_text: rest.clone(),
                    server_name: target.name.clone(),
                    error: fatal.to_string(),
                });
            }
            break;
        }

        if let Some(session) = session {
            session.close().await;
        }
        events
    }

    /// Retry loop for one (server, command) pair.
    ///
    /// Returns the error when the target must not be contacted again; the
    /// current command's events are already recorded.
    async fn deliver_command(
        &self,
        target: &ServerTarget,
        session: &mut Option<Box<dyn RconSession>>,
        text: &str,
        player: &str,
        events: &mut Vec<DeliveryEvent>,
    ) -> Result<()> {
        let max_attempts = self.config.attempts();
        let mut last_error: Option<String> = None;

        for attempt in 1..=max_attempts {
            // A previous attempt may have left the connection unusable.
            if session.is_none() {
                match self.connector.connect(target).await {
                    Ok(fresh) => *session = Some(fresh),
                    Err(e) if e.is_target_fatal() => {
                        events.push(DeliveryEvent::Unreachable {
                            command_text: text.to_string(),
                            server_name: target.name.clone(),
                            error: e.to_string(),
                        });
                        return Err(e);
                    }
                    Err(e) => {
                        warn!("Reconnect to {} failed: {}", target.name, e);
                        events.push(DeliveryEvent::Attempt(DeliveryAttempt::failed(
                            text,
                            &target.name,
                            attempt,
                            e.to_string(),
                        )));
                        last_error = Some(e.to_string());
                        continue;
                    }
                }
            }
            let Some(active) = session.as_mut() else {
                continue;
            };

            info!("Sending RCON to {}: {}", target.name, text);
            match self.exchange(&mut **active, text).await {
                Ok(response) => {
                    debug!("RCON response from {}: {}", target.name, response);
                    let accepted = self.policy.is_accepted(text, player, &response);
                    events.push(DeliveryEvent::Attempt(DeliveryAttempt::answered(
                        text,
                        &target.name,
                        attempt,
                        response,
                        accepted,
                    )));
                    if accepted {
                        return Ok(());
                    }
                    last_error = None;
                }
                Err(e) => {
                    warn!(
                        "Failed to send RCON command to server {} (attempt {}/{}): {}",
                        target.name, attempt, max_attempts, e
                    );
                    events.push(DeliveryEvent::Attempt(DeliveryAttempt::failed(
                        text,
                        &target.name,
                        attempt,
                        e.to_string(),
                    )));
                    last_error = Some(e.to_string());

                    // The exchange may have stopped mid-frame; never reuse it.
                    if let Some(broken) = session.take() {
                        broken.close().await;
                    }

                    if !e.is_retryable() {
                        events.push(DeliveryEvent::Exhausted {
                            command_text: text.to_string(),
                            server_name: target.name.clone(),
                            attempts: attempt,
                            last_error,
                        });
                        return Err(e);
                    }
                }
            }
        }

        events.push(DeliveryEvent::Exhausted {
            command_text: text.to_string(),
            server_name: target.name.clone(),
            attempts: max_attempts,
            last_error,
        });
        Ok(())
    }

    /// One send with the configured response deadline.
    async fn exchange(&self, session: &mut dyn RconSession, text: &str) -> Result<String> {
        let Some(limit) = self.config.response_timeout() else {
            return session.send_command(text).await;
        };

        let server = session.server_name().to_string();
        match tokio::time::timeout(limit, session.send_command(text)).await {
            Ok(result) => result,
            Err(_) => Err(RconError::Timeout {
                duration_ms: limit.as_millis() as u64,
                message: format!("no response from {} to {:?}", server, text),
            }),
        }
    }
}
